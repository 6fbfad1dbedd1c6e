//! cachesync - Offline resource cache synchronizer
//!
//! Keeps a client-side cache of an application's resources consistent with
//! the manifest of the release currently deployed, evicting only what
//! changed between releases.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod intercept;
pub mod key;
pub mod lifecycle;
pub mod manifest;
pub mod prefetch;
pub mod reconcile;
pub mod store;
pub mod transport;

pub use error::{CacheError, CacheResult};
