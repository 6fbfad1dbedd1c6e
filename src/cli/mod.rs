//! Command-line interface

pub mod args;
pub mod commands;
pub mod engine;
pub mod host;

pub use args::{Cli, Commands};
