//! Network transport abstraction
//!
//! The engine never talks to the network directly. A [`Transport`] turns a
//! request into a response, or a [`FetchError`] when no response could be
//! obtained. Non-2xx responses are still responses; only the caller decides
//! whether they are worth caching.

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

use crate::error::FetchError;
use crate::store::Response;
use async_trait::async_trait;

/// An incoming read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method, uppercase
    pub method: String,

    /// Absolute request URL
    pub url: String,
}

impl Request {
    /// Create a request with an explicit method
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// Per-fetch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Bypass intermediate HTTP caches and revalidate with the server
    pub reload: bool,
}

impl FetchOptions {
    /// Options forcing revalidation
    pub fn reload() -> Self {
        Self { reload: true }
    }
}

/// Performs network fetches on behalf of the engine
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a request from the network
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, FetchError>;
}
