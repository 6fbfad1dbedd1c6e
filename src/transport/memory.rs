//! In-memory transport serving canned responses
//!
//! Unknown URLs answer 404. While offline every fetch fails with a network
//! error. All fetches are recorded so callers can assert on network traffic.

use super::{FetchOptions, Request, Transport};
use crate::error::FetchError;
use crate::store::Response;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Transport answering from a fixed route table
#[derive(Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    log: Mutex<Vec<(String, FetchOptions)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`, replacing any previous route
    pub async fn route(&self, url: impl Into<String>, response: Response) {
        self.routes.lock().await.insert(url.into(), response);
    }

    /// Serve a 200 response with `body` for `url`
    pub async fn route_ok(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.route(url, Response::new(200, body)).await;
    }

    /// Toggle simulated loss of connectivity
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// URLs fetched so far, in order
    pub async fn fetched(&self) -> Vec<String> {
        self.log.lock().await.iter().map(|(url, _)| url.clone()).collect()
    }

    /// Fetches made so far with their options
    pub async fn fetch_log(&self) -> Vec<(String, FetchOptions)> {
        self.log.lock().await.clone()
    }

    /// Forget recorded fetches
    pub async fn clear_log(&self) {
        self.log.lock().await.clear();
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, request: &Request, options: FetchOptions) -> Result<Response, FetchError> {
        self.log.lock().await.push((request.url.clone(), options));

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::network(&request.url, "offline"));
        }

        Ok(self
            .routes
            .lock()
            .await
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}
