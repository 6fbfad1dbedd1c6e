//! Request interception
//!
//! Decides, per incoming request, whether the engine serves it and how:
//!
//! | Request | Policy |
//! |---------|--------|
//! | Not `GET` | pass through |
//! | Key not in the manifest | pass through, cache untouched |
//! | Root document (`/`) | network first, cache fallback |
//! | Any other manifest key | cache first, lazy fill from network |

use crate::context::CacheContext;
use crate::error::CacheResult;
use crate::key::ROOT_KEY;
use crate::manifest::ResourceManifest;
use crate::store::{Partition, Response};
use crate::transport::{FetchOptions, Request};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Result of intercepting a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intercept {
    /// The engine produced a response
    Response(Response, Source),
    /// Not handled here; the caller applies its default network behavior
    PassThrough,
}

/// Serves manifest resources from the live partition and the network
pub struct Interceptor {
    ctx: CacheContext,
    manifest: Arc<ResourceManifest>,
}

impl Interceptor {
    pub fn new(ctx: CacheContext, manifest: Arc<ResourceManifest>) -> Self {
        Self { ctx, manifest }
    }

    /// Classify a request and serve it according to its policy
    pub async fn handle(&self, request: &Request) -> CacheResult<Intercept> {
        if !request.is_get() {
            return Ok(Intercept::PassThrough);
        }

        let Some(key) = self
            .ctx
            .origin
            .resource_key(&request.url, &self.ctx.root_aliases)
        else {
            return Ok(Intercept::PassThrough);
        };

        if !self.manifest.contains(&key) {
            debug!("{} is not a manifest resource", request.url);
            return Ok(Intercept::PassThrough);
        }

        let live = self.ctx.store.open(&self.ctx.partitions.live).await?;
        let (response, source) = if key == ROOT_KEY {
            self.network_first(&*live, request).await?
        } else {
            self.cache_first(&*live, request, &key).await?
        };
        Ok(Intercept::Response(response, source))
    }

    /// Serve from live when present, otherwise fetch and keep a copy
    async fn cache_first(
        &self,
        live: &dyn Partition,
        request: &Request,
        key: &str,
    ) -> CacheResult<(Response, Source)> {
        let url = self.ctx.origin.canonical_url(key);
        if let Some(cached) = live.get(&url).await? {
            debug!("Serving {} from cache", key);
            return Ok((cached, Source::Cache));
        }

        let response = self
            .ctx
            .transport
            .fetch(request, FetchOptions::default())
            .await?;
        if response.is_ok() {
            store_copy(live, &url, &response).await;
        }
        Ok((response, Source::Network))
    }

    /// Fetch the root document, falling back to the cached copy offline
    pub async fn network_first(
        &self,
        live: &dyn Partition,
        request: &Request,
    ) -> CacheResult<(Response, Source)> {
        let url = self.ctx.origin.canonical_url(ROOT_KEY);

        match self
            .ctx
            .transport
            .fetch(request, FetchOptions::default())
            .await
        {
            Ok(response) => {
                if response.is_ok() {
                    store_copy(live, &url, &response).await;
                }
                Ok((response, Source::Network))
            }
            Err(fetch_err) => match live.get(&url).await {
                Ok(Some(cached)) => {
                    info!("Network unavailable ({}), serving cached root", fetch_err);
                    Ok((cached, Source::Cache))
                }
                Ok(None) => Err(fetch_err.into()),
                Err(e) => {
                    warn!("Cache lookup for {} failed: {}", url, e);
                    Err(fetch_err.into())
                }
            },
        }
    }
}

/// Keep a copy of a fetched response; failures only cost a future cache hit
async fn store_copy(live: &dyn Partition, url: &str, response: &Response) {
    match live.put(url, response).await {
        Ok(()) => debug!("Cached {}", url),
        Err(e) => warn!("Failed to cache {}: {}", url, e),
    }
}
