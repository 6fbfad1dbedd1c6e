//! Network prefetching
//!
//! Two ways of filling the cache ahead of requests: the shell prefetch run
//! at install time, which stages the resources the app needs to start, and
//! the on-demand download of everything the live partition is still missing.

use crate::context::CacheContext;
use crate::error::{CacheResult, FetchError};
use crate::manifest::ResourceManifest;
use crate::transport::{FetchOptions, Request};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of downloading the remaining manifest resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfflineReport {
    /// Resources that were already in the live partition
    pub already_cached: usize,
    /// Keys fetched and stored
    pub fetched: Vec<String>,
    /// Keys that could not be fetched, with the reason
    pub failed: Vec<(String, String)>,
}

impl OfflineReport {
    /// Whether every manifest resource is now cached
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fetches resources into the engine's partitions
pub struct Prefetcher {
    ctx: CacheContext,
}

impl Prefetcher {
    pub fn new(ctx: CacheContext) -> Self {
        Self { ctx }
    }

    /// Fetch every shell resource into staging, in order
    ///
    /// Each fetch bypasses intermediate caches. The first transport failure
    /// or non-2xx response aborts the prefetch; entries staged before it
    /// remain in place.
    pub async fn prefetch_shell(&self, shell: &[String]) -> CacheResult<usize> {
        let staging = self.ctx.store.open(&self.ctx.partitions.staging).await?;

        for key in shell {
            let url = self.ctx.origin.canonical_url(key);
            let response = self
                .ctx
                .transport
                .fetch(&Request::get(url.as_str()), FetchOptions::reload())
                .await?;
            if !response.is_ok() {
                return Err(FetchError::Status {
                    url,
                    status: response.status,
                }
                .into());
            }
            staging.put(&url, &response).await?;
            debug!("Staged {}", key);
        }

        info!("Staged {} shell resources", shell.len());
        Ok(shell.len())
    }

    /// Fetch and store every manifest resource missing from live
    ///
    /// Fetches run with bounded concurrency. A resource that fails to fetch
    /// is reported and skipped; store failures abort.
    pub async fn prefetch_remaining(&self, manifest: &ResourceManifest) -> CacheResult<OfflineReport> {
        let live = self.ctx.store.open(&self.ctx.partitions.live).await?;
        let cached: HashSet<String> = live
            .keys()
            .await?
            .iter()
            .filter_map(|url| self.ctx.origin.relative_key(url))
            .collect();

        let missing: Vec<&str> = manifest.keys().filter(|key| !cached.contains(*key)).collect();
        let mut report = OfflineReport {
            already_cached: manifest.len() - missing.len(),
            ..OfflineReport::default()
        };
        debug!("{} resources missing from {}", missing.len(), live.name());

        let origin = &self.ctx.origin;
        let transport = &self.ctx.transport;
        let results: Vec<_> = stream::iter(missing)
            .map(|key| async move {
                let url = origin.canonical_url(key);
                let result = transport
                    .fetch(&Request::get(url.as_str()), FetchOptions::default())
                    .await;
                (key, url, result)
            })
            .buffer_unordered(self.ctx.offline_concurrency)
            .collect()
            .await;

        for (key, url, result) in results {
            match result {
                Ok(response) if response.is_ok() => {
                    live.put(&url, &response).await?;
                    report.fetched.push(key.to_string());
                }
                Ok(response) => {
                    let reason = format!("status {}", response.status);
                    warn!("Could not download {}: {}", key, reason);
                    report.failed.push((key.to_string(), reason));
                }
                Err(e) => {
                    warn!("Could not download {}: {}", key, e);
                    report.failed.push((key.to_string(), e.to_string()));
                }
            }
        }

        report.fetched.sort();
        report.failed.sort();
        info!(
            "Offline download: {} fetched, {} already cached, {} failed",
            report.fetched.len(),
            report.already_cached,
            report.failed.len()
        );
        Ok(report)
    }
}
