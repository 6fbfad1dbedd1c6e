//! Cache reconciliation
//!
//! Runs once per activation and moves the cache from the previous deploy's
//! generation to the current one:
//!
//! 1. Open the live, staging and manifest partitions.
//! 2. Without a stored manifest (first install, or after a reset) the live
//!    partition is rebuilt from staging alone. Otherwise every live entry
//!    whose key was dropped from the new manifest, or whose fingerprint
//!    changed, is evicted; unchanged entries stay. Staged shell resources
//!    are then copied over live, replacing anything kept.
//! 3. Staging is deleted.
//! 4. The new manifest becomes the baseline for the next upgrade.
//!
//! Any failure along the way deletes all three partitions. A cache with
//! entries from two deploys is never left behind.

use crate::context::CacheContext;
use crate::error::{CacheError, CacheResult};
use crate::manifest::{ManifestStore, ResourceManifest};
use crate::store::{copy_entries, Partition};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Outcome of a successful reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// No previous manifest was found
    pub cold_start: bool,
    /// Keys (or URLs, when no key could be derived) removed from live
    pub evicted: Vec<String>,
    /// Live entries kept from the previous deploy
    pub retained: usize,
    /// Staged entries copied into live
    pub promoted: usize,
}

/// Diffs manifests and switches the live partition to a new deploy
pub struct Reconciler {
    ctx: CacheContext,
    in_flight: Mutex<()>,
}

impl Reconciler {
    pub fn new(ctx: CacheContext) -> Self {
        Self {
            ctx,
            in_flight: Mutex::new(()),
        }
    }

    /// Reconcile the cache against `manifest`
    ///
    /// Concurrent calls are serialized. On error every partition has been
    /// deleted and the cause is wrapped in [`CacheError::Reconcile`].
    pub async fn reconcile(&self, manifest: &ResourceManifest) -> CacheResult<ReconcileReport> {
        let _guard = self.in_flight.lock().await;

        match self.upgrade(manifest).await {
            Ok(report) => {
                info!(
                    "Cache upgraded: {} evicted, {} retained, {} promoted{}",
                    report.evicted.len(),
                    report.retained,
                    report.promoted,
                    if report.cold_start { " (cold start)" } else { "" }
                );
                Ok(report)
            }
            Err(e) => {
                error!("Failed to upgrade cache: {}", e);
                self.reset().await;
                Err(CacheError::Reconcile {
                    source: Box::new(e),
                })
            }
        }
    }

    /// Delete every engine partition, logging failures
    pub async fn reset(&self) {
        for name in self.ctx.partitions.all() {
            if let Err(e) = self.ctx.store.delete_partition(name).await {
                warn!("Failed to delete partition {}: {}", name, e);
            }
        }
    }

    async fn upgrade(&self, manifest: &ResourceManifest) -> CacheResult<ReconcileReport> {
        let names = &self.ctx.partitions;
        let mut live = self.ctx.store.open(&names.live).await?;
        let staging = self.ctx.store.open(&names.staging).await?;
        let manifest_partition = self.ctx.store.open(&names.manifest).await?;
        let manifests = ManifestStore::new(&*manifest_partition);

        let mut report = ReconcileReport::default();
        match manifests.load().await? {
            None => {
                debug!("No previous manifest, rebuilding {}", names.live);
                report.cold_start = true;
                self.ctx.store.delete_partition(&names.live).await?;
                live = self.ctx.store.open(&names.live).await?;
            }
            Some(previous) => {
                self.evict_stale(&*live, manifest, &previous, &mut report)
                    .await?;
            }
        }

        report.promoted = copy_entries(&*staging, &*live).await?;
        drop(staging);
        self.ctx.store.delete_partition(&names.staging).await?;

        manifests.save(manifest).await?;
        Ok(report)
    }

    async fn evict_stale(
        &self,
        live: &dyn Partition,
        manifest: &ResourceManifest,
        previous: &ResourceManifest,
        report: &mut ReconcileReport,
    ) -> CacheResult<()> {
        for url in live.keys().await? {
            let stale = match self.ctx.origin.relative_key(&url) {
                Some(key) if !manifest.is_stale(&key, previous) => None,
                Some(key) => Some(key),
                None => Some(url.clone()),
            };

            match stale {
                Some(label) => {
                    debug!("Evicting {}", label);
                    live.delete(&url).await?;
                    report.evicted.push(label);
                }
                None => report.retained += 1,
            }
        }
        Ok(())
    }
}
