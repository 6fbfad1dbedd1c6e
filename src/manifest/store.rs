//! Persistence of the last reconciled manifest
//!
//! The manifest partition holds a single entry under [`MANIFEST_KEY`]: the
//! JSON manifest that was active when the last upgrade completed. It is the
//! baseline the next upgrade diffs against.

use super::ResourceManifest;
use crate::error::{CacheError, CacheResult};
use crate::store::{Partition, Response};
use tracing::debug;

/// Entry key of the stored manifest
pub const MANIFEST_KEY: &str = "manifest";

/// Reads and writes the manifest entry of a partition
pub struct ManifestStore<'a> {
    partition: &'a dyn Partition,
}

impl<'a> ManifestStore<'a> {
    pub fn new(partition: &'a dyn Partition) -> Self {
        Self { partition }
    }

    /// Load the stored manifest; `None` means no upgrade has completed yet
    pub async fn load(&self) -> CacheResult<Option<ResourceManifest>> {
        let Some(entry) = self.partition.get(MANIFEST_KEY).await? else {
            debug!("No stored manifest in {}", self.partition.name());
            return Ok(None);
        };

        serde_json::from_slice(&entry.body)
            .map(Some)
            .map_err(|e| CacheError::ManifestCorrupt {
                reason: e.to_string(),
            })
    }

    /// Replace the stored manifest
    pub async fn save(&self, manifest: &ResourceManifest) -> CacheResult<()> {
        let body = serde_json::to_vec(manifest)?;
        let entry = Response::new(200, body).with_header("content-type", "application/json");
        self.partition.put(MANIFEST_KEY, &entry).await?;
        debug!(
            "Stored manifest with {} resources in {}",
            manifest.len(),
            self.partition.name()
        );
        Ok(())
    }
}
