//! Shared engine context
//!
//! Everything the engine components need to reach their collaborators,
//! passed explicitly instead of living in ambient globals. Cloning is cheap.

use crate::key::Origin;
use crate::store::BlobStore;
use crate::transport::Transport;
use std::sync::Arc;

/// Names of the three partitions owned by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    /// Authoritative cache serving reads
    pub live: String,
    /// Shell resources fetched during install
    pub staging: String,
    /// Manifest of the last completed upgrade
    pub manifest: String,
}

impl Default for PartitionNames {
    fn default() -> Self {
        Self {
            live: "app-cache".to_string(),
            staging: "app-temp-cache".to_string(),
            manifest: "app-manifest".to_string(),
        }
    }
}

impl PartitionNames {
    pub fn all(&self) -> [&str; 3] {
        [&self.live, &self.staging, &self.manifest]
    }
}

/// Collaborators and settings shared by every engine component
#[derive(Clone)]
pub struct CacheContext {
    pub store: Arc<dyn BlobStore>,
    pub transport: Arc<dyn Transport>,
    pub origin: Origin,
    pub partitions: PartitionNames,
    /// Paths served as the root document
    pub root_aliases: Vec<String>,
    /// Parallel fetches while downloading for offline use
    pub offline_concurrency: usize,
}

impl CacheContext {
    pub fn new(store: Arc<dyn BlobStore>, transport: Arc<dyn Transport>, origin: Origin) -> Self {
        Self {
            store,
            transport,
            origin,
            partitions: PartitionNames::default(),
            root_aliases: vec!["index.html".to_string()],
            offline_concurrency: 4,
        }
    }

    pub fn with_partitions(mut self, partitions: PartitionNames) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_root_aliases(mut self, aliases: Vec<String>) -> Self {
        self.root_aliases = aliases;
        self
    }

    pub fn with_offline_concurrency(mut self, concurrency: usize) -> Self {
        self.offline_concurrency = concurrency.max(1);
        self
    }
}
