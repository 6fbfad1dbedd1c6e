//! Configuration schema for cachesync
//!
//! Configuration is stored at `~/.config/cachesync/config.toml`

use crate::context::PartitionNames;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Served application settings
    pub app: AppConfig,

    /// Blob store settings
    pub store: StoreConfig,

    /// Network settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Served application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Origin the app is served from (e.g. "https://app.example.com")
    pub origin: Option<String>,

    /// Release file emitted by the build
    pub release: PathBuf,

    /// Paths served as the root document
    pub root_aliases: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: None,
            release: PathBuf::from("release.json"),
            root_aliases: vec!["index.html".to_string()],
        }
    }
}

/// Blob store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store directory (defaults to the local data directory)
    pub dir: Option<PathBuf>,

    /// Live partition name
    pub live: String,

    /// Staging partition name
    pub staging: String,

    /// Manifest partition name
    pub manifest: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let names = PartitionNames::default();
        Self {
            dir: None,
            live: names.live,
            staging: names.staging,
            manifest: names.manifest,
        }
    }
}

impl StoreConfig {
    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames {
            live: self.live.clone(),
            staging: self.staging.clone(),
            manifest: self.manifest.clone(),
        }
    }
}

/// Network settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Largest response body accepted
    pub max_body_bytes: u64,

    /// Parallel fetches while downloading for offline use
    pub offline_concurrency: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_body_bytes: 64 * 1024 * 1024,
            offline_concurrency: 4,
        }
    }
}
