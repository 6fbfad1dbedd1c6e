//! Error types for cachesync
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cachesync operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A network fetch that did not produce a usable response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Response body for {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },
}

impl FetchError {
    /// Create a connectivity error
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Status { url, .. } | Self::BodyTooLarge { url, .. } => {
                url
            }
        }
    }
}

/// All errors that can occur in cachesync
#[derive(Error, Debug)]
pub enum CacheError {
    // Manifest errors
    #[error("Stored manifest is corrupt: {reason}")]
    ManifestCorrupt { reason: String },

    #[error("Release file not found: {0}")]
    ReleaseNotFound(PathBuf),

    #[error("Invalid release file {path}: {reason}")]
    ReleaseInvalid { path: PathBuf, reason: String },

    // Reconciliation errors
    #[error("Cache upgrade failed, all partitions were reset: {source}")]
    Reconcile {
        #[source]
        source: Box<CacheError>,
    },

    #[error("Cache has not been activated for this release")]
    NotActivated,

    #[error("No staged release found in {0}")]
    NotInstalled(String),

    #[error("Lifecycle phase is {actual}, expected {expected}")]
    InvalidPhase {
        expected: &'static str,
        actual: &'static str,
    },

    // Network errors
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),

    #[error("No origin configured")]
    OriginNotConfigured,

    // Store errors
    #[error("Corrupt cache entry {path}: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("Invalid partition name: {0}")]
    PartitionNameInvalid(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Network { .. }) => true,
            Self::Fetch(FetchError::Status { status, .. }) => *status >= 500,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotActivated => Some("Run: cachesync sync"),
            Self::NotInstalled(_) => Some("Run: cachesync install"),
            Self::OriginNotConfigured => Some("Pass --origin or set app.origin in the config"),
            Self::Reconcile { .. } => Some("Run: cachesync sync to rebuild the cache"),
            Self::ReleaseNotFound(_) => Some("Pass --release or set app.release in the config"),
            Self::Fetch(FetchError::Network { .. }) => Some("Check connectivity to the origin"),
            _ => None,
        }
    }
}
