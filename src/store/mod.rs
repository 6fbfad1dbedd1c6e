//! Blob store abstraction
//!
//! A store holds named partitions, each a durable map from request URL to
//! stored response. The engine owns three partitions by convention:
//!
//! | Partition | Default name | Contents |
//! |-----------|--------------|----------|
//! | Live | `app-cache` | Authoritative entries serving reads |
//! | Staging | `app-temp-cache` | Shell resources fetched during install |
//! | Manifest | `app-manifest` | The manifest of the last successful upgrade |

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;

/// A response as kept in a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,

    /// Response headers in received order
    pub headers: Vec<(String, String)>,

    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A named collection of cached responses
#[async_trait]
pub trait Partition: Send + Sync {
    /// Partition name
    fn name(&self) -> &str;

    /// Look up the entry for a URL
    async fn get(&self, url: &str) -> CacheResult<Option<Response>>;

    /// Store an entry, replacing any existing one
    async fn put(&self, url: &str, response: &Response) -> CacheResult<()>;

    /// Remove an entry, returning whether it existed
    async fn delete(&self, url: &str) -> CacheResult<bool>;

    /// URLs of all entries
    async fn keys(&self) -> CacheResult<Vec<String>>;
}

/// Durable storage for cache partitions
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Open a partition, creating it if needed
    async fn open(&self, name: &str) -> CacheResult<Box<dyn Partition>>;

    /// Delete a partition and all its entries, returning whether it existed
    async fn delete_partition(&self, name: &str) -> CacheResult<bool>;

    /// Names of existing partitions
    async fn partitions(&self) -> CacheResult<Vec<String>>;
}

/// Validate a partition name for use as a storage identifier
pub fn validate_partition_name(name: &str) -> CacheResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::PartitionNameInvalid(name.to_string()))
    }
}

/// Copy every entry of `from` into `into`, returning how many were copied
pub async fn copy_entries(from: &dyn Partition, into: &dyn Partition) -> CacheResult<usize> {
    let mut copied = 0;
    for url in from.keys().await? {
        // Entries may vanish between listing and reading
        if let Some(response) = from.get(&url).await? {
            into.put(&url, &response).await?;
            copied += 1;
        }
    }
    Ok(copied)
}
