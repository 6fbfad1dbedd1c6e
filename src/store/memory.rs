//! In-memory blob store
//!
//! Used by tests and by hosts that keep their cache in process. Deleting a
//! partition detaches it: handles opened earlier keep their entries but are
//! no longer reachable through the store.

use super::{validate_partition_name, BlobStore, Partition, Response};
use crate::error::CacheResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Entries = Arc<RwLock<BTreeMap<String, Response>>>;

/// Blob store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    partitions: RwLock<BTreeMap<String, Entries>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn open(&self, name: &str) -> CacheResult<Box<dyn Partition>> {
        validate_partition_name(name)?;
        let mut partitions = self.partitions.write().await;
        let entries = partitions.entry(name.to_string()).or_default().clone();
        Ok(Box::new(MemoryPartition {
            name: name.to_string(),
            entries,
        }))
    }

    async fn delete_partition(&self, name: &str) -> CacheResult<bool> {
        Ok(self.partitions.write().await.remove(name).is_some())
    }

    async fn partitions(&self) -> CacheResult<Vec<String>> {
        Ok(self.partitions.read().await.keys().cloned().collect())
    }
}

struct MemoryPartition {
    name: String,
    entries: Entries,
}

#[async_trait]
impl Partition for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, url: &str) -> CacheResult<Option<Response>> {
        Ok(self.entries.read().await.get(url).cloned())
    }

    async fn put(&self, url: &str, response: &Response) -> CacheResult<()> {
        self.entries
            .write()
            .await
            .insert(url.to_string(), response.clone());
        Ok(())
    }

    async fn delete(&self, url: &str) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(url).is_some())
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.open("live").await.unwrap();
        first
            .put("http://a.test/x", &Response::new(200, "x"))
            .await
            .unwrap();

        let second = store.open("live").await.unwrap();
        assert!(second.get("http://a.test/x").await.unwrap().is_some());
        assert_eq!(store.partitions().await.unwrap(), vec!["live".to_string()]);
    }

    #[tokio::test]
    async fn delete_partition_drops_entries() {
        let store = MemoryStore::new();
        let live = store.open("live").await.unwrap();
        live.put("http://a.test/x", &Response::new(200, "x"))
            .await
            .unwrap();

        assert!(store.delete_partition("live").await.unwrap());
        assert!(!store.delete_partition("live").await.unwrap());

        let reopened = store.open("live").await.unwrap();
        assert!(reopened.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_entry() {
        let store = MemoryStore::new();
        let live = store.open("live").await.unwrap();
        live.put("http://a.test/x", &Response::new(200, "x"))
            .await
            .unwrap();

        assert!(live.delete("http://a.test/x").await.unwrap());
        assert!(!live.delete("http://a.test/x").await.unwrap());
        assert!(live.get("http://a.test/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_bad_partition_name() {
        let store = MemoryStore::new();
        assert!(store.open("../escape").await.is_err());
    }
}
