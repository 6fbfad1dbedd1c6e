//! On-disk blob store
//!
//! Layout under the store root:
//!
//! ```text
//! {root}/
//! ├── app-cache/
//! │   ├── {sha256(url)}.json   # entry metadata (url, status, headers, body digest)
//! │   └── {sha256(url)}.body   # raw response body
//! ├── app-temp-cache/
//! └── app-manifest/
//! ```
//!
//! Files are written to a temporary name and renamed into place. The
//! metadata file is written after the body, so an entry only becomes
//! visible once both are complete. Entries whose body no longer matches
//! the recorded digest are removed on read.

use super::{validate_partition_name, BlobStore, Partition, Response};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Entry metadata persisted next to the body
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    #[serde(default)]
    headers: Vec<(String, String)>,
    body_sha256: String,
    stored_at: DateTime<Utc>,
}

/// Blob store keeping one directory per partition
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, name: &str) -> CacheResult<PathBuf> {
        validate_partition_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn open(&self, name: &str) -> CacheResult<Box<dyn Partition>> {
        let dir = self.partition_dir(name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(format!("creating partition {}", dir.display()), e))?;
        Ok(Box::new(FsPartition {
            name: name.to_string(),
            dir,
        }))
    }

    async fn delete_partition(&self, name: &str) -> CacheResult<bool> {
        let dir = self.partition_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Deleted partition {}", dir.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(
                format!("deleting partition {}", dir.display()),
                e,
            )),
        }
    }

    async fn partitions(&self) -> CacheResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(CacheError::io("reading store directory", e)),
        };

        let mut names = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("reading store entry", e))?
        {
            let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
            if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
                if validate_partition_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

struct FsPartition {
    name: String,
    dir: PathBuf,
}

impl FsPartition {
    fn entry_paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let stem = hex::encode(Sha256::digest(url.as_bytes()));
        (
            self.dir.join(format!("{}.{}", stem, META_EXT)),
            self.dir.join(format!("{}.{}", stem, BODY_EXT)),
        )
    }

    async fn read_meta(&self, path: &Path) -> CacheResult<Option<EntryMeta>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::io(
                    format!("reading cache entry {}", path.display()),
                    e,
                ))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::StoreCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn remove_entry_files(&self, meta_path: &Path, body_path: &Path) -> CacheResult<bool> {
        let existed = remove_if_exists(meta_path).await?;
        remove_if_exists(body_path).await?;
        Ok(existed)
    }
}

#[async_trait]
impl Partition for FsPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, url: &str) -> CacheResult<Option<Response>> {
        let (meta_path, body_path) = self.entry_paths(url);

        let meta = match self.read_meta(&meta_path).await {
            Ok(Some(meta)) => meta,
            Ok(None) => return Ok(None),
            Err(CacheError::StoreCorrupt { path, reason }) => {
                warn!("Dropping corrupt cache entry {}: {}", path.display(), reason);
                self.remove_entry_files(&meta_path, &body_path).await?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let body = match fs::read(&body_path).await {
            Ok(body) => body,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Dropping cache entry {} with missing body", url);
                self.remove_entry_files(&meta_path, &body_path).await?;
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheError::io(
                    format!("reading cache body {}", body_path.display()),
                    e,
                ))
            }
        };

        if hex::encode(Sha256::digest(&body)) != meta.body_sha256 {
            warn!("Dropping cache entry {} with mismatched body digest", url);
            self.remove_entry_files(&meta_path, &body_path).await?;
            return Ok(None);
        }

        Ok(Some(Response {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, url: &str, response: &Response) -> CacheResult<()> {
        let (meta_path, body_path) = self.entry_paths(url);
        let meta = EntryMeta {
            url: url.to_string(),
            status: response.status,
            headers: response.headers.clone(),
            body_sha256: hex::encode(Sha256::digest(&response.body)),
            stored_at: Utc::now(),
        };

        atomic_write(&body_path, &response.body).await?;
        atomic_write(&meta_path, serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        debug!("Stored {} in {}", url, self.name);
        Ok(())
    }

    async fn delete(&self, url: &str) -> CacheResult<bool> {
        let (meta_path, body_path) = self.entry_paths(url);
        self.remove_entry_files(&meta_path, &body_path).await
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(CacheError::io(
                    format!("reading partition {}", self.dir.display()),
                    e,
                ))
            }
        };

        let mut urls = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io("reading partition entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == META_EXT) {
                match self.read_meta(&path).await {
                    Ok(Some(meta)) => urls.push(meta.url),
                    Ok(None) => {}
                    Err(CacheError::StoreCorrupt { path, reason }) => {
                        warn!("Dropping corrupt cache entry {}: {}", path.display(), reason);
                        self.remove_entry_files(&path, &path.with_extension(BODY_EXT))
                            .await?;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        urls.sort();
        Ok(urls)
    }
}

async fn remove_if_exists(path: &Path) -> CacheResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::io(format!("removing {}", path.display()), e)),
    }
}

/// Write `bytes` to a sibling temp file and rename it over `path`
async fn atomic_write(path: &Path, bytes: &[u8]) -> CacheResult<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CacheError::Internal(format!("invalid entry path {}", path.display())))?;
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = path.with_file_name(format!(
        ".{}.tmp.{}.{}",
        file_name,
        std::process::id(),
        counter
    ));

    if let Err(e) = fs::write(&tmp_path, bytes).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(CacheError::io(format!("writing {}", tmp_path.display()), e));
    }

    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| CacheError::io(format!("renaming into {}", path.display()), e))
}
