//! Cache store abstraction and backends.
//!
//! A store is a named mapping from cache key (normalized URL) to a
//! response snapshot. The name doubles as the store's version string;
//! see [`crate::CacheConfig::cache_name`] for the bump-on-change
//! contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::snapshot::CachedResponse;

/// Abstraction over snapshot storage for testability and backend choice.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Name of this store.
    fn name(&self) -> &str;

    /// Returns the snapshot stored under `key`, if any.
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>>;

    /// Stores `snapshot` under `key`, replacing any previous entry.
    async fn put(&self, key: &str, snapshot: &CachedResponse) -> Result<()>;

    /// Returns `true` if an entry exists for `key`.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.lookup(key).await?.is_some())
    }

    /// Number of entries in the store.
    async fn entry_count(&self) -> Result<usize>;
}

/// In-process store backed by a map. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    entries: Mutex<HashMap<String, CachedResponse>>,
}

impl MemoryStore {
    /// Creates an empty store with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, snapshot: &CachedResponse) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn entry_count(&self) -> Result<usize> {
        Ok(self.entries.lock().unwrap().len())
    }
}

/// Serialized per-entry metadata. The body lives in a sibling `.bin` file.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    status: u16,
    headers: Vec<(String, String)>,
    cached_at: DateTime<Utc>,
    body_len: u64,
}

/// Persistent store rooted at `<store_dir>/<name>/`.
///
/// Each entry is a metadata JSON file plus a body file, both named by the
/// SHA-256 of the cache key. Writes go through `.part` files renamed into
/// place, body before metadata, so a readable metadata file always refers
/// to a complete body.
///
/// Superseded stores (old names under the same root) are never deleted by
/// this type; clearing them is the caller's job.
#[derive(Debug)]
pub struct DiskStore {
    name: String,
    dir: PathBuf,
}

/// Hex digest of a cache key, used as the on-disk file stem.
fn key_stem(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

impl DiskStore {
    /// Opens (creating if absent) the store named `name` under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be created.
    pub async fn open(root: &Path, name: &str) -> Result<Self> {
        let dir = root.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            name: name.to_string(),
            dir,
        })
    }

    /// Directory holding this store's entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key_stem(key)))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", key_stem(key)))
    }

    /// Writes `contents` to `path` atomically via a `.part` sibling.
    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
        let part = path.with_extension(match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{ext}.part"),
            None => "part".to_string(),
        });
        tokio::fs::write(&part, contents).await?;
        tokio::fs::rename(&part, path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>> {
        let meta_bytes = match tokio::fs::read(self.meta_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: SnapshotMeta = serde_json::from_slice(&meta_bytes)?;
        let body = match tokio::fs::read(self.body_path(key)).await {
            Ok(bytes) => bytes,
            // Torn entry from an interrupted write; report a miss.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(CachedResponse::with_cached_at(
            meta.status,
            meta.headers,
            body,
            meta.cached_at,
        )))
    }

    async fn put(&self, key: &str, snapshot: &CachedResponse) -> Result<()> {
        let meta = SnapshotMeta {
            status: snapshot.status(),
            headers: snapshot.headers().to_vec(),
            cached_at: snapshot.cached_at(),
            body_len: snapshot.body_len(),
        };
        Self::write_atomic(&self.body_path(key), snapshot.body()).await?;
        Self::write_atomic(&self.meta_path(key), &serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.meta_path(key)).await.is_ok())
    }

    async fn entry_count(&self) -> Result<usize> {
        let mut count = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}
