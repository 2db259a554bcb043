//! Two-tier source cache with per-identifier single-flight.
//!
//! The cache pairs a remote primary store (the bytes, with TTL) with local
//! sentinel files (existence markers, mtime used for eviction ordering).
//! The sha256 of the identifier is the only key; sentinel filenames are its
//! lowercase hex form with empty bodies.
//!
//! # Invariants
//!
//! - A sentinel file implies a primary entry under the same key. The
//!   implication is eventual: a dangling sentinel is repaired by deleting
//!   it on the next lookup miss.
//! - At most one in-flight load per identifier: a lookup holds that
//!   identifier's mutex for the whole `get_or_load` call, so concurrent
//!   requests for the same image wait for the first loader instead of
//!   re-fetching.
//!
//! # Failure semantics
//!
//! A primary-store outage degrades to always-load; stale bytes are never
//! served. Sentinel I/O failures are logged and ignored, costing at most a
//! redundant primary read later.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::source::ImageSource;

use super::store::ByteStore;

/// Time-to-live of primary cache entries.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// SourceCache
// =============================================================================

/// Keyed byte cache in front of an image source.
pub struct SourceCache<B: ByteStore> {
    /// Primary store holding the actual bytes
    store: B,

    /// Directory of sentinel files
    sentinel_dir: PathBuf,

    /// TTL applied to primary writes
    ttl: Duration,

    /// Per-identifier locks. Entries are created on first use and retained
    /// for the process lifetime; identifier cardinality is bounded by the
    /// corpus.
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,

    /// Held shared by lookups, exclusively by the sentinel sweep.
    sweep_lock: RwLock<()>,
}

impl<B: ByteStore> SourceCache<B> {
    /// Create a cache over the given primary store and sentinel directory.
    pub fn new(store: B, sentinel_dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(store, sentinel_dir, CACHE_TTL)
    }

    /// Create a cache with a custom primary TTL.
    pub fn with_ttl(store: B, sentinel_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            store,
            sentinel_dir: sentinel_dir.into(),
            ttl,
            locks: StdMutex::new(HashMap::new()),
            sweep_lock: RwLock::new(()),
        }
    }

    /// The cache key for an identifier: lowercase hex sha256.
    pub fn cache_key(identifier: &str) -> String {
        hex::encode(Sha256::digest(identifier.as_bytes()))
    }

    fn sentinel_path(&self, key: &str) -> PathBuf {
        self.sentinel_dir.join(key)
    }

    fn lock_for(&self, identifier: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        locks.entry(identifier.to_string()).or_default().clone()
    }

    /// Return the cached bytes for an identifier, invoking `loader` on a
    /// miss.
    ///
    /// The per-identifier lock is held for the whole call. On a successful
    /// load the primary store is written first; the sentinel is only
    /// created once that write succeeded. Loader failures propagate without
    /// touching either tier.
    pub async fn get_or_load<F, Fut>(
        &self,
        identifier: &str,
        loader: F,
    ) -> Result<Bytes, SourceError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Bytes, SourceError>> + Send,
    {
        let lock = self.lock_for(identifier);
        let _flight = lock.lock().await;
        let _shared = self.sweep_lock.read().await;

        let key = Self::cache_key(identifier);
        let sentinel = self.sentinel_path(&key);

        if tokio::fs::try_exists(&sentinel).await.unwrap_or(false) {
            match self.store.get(&key).await {
                Ok(Some(data)) => {
                    debug!(identifier, "source cache hit");
                    return Ok(data);
                }
                Ok(None) => {
                    // Dangling sentinel; repair it before reloading.
                    if let Err(e) = tokio::fs::remove_file(&sentinel).await {
                        warn!(
                            "failed to remove dangling sentinel {}: {}",
                            sentinel.display(),
                            e
                        );
                    }
                }
                Err(e) => {
                    warn!("primary store lookup failed, loading from source: {}", e);
                }
            }
        }

        let data = loader().await?;

        match self.store.put(&key, &data, self.ttl).await {
            Ok(()) => {
                if let Err(e) = tokio::fs::write(&sentinel, b"").await {
                    warn!("failed to write sentinel {}: {}", sentinel.display(), e);
                }
            }
            Err(e) => warn!("primary store write failed, serving uncached bytes: {}", e),
        }

        Ok(data)
    }

    /// Delete the oldest sentinel files, up to `batch` of them.
    ///
    /// Ordering is ascending mtime. Runs exclusively with respect to
    /// lookups; the primary store's TTL expires the actual data.
    pub async fn sweep(&self, batch: usize) -> Result<usize, SourceError> {
        let _exclusive = self.sweep_lock.write().await;

        let mut entries = self.sentinel_entries().await?;
        entries.sort_by_key(|(_, mtime)| *mtime);

        let mut deleted = 0;
        for (path, _) in entries.into_iter().take(batch) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!("failed to delete sentinel {}: {}", path.display(), e),
            }
        }

        info!(deleted, "sentinel sweep complete");
        Ok(deleted)
    }

    /// Number of sentinel files currently on disk.
    pub async fn sentinel_count(&self) -> usize {
        self.sentinel_entries().await.map(|v| v.len()).unwrap_or(0)
    }

    async fn sentinel_entries(&self) -> Result<Vec<(PathBuf, SystemTime)>, SourceError> {
        let mut dir = tokio::fs::read_dir(&self.sentinel_dir).await.map_err(|e| {
            SourceError::Store(format!(
                "failed to read sentinel directory {}: {}",
                self.sentinel_dir.display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| SourceError::Store(format!("failed to list sentinel directory: {}", e)))?
        {
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    warn!("failed to stat sentinel {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !meta.is_file() {
                continue;
            }
            let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((entry.path(), mtime));
        }
        Ok(entries)
    }

    /// The sentinel directory this cache manages.
    pub fn sentinel_dir(&self) -> &Path {
        &self.sentinel_dir
    }
}

// =============================================================================
// CacheStats
// =============================================================================

/// Read-only occupancy view of a source cache.
///
/// The stats endpoint holds the cache through this trait so it stays
/// agnostic to the primary store type.
#[async_trait]
pub trait CacheStats: Send + Sync {
    /// Number of sentinel files currently on disk.
    async fn sentinel_count(&self) -> usize;
}

#[async_trait]
impl<B: ByteStore> CacheStats for SourceCache<B> {
    async fn sentinel_count(&self) -> usize {
        SourceCache::sentinel_count(self).await
    }
}

// =============================================================================
// CachedSource
// =============================================================================

/// An [`ImageSource`] decorator that routes fetches through a
/// [`SourceCache`].
pub struct CachedSource<S: ImageSource, B: ByteStore> {
    source: S,
    cache: Arc<SourceCache<B>>,
}

impl<S: ImageSource, B: ByteStore> CachedSource<S, B> {
    pub fn new(source: S, cache: Arc<SourceCache<B>>) -> Self {
        Self { source, cache }
    }

    /// The shared cache, e.g. for the eviction job.
    pub fn cache(&self) -> &Arc<SourceCache<B>> {
        &self.cache
    }
}

#[async_trait]
impl<S: ImageSource, B: ByteStore> ImageSource for CachedSource<S, B> {
    async fn fetch(&self, identifier: &str) -> Result<Bytes, SourceError> {
        self.cache
            .get_or_load(identifier, || self.source.fetch(identifier))
            .await
    }
}

// =============================================================================
// Tests
// =============================================================================
