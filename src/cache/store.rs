//! Primary byte store backends.
//!
//! The primary store holds the authoritative cached bytes under their
//! sha256 key, with per-entry TTL. [`RedisStore`] is the production
//! backend; [`MemoryStore`] is an in-process implementation used by tests
//! and single-node deployments without a Redis server.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::error::SourceError;

/// Deadline for the Redis connectivity ping.
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Keyed byte store with TTL, the primary tier of the source cache.
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Fetch the bytes for a key, `None` on a miss or an expired entry.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SourceError>;

    /// Store bytes under a key with the given time-to-live.
    async fn put(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), SourceError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), SourceError>;
}

// =============================================================================
// Redis Store
// =============================================================================

/// Redis-backed [`ByteStore`].
///
/// Uses a connection manager, so a dropped connection is re-established
/// transparently between commands.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the given Redis URL (`redis://` or `rediss://`).
    pub async fn connect(url: &str) -> Result<Self, SourceError> {
        let client = redis::Client::open(url)
            .map_err(|e| SourceError::Store(format!("invalid redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| SourceError::Connection(format!("redis connect failed: {}", e)))?;
        Ok(Self { conn })
    }

    /// Round-trip a PING, with the probe deadline applied.
    pub async fn ping(&self) -> Result<(), SourceError> {
        let mut conn = self.conn.clone();
        let ping = async move {
            let pong: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| SourceError::Connection(format!("redis ping failed: {}", e)))?;
            Ok::<_, SourceError>(pong)
        };
        match timeout(PING_TIMEOUT, ping).await {
            Err(_) => Err(SourceError::Connection(format!(
                "redis ping timed out after {}s",
                PING_TIMEOUT.as_secs()
            ))),
            Ok(result) => result.map(|_| ()),
        }
    }
}

#[async_trait]
impl ByteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SourceError> {
        let mut conn = self.conn.clone();
        let data: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| SourceError::Store(format!("redis GET failed: {}", e)))?;
        Ok(data.map(Bytes::from))
    }

    async fn put(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), SourceError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, data, ttl.as_secs())
            .await
            .map_err(|e| SourceError::Store(format!("redis SET failed: {}", e)))
    }

    async fn delete(&self, key: &str) -> Result<(), SourceError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| SourceError::Store(format!("redis DEL failed: {}", e)))
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-process [`ByteStore`] with TTL semantics.
pub struct MemoryStore {
    entries: RwLock<HashMap<String, (Bytes, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|(_, expiry)| *expiry > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SourceError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((data, expiry)) if *expiry > Instant::now() => Ok(Some(data.clone())),
            _ => Ok(None),
        }
    }

    async fn put(&self, key: &str, data: &[u8], ttl: Duration) -> Result<(), SourceError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            (Bytes::copy_from_slice(data), Instant::now() + ttl),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SourceError> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
