//! Source-byte caching.
//!
//! The cache layer sits between the service and the image source:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              ImageService               │
//! └────────────────────┬────────────────────┘
//!                      │ fetch(identifier)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             CachedSource                │
//! │  ┌──────────────┐   ┌────────────────┐  │
//! │  │ SourceCache  │   │  inner source  │  │
//! │  │ (sentinels + │   │  (S3 / local)  │  │
//! │  │  ByteStore)  │   │                │  │
//! │  └──────────────┘   └────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ByteStore`]: the primary tier, a keyed byte store with TTL
//!   ([`RedisStore`] in production, [`MemoryStore`] in tests)
//! - [`SourceCache`]: sha256 keys, sentinel files, single-flight locking,
//!   and self-repair of dangling sentinels
//! - [`CachedSource`]: an `ImageSource` decorator routing fetches through
//!   the cache
//! - [`Evictor`]: periodic sweep of the oldest sentinel files

mod evictor;
mod source_cache;
mod store;

pub use evictor::{Evictor, DEFAULT_SWEEP_BATCH, SWEEP_INTERVAL, SWEEP_RETRY_DELAY};
pub use source_cache::{CacheStats, CachedSource, SourceCache, CACHE_TTL};
pub use store::{ByteStore, MemoryStore, RedisStore, PING_TIMEOUT};
