//! Periodic sentinel eviction.
//!
//! Sentinel files are pure filesystem hygiene: the primary store's TTL
//! expires the actual bytes, so the sweep can be coarse. Once per period
//! the oldest files (by mtime) are deleted, a bounded batch at a time. A
//! failed sweep is retried once after a short delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::source_cache::SourceCache;
use super::store::ByteStore;

/// Period between sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Delay before the single retry of a failed sweep.
pub const SWEEP_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// Maximum sentinels deleted per sweep.
pub const DEFAULT_SWEEP_BATCH: usize = 100;

/// Background job deleting stale sentinel files.
pub struct Evictor<B: ByteStore + 'static> {
    cache: Arc<SourceCache<B>>,
    interval: Duration,
    batch: usize,
}

impl<B: ByteStore + 'static> Evictor<B> {
    /// Create an evictor with the default period and batch size.
    pub fn new(cache: Arc<SourceCache<B>>) -> Self {
        Self {
            cache,
            interval: SWEEP_INTERVAL,
            batch: DEFAULT_SWEEP_BATCH,
        }
    }

    /// Override the sweep period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Override the per-sweep deletion batch.
    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    /// Spawn the sweep loop onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick of an interval fires immediately; consume it so
            // the first sweep happens one full period after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = self.cache.sweep(self.batch).await {
                    warn!(
                        "sentinel sweep failed: {}, retrying in {}s",
                        e,
                        SWEEP_RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(SWEEP_RETRY_DELAY).await;
                    if let Err(e) = self.cache.sweep(self.batch).await {
                        error!("sentinel sweep retry failed: {}", e);
                    }
                }
            }
        })
    }
}
