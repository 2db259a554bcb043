//! Integration tests for the two-tier source cache.
//!
//! Verifies single-flight loading, sentinel repair, degradation on a
//! primary-store outage, and the cache sitting under the HTTP stack.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use tokio::time::sleep;
use tower::ServiceExt;

use iiif_server::cache::{ByteStore, CacheStats, CachedSource, MemoryStore, SourceCache};
use iiif_server::error::SourceError;
use iiif_server::server::RouterConfig;
use iiif_server::source::ImageSource;

use super::test_utils::{
    body_json, build_router, build_router_with, create_test_jpeg, get_request, MockImageSource,
};

// =============================================================================
// Test Doubles
// =============================================================================

/// A slow source that counts fetches and asserts they never overlap.
struct SlowCountingSource {
    data: Bytes,
    delay: Duration,
    fetch_count: Arc<AtomicUsize>,
    in_flight: AtomicBool,
}

impl SlowCountingSource {
    fn new(data: Vec<u8>, delay: Duration) -> Self {
        Self {
            data: Bytes::from(data),
            delay,
            fetch_count: Arc::new(AtomicUsize::new(0)),
            in_flight: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ImageSource for SlowCountingSource {
    async fn fetch(&self, _identifier: &str) -> Result<Bytes, SourceError> {
        let was_in_flight = self.in_flight.swap(true, Ordering::SeqCst);
        assert!(
            !was_in_flight,
            "concurrent fetches detected - single-flight failed"
        );

        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        sleep(self.delay).await;

        self.in_flight.store(false, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// A primary store that fails every operation.
struct FailingStore;

#[async_trait]
impl ByteStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, SourceError> {
        Err(SourceError::Store("primary store offline".to_string()))
    }

    async fn put(&self, _key: &str, _data: &[u8], _ttl: Duration) -> Result<(), SourceError> {
        Err(SourceError::Store("primary store offline".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), SourceError> {
        Err(SourceError::Store("primary store offline".to_string()))
    }
}

// =============================================================================
// Single-Flight
// =============================================================================

#[tokio::test]
async fn test_concurrent_fetches_invoke_loader_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = SlowCountingSource::new(b"pixels".to_vec(), Duration::from_millis(50));
    let counter = Arc::clone(&source.fetch_count);

    let cache = Arc::new(SourceCache::new(MemoryStore::new(), dir.path()));
    let cached = Arc::new(CachedSource::new(source, cache));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let cached = Arc::clone(&cached);
        handles.push(tokio::spawn(async move { cached.fetch("demo.jpg").await }));
    }

    for handle in handles {
        let data = handle.await.unwrap().unwrap();
        assert_eq!(data, Bytes::from("pixels"));
    }

    // All five callers were served by one upstream fetch.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_fetch_hits_cache() {
    let dir = tempfile::tempdir().unwrap();
    let source = SlowCountingSource::new(b"pixels".to_vec(), Duration::from_millis(1));
    let counter = Arc::clone(&source.fetch_count);

    let cache = Arc::new(SourceCache::new(MemoryStore::new(), dir.path()));
    let cached = CachedSource::new(source, cache);

    cached.fetch("demo.jpg").await.unwrap();
    cached.fetch("demo.jpg").await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Repair and Degradation
// =============================================================================

#[tokio::test]
async fn test_dangling_sentinel_is_repaired_end_to_end() {
    let dir = tempfile::tempdir().unwrap();

    // A sentinel exists but the primary store is empty.
    let key = SourceCache::<MemoryStore>::cache_key("demo.jpg");
    std::fs::write(dir.path().join(&key), b"").unwrap();

    let source = SlowCountingSource::new(b"pixels".to_vec(), Duration::from_millis(1));
    let counter = Arc::clone(&source.fetch_count);

    let cache = Arc::new(SourceCache::new(MemoryStore::new(), dir.path()));
    let cached = CachedSource::new(source, Arc::clone(&cache));

    // First fetch repairs and refills.
    assert_eq!(cached.fetch("demo.jpg").await.unwrap(), Bytes::from("pixels"));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(dir.path().join(&key).exists());

    // Both tiers agree now, so the next fetch is a hit.
    cached.fetch("demo.jpg").await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_primary_outage_degrades_to_always_load() {
    let dir = tempfile::tempdir().unwrap();
    let source = SlowCountingSource::new(b"pixels".to_vec(), Duration::from_millis(1));
    let counter = Arc::clone(&source.fetch_count);

    let cache = Arc::new(SourceCache::new(FailingStore, dir.path()));
    let cached = CachedSource::new(source, cache);

    // Every request falls through to the source, but all succeed.
    assert_eq!(cached.fetch("demo.jpg").await.unwrap(), Bytes::from("pixels"));
    assert_eq!(cached.fetch("demo.jpg").await.unwrap(), Bytes::from("pixels"));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Cache Under the HTTP Stack
// =============================================================================

#[tokio::test]
async fn test_router_over_cached_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new().with_image("demo.jpg", create_test_jpeg(400, 200));
    let counter = source.fetch_counter();

    let cache = Arc::new(SourceCache::new(MemoryStore::new(), dir.path()));
    let router = build_router(CachedSource::new(source, Arc::clone(&cache)));

    let response = router
        .clone()
        .oneshot(get_request("/iiif/v3/demo.jpg/full/max/0/default.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache.sentinel_count().await, 1);

    // The info path shares the cached bytes; no second upstream fetch.
    let response = router
        .oneshot(get_request("/iiif/v3/demo.jpg/info.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_status_reports_sentinel_count() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new().with_image("demo.jpg", create_test_jpeg(400, 200));

    let cache = Arc::new(SourceCache::new(MemoryStore::new(), dir.path()));
    let router = build_router_with(
        CachedSource::new(source, Arc::clone(&cache)),
        RouterConfig::new("v3").with_tracing(false),
        Some(cache.clone() as Arc<dyn CacheStats>),
    );

    // Before any fetch the cache is empty.
    let response = router.clone().oneshot(get_request("/status")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["sentinel_count"], 0);

    // One cached image, one sentinel.
    let response = router
        .clone()
        .oneshot(get_request("/iiif/v3/demo.jpg/full/max/0/default.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get_request("/status")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["sentinel_count"], 1);
}
