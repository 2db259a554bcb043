//! Test utilities for integration tests.
//!
//! Provides a mock image source with fetch counting, helpers for creating
//! test images, and a router builder wired like the production server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

use iiif_server::cache::CacheStats;
use iiif_server::error::SourceError;
use iiif_server::server::{create_router, AppState, RouterConfig};
use iiif_server::service::ImageService;
use iiif_server::source::ImageSource;

/// Pixel budget used by the test router.
pub const TEST_MAX_PIXELS: u64 = 10_000_000;

/// Advertised origin of the test router.
pub const TEST_BASE: &str = "http://localhost:3000";

// =============================================================================
// Mock Image Source
// =============================================================================

/// An in-memory image source that counts fetches.
pub struct MockImageSource {
    images: HashMap<String, Bytes>,
    fetch_count: Arc<AtomicUsize>,
}

impl MockImageSource {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_image(mut self, identifier: &str, data: Vec<u8>) -> Self {
        self.images.insert(identifier.to_string(), Bytes::from(data));
        self
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetch_count)
    }
}

#[async_trait]
impl ImageSource for MockImageSource {
    async fn fetch(&self, identifier: &str) -> Result<Bytes, SourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.images
            .get(identifier)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(identifier.to_string()))
    }
}

// =============================================================================
// Test Images
// =============================================================================

/// Create a JPEG with a horizontal/vertical gradient.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    encoder
        .encode_image(&DynamicImage::ImageRgb8(img))
        .unwrap();
    buf
}

/// Check for JPEG SOI/EOI markers.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() > 4
        && data[0] == 0xFF
        && data[1] == 0xD8
        && data[data.len() - 2] == 0xFF
        && data[data.len() - 1] == 0xD9
}

/// Decode a response body and return the image.
pub fn decode_image(data: &[u8]) -> DynamicImage {
    image::load_from_memory(data).expect("response body should decode as an image")
}

// =============================================================================
// Router Builder
// =============================================================================

/// Build a router around a source, configured like the production server
/// with version label `v3`.
pub fn build_router<S: ImageSource + 'static>(source: S) -> Router {
    build_router_with(source, RouterConfig::new("v3").with_tracing(false), None)
}

/// Build a router with a custom router configuration and an optional
/// source-cache handle for the stats endpoint.
pub fn build_router_with<S: ImageSource + 'static>(
    source: S,
    config: RouterConfig,
    cache: Option<Arc<dyn CacheStats>>,
) -> Router {
    let service = ImageService::new(source, TEST_MAX_PIXELS, 2);
    let mut state = AppState::new(service, TEST_BASE.to_string(), "v3".to_string());
    if let Some(cache) = cache {
        state = state.with_cache(cache);
    }
    create_router(state, config)
}

/// Build a GET request for the given URI.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: axum::response::Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}
