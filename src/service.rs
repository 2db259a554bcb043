//! Image service orchestrating fetch, decode, transform and encode.
//!
//! The service is the entry point used by the HTTP handlers. It is generic
//! over the [`ImageSource`], so the same code path serves local files,
//! plain object-store fetches, and cache-fronted fetches
//! ([`crate::cache::CachedSource`]).
//!
//! Pixel work is CPU-bound and runs on the blocking pool, bounded by a
//! semaphore sized from the configured concurrency.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::IiifError;
use crate::iiif::params::ImageRequest;
use crate::pipeline;
use crate::source::ImageSource;

/// A transformed image ready for the HTTP response.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// The encoded output bytes
    pub data: Bytes,

    /// Content-Type of the output
    pub media_type: &'static str,
}

/// Service producing transformed images and info descriptors.
pub struct ImageService<S: ImageSource> {
    source: S,
    max_pixels: u64,
    workers: Arc<Semaphore>,
}

impl<S: ImageSource> ImageService<S> {
    /// Create a service over the given source.
    ///
    /// `workers` bounds the number of concurrently executing pixel
    /// pipelines.
    pub fn new(source: S, max_pixels: u64, workers: usize) -> Self {
        Self {
            source,
            max_pixels,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Fetch, transform and encode an image request.
    pub async fn render(&self, request: ImageRequest) -> Result<RenderedImage, IiifError> {
        let data = self.source.fetch(&request.identifier).await?;
        debug!(identifier = %request.identifier, bytes = data.len(), "source fetched");

        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| IiifError::Internal(format!("worker pool closed: {}", e)))?;

        let max_pixels = self.max_pixels;
        let media_type = request.format.media_type();
        let output = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline::render(&data, &request, max_pixels)
        })
        .await
        .map_err(|e| IiifError::Internal(format!("pixel worker panicked: {}", e)))??;

        Ok(RenderedImage {
            data: output,
            media_type,
        })
    }

    /// Fetch an image and report its dimensions, for the info path.
    ///
    /// Shares the source (and therefore cache) lookup with the image path
    /// but skips the transformation pipeline.
    pub async fn describe(&self, identifier: &str) -> Result<(u32, u32), IiifError> {
        let data = self.source.fetch(identifier).await?;
        pipeline::dimensions(&data)
    }

    /// Number of currently idle pixel workers.
    pub fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }

    /// The configured output pixel budget.
    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }
}
