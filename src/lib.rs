//! IIIF Image Server - on-demand image derivation per the Image API 3.0.
//!
//! This library provides the core functionality for serving IIIF image
//! derivatives and `info.json` descriptors from local files or object
//! storage, with a two-tier source-byte cache in front of the store.

pub mod cache;
pub mod config;
pub mod error;
pub mod iiif;
pub mod pipeline;
pub mod server;
pub mod service;
pub mod source;

// Re-export commonly used types
pub use cache::{
    ByteStore, CacheStats, CachedSource, Evictor, MemoryStore, RedisStore, SourceCache, CACHE_TTL,
    DEFAULT_SWEEP_BATCH, SWEEP_INTERVAL,
};
pub use config::Config;
pub use error::{IiifError, SourceError};
pub use iiif::{
    parse_path, Format, IiifRequest, ImageInfo, ImageRequest, Quality, RegionSpec, RotationSpec,
    SizeSpec,
};
pub use server::{
    create_router, AppState, ErrorBody, HealthResponse, RouterConfig, StatusResponse,
};
pub use service::{ImageService, RenderedImage};
pub use source::{create_s3_client, ImageSource, LocalImageSource, S3ImageSource};
