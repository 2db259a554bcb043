//! Image source abstraction.
//!
//! A source resolves an identifier to the raw encoded bytes of an image. No
//! transformation happens at this layer.
//!
//! Two backends are provided:
//!
//! - [`LocalImageSource`] reads `<imageDir>/<identifier>` from disk.
//! - [`S3ImageSource`] streams objects from S3-compatible storage.
//!
//! The cache layer wraps a source through the same trait
//! ([`crate::cache::CachedSource`]), so the service is agnostic to both the
//! backend and the caching policy.

mod local;
mod s3;

pub use local::LocalImageSource;
pub use s3::{create_s3_client, S3ImageSource, FETCH_TIMEOUT, PROBE_TIMEOUT};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

/// Trait for resolving identifiers to encoded image bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch the encoded source bytes for an identifier.
    ///
    /// A missing object maps to [`SourceError::NotFound`]; any other
    /// failure to [`SourceError::Store`] or [`SourceError::Connection`].
    async fn fetch(&self, identifier: &str) -> Result<Bytes, SourceError>;
}
