//! Local filesystem image source.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

use super::ImageSource;

/// Image source reading from a directory on the local filesystem.
///
/// The identifier is joined onto the configured root. Identifiers arrive
/// here already canonicalised by the request parser, so they cannot climb
/// out of the root.
pub struct LocalImageSource {
    root: PathBuf,
}

impl LocalImageSource {
    /// Create a source rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the configured root directory.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl ImageSource for LocalImageSource {
    async fn fetch(&self, identifier: &str) -> Result<Bytes, SourceError> {
        let path = self.root.join(identifier);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(identifier.to_string()))
            }
            Err(e) => Err(SourceError::Store(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
