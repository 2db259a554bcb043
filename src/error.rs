use thiserror::Error;

/// I/O errors that can occur when fetching source images or talking to the
/// cache stores.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Identifier does not resolve to an object
    #[error("image not found: {0}")]
    NotFound(String),

    /// Error from the object store or the primary byte cache
    #[error("store error: {0}")]
    Store(String),

    /// Network or connection error, including deadline expiry
    #[error("connection error: {0}")]
    Connection(String),
}

/// Request-level errors of the IIIF Image API surface.
///
/// Each variant carries enough context for the error body. The IIIF error
/// code lives here (`code()`); the HTTP status mapping lives in the server
/// layer next to the response builder.
#[derive(Debug, Error)]
pub enum IiifError {
    /// Canonicalisation changed the request path
    #[error("path is not in canonical form")]
    InvalidPath,

    /// Percent-decoding the request path failed
    #[error("URL decoding failed")]
    InvalidEncoding,

    /// The path does not match the IIIF 3.0 grammar
    #[error("{0}")]
    InvalidRequest(String),

    /// Resolved region bounds fall outside the image
    #[error("region out of bounds: x={x}, y={y}, w={w}, h={h} (image is {width}x{height})")]
    InvalidRegion {
        x: i64,
        y: i64,
        w: i64,
        h: i64,
        width: u32,
        height: u32,
    },

    /// Computed output dimensions are zero or the size spec is ill-formed
    #[error("computed size is invalid: {0}")]
    SizeInvalid(String),

    /// Output pixel count exceeds the configured limit
    #[error("requested size {width}x{height} exceeds the {max_pixels} pixel limit")]
    SizeTooLarge {
        width: u64,
        height: u64,
        max_pixels: u64,
    },

    /// Rotation angle is not one of 0, 90, 180, 270
    #[error("unsupported rotation angle {angle}: only 0, 90, 180 and 270 are supported")]
    RotationUnsupported { angle: u32 },

    /// Identifier missing in the image source
    #[error("image not found: {0}")]
    NotFound(String),

    /// Object store or primary cache failure
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Decode, encode or other internal failure
    #[error("{0}")]
    Internal(String),
}

impl IiifError {
    /// The IIIF error code carried in the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            IiifError::InvalidPath => "InvalidPath",
            IiifError::InvalidEncoding => "InvalidEncoding",
            IiifError::InvalidRequest(_) => "InvalidRequest",
            IiifError::InvalidRegion { .. } => "InvalidRegion",
            IiifError::SizeInvalid(_) => "SizeInvalid",
            IiifError::SizeTooLarge { .. } => "SizeTooLarge",
            IiifError::RotationUnsupported { .. } => "RotationUnsupported",
            IiifError::NotFound(_) => "NotFound",
            IiifError::Upstream(_) => "UpstreamError",
            IiifError::Internal(_) => "InternalServerError",
        }
    }
}

impl From<SourceError> for IiifError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(id) => IiifError::NotFound(id),
            SourceError::Store(msg) => IiifError::Upstream(msg),
            SourceError::Connection(msg) => IiifError::Upstream(msg),
        }
    }
}
