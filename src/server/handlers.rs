//! HTTP request handlers for the IIIF API.
//!
//! # Endpoints
//!
//! - `GET /iiif/{version}/{identifier}/info.json` - Info descriptor
//! - `GET /iiif/{version}/{identifier}/{region}/{size}/{rotation}/{quality}.{format}` - Transformed image
//! - `GET /health` - Health check
//! - `GET /status` - Runtime stats
//! - `GET /` - Landing page

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{OriginalUri, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::cache::CacheStats;
use crate::error::IiifError;
use crate::iiif::info::{ImageInfo, CONTEXT};
use crate::iiif::params::{parse_path, IiifRequest};
use crate::service::ImageService;
use crate::source::ImageSource;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to handlers via Axum's State extractor.
pub struct AppState<S: ImageSource> {
    /// The image service producing derivatives and descriptors
    pub service: Arc<ImageService<S>>,

    /// Advertised server origin (`scheme://host:port`), used in info ids
    pub public_base: String,

    /// Configured URL-prefix label
    pub version: String,

    /// Process start, for uptime reporting
    pub started: Instant,

    /// RFC 3339 start timestamp
    pub started_at: String,

    /// Source cache handle for occupancy stats; None in local mode
    pub cache: Option<Arc<dyn CacheStats>>,
}

impl<S: ImageSource> AppState<S> {
    /// Create the application state around an image service.
    pub fn new(service: ImageService<S>, public_base: String, version: String) -> Self {
        Self {
            service: Arc::new(service),
            public_base,
            version,
            started: Instant::now(),
            started_at: chrono::Utc::now().to_rfc3339(),
            cache: None,
        }
    }

    /// Attach the source cache so `/status` can report its occupancy.
    pub fn with_cache(mut self, cache: Arc<dyn CacheStats>) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl<S: ImageSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            public_base: self.public_base.clone(),
            version: self.version.clone(),
            started: self.started,
            started_at: self.started_at.clone(),
            cache: self.cache.clone(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,

    /// Current server time, RFC 3339
    pub time: String,
}

/// Runtime stats response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,

    /// Server build version
    pub version: String,

    /// Configured IIIF URL-prefix label
    pub iiif_version: String,

    pub started_at: String,

    pub uptime_seconds: u64,

    /// Pixel workers currently idle
    pub idle_workers: usize,

    pub max_pixels: u64,

    /// Sentinel files on disk; absent when the source cache is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentinel_count: Option<usize>,
}

/// IIIF JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "@context")]
    pub context: &'static str,

    #[serde(rename = "type")]
    pub kind: &'static str,

    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: &'static str, message: String) -> Self {
        Self {
            context: CONTEXT,
            kind: "error",
            error: ErrorDetail { code, message },
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert IiifError to an HTTP response.
///
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
/// - 404s are logged at DEBUG level (common and expected)
impl IntoResponse for IiifError {
    fn into_response(self) -> Response {
        let status = match &self {
            IiifError::NotFound(_) => StatusCode::NOT_FOUND,
            IiifError::Upstream(_) | IiifError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            error!(code, status = status.as_u16(), "server error: {}", message);
        } else if status == StatusCode::NOT_FOUND {
            debug!(code, status = status.as_u16(), "not found: {}", message);
        } else {
            warn!(code, status = status.as_u16(), "client error: {}", message);
        }

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle IIIF requests under `/iiif/{version}/`.
///
/// The raw (still percent-encoded) path is taken from the request URI so
/// that canonicalisation and decoding happen exactly once, in the parser.
///
/// # Response
///
/// - `200 OK`: `info.json` document or transformed image
/// - `400 Bad Request`: grammar or geometry rejection
/// - `404 Not Found`: identifier missing in the source
/// - `500 Internal Server Error`: upstream or processing failure
pub async fn iiif_handler<S: ImageSource>(
    State(state): State<AppState<S>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, IiifError> {
    let prefix = format!("/iiif/{}/", state.version);
    let raw = uri.path().strip_prefix(&prefix).ok_or_else(|| {
        IiifError::InvalidRequest(format!("request outside the {} prefix", prefix))
    })?;

    match parse_path(raw)? {
        IiifRequest::Info { identifier } => {
            let (width, height) = state.service.describe(&identifier).await?;
            let info = ImageInfo::new(
                &state.public_base,
                &state.version,
                &identifier,
                width,
                height,
            );
            Ok(Json(info).into_response())
        }
        IiifRequest::Image(request) => {
            let rendered = state.service.render(request).await?;
            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, rendered.media_type)
                .body(axum::body::Body::from(rendered.data))
                .map_err(|e| IiifError::Internal(format!("response build failed: {}", e)))?;
            Ok(response)
        }
    }
}

/// Handle health check requests.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "success".to_string(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

/// Handle runtime stats requests.
pub async fn status_handler<S: ImageSource>(
    State(state): State<AppState<S>>,
) -> Json<StatusResponse> {
    let sentinel_count = match &state.cache {
        Some(cache) => Some(cache.sentinel_count().await),
        None => None,
    };

    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        iiif_version: state.version.clone(),
        started_at: state.started_at.clone(),
        uptime_seconds: state.started.elapsed().as_secs(),
        idle_workers: state.service.idle_workers(),
        max_pixels: state.service.max_pixels(),
        sentinel_count,
    })
}

/// Serve the HTML landing page.
pub async fn home_handler<S: ImageSource>(State(state): State<AppState<S>>) -> Html<String> {
    Html(landing_page(&state.public_base, &state.version))
}

fn landing_page(base: &str, version: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>IIIF Image Server</title>
  <style>
    body {{ font-family: sans-serif; max-width: 48rem; margin: 2rem auto; color: #333; }}
    code {{ background: #f5f5f5; padding: 2px 6px; border-radius: 3px; }}
    li {{ margin: 0.5rem 0; }}
  </style>
</head>
<body>
  <h1>IIIF Image Server <small>({version})</small></h1>
  <p>This server implements the
     <a href="https://iiif.io/api/image/3.0/">IIIF Image API 3.0</a>.</p>
  <ul>
    <li><code>GET /iiif/{version}/{{identifier}}/info.json</code> &mdash; image metadata</li>
    <li><code>GET /iiif/{version}/{{identifier}}/{{region}}/{{size}}/{{rotation}}/{{quality}}.{{format}}</code> &mdash; derived image</li>
    <li><code>GET /health</code> &mdash; health check</li>
    <li><code>GET /status</code> &mdash; runtime stats</li>
  </ul>
  <p>Example: <code>{base}/iiif/{version}/sample.jpg/full/^300,300/0/default.jpg</code></p>
</body>
</html>
"#
    )
}

// =============================================================================
// Tests
// =============================================================================
