//! Router configuration for the IIIF server.
//!
//! This module defines the HTTP routes and applies the CORS and tracing
//! middleware.
//!
//! # Route Structure
//!
//! ```text
//! /                                  - Landing page
//! /health                            - Health check
//! /status                            - Runtime stats
//! /iiif/{version}/{*path}            - IIIF info and image requests
//! ```
//!
//! # Example
//!
//! ```ignore
//! use iiif_server::server::{create_router, AppState, RouterConfig};
//! use iiif_server::service::ImageService;
//! use iiif_server::source::LocalImageSource;
//!
//! let service = ImageService::new(LocalImageSource::new("./images"), 10_000_000, 4);
//! let state = AppState::new(service, "http://localhost:3000".into(), "v3".into());
//! let router = create_router(state, RouterConfig::new("v3"));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{routing::get, Router};
use http::header::{HeaderName, HeaderValue, ACCEPT, ACCESS_CONTROL_REQUEST_METHOD, CONTENT_TYPE};
use http::{Method, StatusCode};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::source::ImageSource;

use super::handlers::{health_handler, home_handler, iiif_handler, status_handler, AppState};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// URL-prefix label used in the IIIF route
    pub version: String,

    /// Allowed CORS origins (None or a "*" entry = allow any origin)
    pub cors_allow_origins: Option<Vec<String>>,

    /// Allowed CORS methods (None = GET, OPTIONS)
    pub cors_allow_methods: Option<Vec<String>>,

    /// Allowed CORS request headers (None = Accept, Content-Type)
    pub cors_allow_headers: Option<Vec<String>>,

    /// Allow credentialed requests; only honored with explicit origins
    pub cors_allow_credentials: bool,

    /// CORS preflight max-age in seconds
    pub cors_max_age: u64,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration with permissive CORS defaults.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            cors_allow_origins: None,
            cors_allow_methods: None,
            cors_allow_headers: None,
            cors_allow_credentials: false,
            cors_max_age: crate::config::DEFAULT_CORS_MAX_AGE,
            enable_tracing: true,
        }
    }

    /// Build the router configuration from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            version: config.version.clone(),
            cors_allow_origins: config.cors_allow_origins.clone(),
            cors_allow_methods: config.cors_allow_methods.clone(),
            cors_allow_headers: config.cors_allow_headers.clone(),
            cors_allow_credentials: config.cors_allow_credentials,
            cors_max_age: config.cors_max_age,
            enable_tracing: !config.no_tracing,
        }
    }

    /// Set specific allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_allow_origins = Some(origins);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
pub fn create_router<S>(state: AppState<S>, config: RouterConfig) -> Router
where
    S: ImageSource + 'static,
{
    let cors = build_cors_layer(&config);

    let iiif_path = format!("/iiif/{}/{{*path}}", config.version);

    let router = Router::new()
        .route("/", get(home_handler::<S>))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler::<S>))
        .route(&iiif_path, get(iiif_handler::<S>))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(preflight_status));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Rewrite successful CORS preflight responses to 204 No Content.
///
/// The CORS layer answers preflights with 200 and an empty body; this
/// middleware sits outside it and adjusts the status.
async fn preflight_status(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS
        && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = next.run(request).await;
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let methods: Vec<Method> = match &config.cors_allow_methods {
        Some(list) => list.iter().filter_map(|m| m.parse().ok()).collect(),
        None => vec![Method::GET, Method::OPTIONS],
    };

    let headers: Vec<HeaderName> = match &config.cors_allow_headers {
        Some(list) => list.iter().filter_map(|h| h.parse().ok()).collect(),
        None => vec![ACCEPT, CONTENT_TYPE],
    };

    let cors = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(config.cors_max_age));

    match &config.cors_allow_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.iter().any(|o| o == "*") => cors.allow_origin(Any),
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            let cors = cors.allow_origin(parsed);
            // A wildcard origin cannot be credentialed, so the flag is only
            // honored here.
            if config.cors_allow_credentials {
                cors.allow_credentials(true)
            } else {
                cors
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
