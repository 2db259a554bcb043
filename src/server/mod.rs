//! HTTP server layer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /iiif/{version}/{identifier}/{region}/{size}/...          │
//! │                                                                 │
//! │  ┌──────────────┐              ┌───────────────────────────┐    │
//! │  │  handlers    │              │         routes            │    │
//! │  │ (requests &  │              │  (router, CORS, tracing)  │    │
//! │  │  error map)  │              │                           │    │
//! │  └──────────────┘              └───────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, home_handler, iiif_handler, status_handler, AppState, ErrorBody, ErrorDetail,
    HealthResponse, StatusResponse,
};
pub use routes::{create_router, RouterConfig};
