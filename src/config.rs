//! Configuration management for the IIIF server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `IIIF_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use iiif_server::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//!
//! println!("Listening on {}", config.bind_address());
//! println!("Image root: {}", config.image_dir);
//! ```
//!
//! # Environment Variables
//!
//! All configuration options can be set via environment variables with the
//! `IIIF_` prefix:
//!
//! - `IIIF_HOST` - Server bind address (default: 0.0.0.0)
//! - `IIIF_PORT` - Server port (default: 3000)
//! - `IIIF_IMAGE_DIR` - Filesystem root for local mode (default: ./images)
//! - `IIIF_CACHE_DIR` - Sentinel-file directory (default: ./cache)
//! - `IIIF_MAX_PIXELS` - Output pixel budget (default: 10000000)
//! - `IIIF_READ_OBJECT_STORE` - Serve from the object store instead of disk
//! - `IIIF_S3_BUCKET` / `IIIF_S3_ENDPOINT` / `IIIF_S3_ACCESS_KEY` /
//!   `IIIF_S3_SECRET_KEY` / `IIIF_S3_USE_SSL` - Object store settings
//! - `IIIF_REDIS_HOST` / `IIIF_REDIS_PORT` / `IIIF_REDIS_PASSWORD` /
//!   `IIIF_REDIS_DB` / `IIIF_REDIS_USE_TLS` - Primary cache settings
//! - `IIIF_VERSION` - URL prefix label (default: v3)

use clap::Parser;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default filesystem root for local mode.
pub const DEFAULT_IMAGE_DIR: &str = "./images";

/// Default sentinel-file directory.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default upper bound on `width * height` for any output stage.
pub const DEFAULT_MAX_PIXELS: u64 = 10_000_000;

/// Default advisory byte budget for the cache (1 GiB). Not enforced; the
/// primary store's TTL and the sentinel sweep bound growth in practice.
pub const DEFAULT_CACHE_MAX_SIZE: u64 = 1024 * 1024 * 1024;

/// Default URL-prefix label.
pub const DEFAULT_VERSION: &str = "v3";

/// Default CORS preflight max-age in seconds (24 hours).
pub const DEFAULT_CORS_MAX_AGE: u64 = 86_400;

// =============================================================================
// CLI Arguments
// =============================================================================

/// IIIF Image Server - on-demand image derivation per the Image API 3.0.
///
/// Serves transformed images and `info.json` descriptors from a local
/// directory or an S3-compatible object store, fronted by a two-tier
/// source cache (remote byte store plus local sentinel files).
#[derive(Parser, Debug, Clone)]
#[command(name = "iiif-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IIIF_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IIIF_PORT")]
    pub port: u16,

    /// URL-prefix label, matched in `/iiif/<version>/...` routes.
    #[arg(long, default_value = DEFAULT_VERSION, env = "IIIF_VERSION")]
    pub version: String,

    /// Enable HTTPS. TLS itself is terminated by the fronting layer; when
    /// set, the certificate paths are validated and advertised URLs use
    /// the https scheme.
    #[arg(long, default_value_t = false, env = "IIIF_ENABLE_HTTPS")]
    pub enable_https: bool,

    /// Path to the TLS certificate (required when --enable-https is set).
    #[arg(long, env = "IIIF_CERT_FILE")]
    pub cert_file: Option<String>,

    /// Path to the TLS private key (required when --enable-https is set).
    #[arg(long, env = "IIIF_KEY_FILE")]
    pub key_file: Option<String>,

    // =========================================================================
    // Image Source Configuration
    // =========================================================================
    /// Filesystem root for local mode.
    #[arg(long, default_value = DEFAULT_IMAGE_DIR, env = "IIIF_IMAGE_DIR")]
    pub image_dir: String,

    /// Read source images from the object store instead of the local
    /// filesystem.
    #[arg(long, default_value_t = false, env = "IIIF_READ_OBJECT_STORE")]
    pub read_object_store: bool,

    /// Object store bucket containing the source images (required in
    /// object-store mode).
    #[arg(long, default_value = "", env = "IIIF_S3_BUCKET")]
    pub s3_bucket: String,

    /// Custom endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "IIIF_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Static access key for the object store. Falls back to the ambient
    /// credential chain when unset.
    #[arg(long, env = "IIIF_S3_ACCESS_KEY")]
    pub s3_access_key: Option<String>,

    /// Static secret key for the object store.
    #[arg(long, env = "IIIF_S3_SECRET_KEY")]
    pub s3_secret_key: Option<String>,

    /// Use TLS when talking to the object store endpoint.
    #[arg(long, default_value_t = false, env = "IIIF_S3_USE_SSL")]
    pub s3_use_ssl: bool,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Directory holding the sentinel files of the source cache.
    #[arg(long, default_value = DEFAULT_CACHE_DIR, env = "IIIF_CACHE_DIR")]
    pub cache_dir: String,

    /// Advisory byte budget for cached source images. Logged at startup,
    /// not enforced.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_SIZE, env = "IIIF_CACHE_MAX_SIZE")]
    pub cache_max_size: u64,

    /// Redis host for the primary byte cache.
    #[arg(long, default_value = "127.0.0.1", env = "IIIF_REDIS_HOST")]
    pub redis_host: String,

    /// Redis port.
    #[arg(long, default_value_t = 6379, env = "IIIF_REDIS_PORT")]
    pub redis_port: u16,

    /// Redis password, if the server requires one.
    #[arg(long, env = "IIIF_REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    /// Redis logical database index.
    #[arg(long, default_value_t = 0, env = "IIIF_REDIS_DB")]
    pub redis_db: i64,

    /// Connect to Redis over TLS.
    #[arg(long, default_value_t = false, env = "IIIF_REDIS_USE_TLS")]
    pub redis_use_tls: bool,

    // =========================================================================
    // Processing Configuration
    // =========================================================================
    /// Upper bound on `width * height` for any output stage.
    #[arg(long, default_value_t = DEFAULT_MAX_PIXELS, env = "IIIF_MAX_PIXELS")]
    pub max_pixels: u64,

    /// Worker-pool size for pixel work. 0 means one worker per available
    /// core.
    #[arg(long, default_value_t = 0, env = "IIIF_CONCURRENCY")]
    pub concurrency: usize,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated). If not specified, allows any
    /// origin.
    #[arg(long, env = "IIIF_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_allow_origins: Option<Vec<String>>,

    /// Allowed CORS methods (comma-separated, default: GET,OPTIONS).
    #[arg(long, env = "IIIF_CORS_METHODS", value_delimiter = ',')]
    pub cors_allow_methods: Option<Vec<String>>,

    /// Allowed CORS request headers (comma-separated, default:
    /// Accept,Content-Type).
    #[arg(long, env = "IIIF_CORS_HEADERS", value_delimiter = ',')]
    pub cors_allow_headers: Option<Vec<String>>,

    /// Allow credentialed cross-origin requests. Only honored when explicit
    /// origins are configured.
    #[arg(long, default_value_t = false, env = "IIIF_CORS_CREDENTIALS")]
    pub cors_allow_credentials: bool,

    /// CORS preflight max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CORS_MAX_AGE, env = "IIIF_CORS_MAX_AGE")]
    pub cors_max_age: u64,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pixels == 0 {
            return Err("max_pixels must be greater than 0".to_string());
        }

        if self.enable_https && (self.cert_file.is_none() || self.key_file.is_none()) {
            return Err(
                "HTTPS is enabled but cert/key files are missing. \
                 Set --cert-file and --key-file, or disable with --enable-https=false"
                    .to_string(),
            );
        }

        if self.read_object_store && self.s3_bucket.is_empty() {
            return Err(
                "Object-store mode requires a bucket. Set --s3-bucket or IIIF_S3_BUCKET"
                    .to_string(),
            );
        }

        if self.version.is_empty() || self.version.contains('/') {
            return Err("version must be a non-empty path segment".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL advertised in `info.json` ids.
    pub fn public_base(&self) -> String {
        let scheme = if self.enable_https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Redis connection URL built from the individual settings.
    pub fn redis_url(&self) -> String {
        let scheme = if self.redis_use_tls { "rediss" } else { "redis" };
        match &self.redis_password {
            Some(password) if !password.is_empty() => format!(
                "{}://:{}@{}:{}/{}",
                scheme, password, self.redis_host, self.redis_port, self.redis_db
            ),
            _ => format!(
                "{}://{}:{}/{}",
                scheme, self.redis_host, self.redis_port, self.redis_db
            ),
        }
    }

    /// Effective worker-pool size for pixel work.
    pub fn worker_count(&self) -> usize {
        if self.concurrency > 0 {
            self.concurrency
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
