//! IIIF Image Server binary.
//!
//! Starts the HTTP server and wires the source, cache and eviction
//! components according to the configuration.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iiif_server::{
    cache::{CacheStats, CachedSource, Evictor, RedisStore, SourceCache},
    config::Config,
    server::{create_router, AppState, RouterConfig},
    service::ImageService,
    source::{create_s3_client, ImageSource, LocalImageSource, S3ImageSource},
};

#[tokio::main]
async fn main() {
    // Parse configuration from CLI and environment
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Starting IIIF server");
    info!("  IIIF version label: {}", config.version);
    info!("  Max pixels: {}", config.max_pixels);
    info!("  Pixel workers: {}", config.worker_count());
    if config.read_object_store {
        info!("  Source: object store bucket {}", config.s3_bucket);
        if let Some(ref endpoint) = config.s3_endpoint {
            info!("  Object store endpoint: {}", endpoint);
        }
        info!("  Sentinel dir: {}", config.cache_dir);
        info!("  Cache budget (advisory): {} bytes", config.cache_max_size);
    } else {
        info!("  Source: local directory {}", config.image_dir);
    }
    if config.enable_https {
        // TLS termination happens at the fronting layer; the cert paths are
        // validated so misconfiguration still fails fast.
        warn!("HTTPS is enabled in config; terminate TLS at the fronting proxy");
    }

    // Ensure the working directories exist
    if let Err(e) = ensure_directories(&config) {
        error!("Failed to create directories: {}", e);
        std::process::exit(1);
    }

    if config.read_object_store {
        // Object-store mode: S3 source behind the two-tier cache
        let client = create_s3_client(
            config.s3_endpoint.as_deref(),
            config.s3_use_ssl,
            config.s3_access_key.as_deref(),
            config.s3_secret_key.as_deref(),
        )
        .await;
        let source = S3ImageSource::new(client, config.s3_bucket.clone());

        if let Err(e) = source.probe().await {
            error!("Object store probe failed: {}", e);
            std::process::exit(1);
        }
        info!("Object store connection OK");

        let store = match RedisStore::connect(&config.redis_url()).await {
            Ok(store) => store,
            Err(e) => {
                error!("Redis connection failed: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = store.ping().await {
            error!("Redis ping failed: {}", e);
            std::process::exit(1);
        }
        info!("Redis connection OK");

        let cache = Arc::new(SourceCache::new(store, &config.cache_dir));
        Evictor::new(cache.clone()).spawn();

        let stats: Arc<dyn CacheStats> = cache.clone();
        let source = CachedSource::new(source, cache);
        serve(source, Some(stats), &config).await;
    } else {
        // Local mode: read straight from disk, no cache tiers
        let source = LocalImageSource::new(&config.image_dir);
        serve(source, None, &config).await;
    }
}

/// Build the service and router around a source, then serve.
async fn serve<S: ImageSource + 'static>(
    source: S,
    cache: Option<Arc<dyn CacheStats>>,
    config: &Config,
) {
    let service = ImageService::new(source, config.max_pixels, config.worker_count());
    let mut state = AppState::new(service, config.public_base(), config.version.clone());
    if let Some(cache) = cache {
        state = state.with_cache(cache);
    }
    let router = create_router(state, RouterConfig::from_config(config));

    let addr = config.bind_address();
    info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iiif_server=debug,tower_http=debug"
    } else {
        "iiif_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Create the image and sentinel directories if they are missing.
fn ensure_directories(config: &Config) -> std::io::Result<()> {
    if !config.read_object_store {
        std::fs::create_dir_all(&config.image_dir)?;
    } else {
        std::fs::create_dir_all(&config.cache_dir)?;
    }
    Ok(())
}
