//! S3-backed image source.
//!
//! Streams whole objects from S3 or S3-compatible storage (MinIO, GCS
//! interop, etc.). The object key is the IIIF identifier. Fetches carry a
//! 30-second deadline; the startup connectivity probe a 5-second one.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::time::timeout;

use crate::error::SourceError;

use super::ImageSource;

/// Deadline for a single object fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for the startup connectivity probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Region used when none is configured; S3-compatible endpoints ignore it.
const DEFAULT_REGION: &str = "us-east-1";

/// S3-backed implementation of [`ImageSource`].
///
/// # Example
///
/// ```ignore
/// use iiif_server::source::{create_s3_client, S3ImageSource};
///
/// let client = create_s3_client(Some("localhost:9000"), false, None, None).await;
/// let source = S3ImageSource::new(client, "images".to_string());
/// let bytes = source.fetch("folder/demo.jpg").await?;
/// ```
#[derive(Clone)]
pub struct S3ImageSource {
    client: Client,
    bucket: String,
}

impl S3ImageSource {
    /// Create a new source for the given bucket.
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Check that the bucket is reachable.
    ///
    /// Called once at startup; failure aborts the server rather than
    /// surfacing on the first request.
    pub async fn probe(&self) -> Result<(), SourceError> {
        let head = self.client.head_bucket().bucket(&self.bucket).send();
        match timeout(PROBE_TIMEOUT, head).await {
            Err(_) => Err(SourceError::Connection(format!(
                "object store probe timed out after {}s",
                PROBE_TIMEOUT.as_secs()
            ))),
            Ok(Err(e)) => Err(SourceError::Connection(format!(
                "object store unreachable: {}",
                e
            ))),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

#[async_trait]
impl ImageSource for S3ImageSource {
    async fn fetch(&self, identifier: &str) -> Result<Bytes, SourceError> {
        let send = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(identifier)
            .send();

        let response = match timeout(FETCH_TIMEOUT, send).await {
            Err(_) => {
                return Err(SourceError::Connection(format!(
                    "fetch of {} timed out after {}s",
                    identifier,
                    FETCH_TIMEOUT.as_secs()
                )))
            }
            Ok(Err(e)) => return Err(map_get_error(e, identifier)),
            Ok(Ok(response)) => response,
        };

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?
            .into_bytes();

        Ok(data)
    }
}

/// Map an S3 GetObject error, distinguishing a missing key from other
/// failures.
fn map_get_error(e: SdkError<GetObjectError>, identifier: &str) -> SourceError {
    if e.as_service_error()
        .map(|se| se.is_no_such_key())
        .unwrap_or(false)
    {
        return SourceError::NotFound(identifier.to_string());
    }

    // Some S3-compatible services report a bare 404 instead of NoSuchKey.
    let status_is_404 = e
        .raw_response()
        .map(|r| r.status().as_u16() == 404)
        .unwrap_or(false);
    if status_is_404 {
        return SourceError::NotFound(identifier.to_string());
    }

    let err_str = e.to_string();
    if err_str.contains("NoSuchKey") || err_str.contains("NotFound") || err_str.contains("404") {
        return SourceError::NotFound(identifier.to_string());
    }

    SourceError::Store(err_str)
}

/// Create an S3 client for the configured endpoint and credentials.
///
/// A custom endpoint selects path-style addressing, which MinIO and friends
/// expect. `use_ssl` picks the scheme when the endpoint does not carry one.
/// When no static credentials are given, the ambient AWS credential chain
/// applies.
pub async fn create_s3_client(
    endpoint: Option<&str>,
    use_ssl: bool,
    access_key: Option<&str>,
    secret_key: Option<&str>,
) -> Client {
    let region = aws_config::Region::new(DEFAULT_REGION.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint {
        config_loader = config_loader.endpoint_url(normalize_endpoint(endpoint, use_ssl));
    }

    if let (Some(access_key), Some(secret_key)) = (access_key, secret_key) {
        let credentials =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "static");
        config_loader = config_loader.credentials_provider(credentials);
    }

    let sdk_config = config_loader.load().await;

    let s3_config = if endpoint.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}

/// Prefix the endpoint with a scheme when it has none.
fn normalize_endpoint(endpoint: &str, use_ssl: bool) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    let scheme = if use_ssl { "https" } else { "http" };
    format!("{}://{}", scheme, endpoint)
}
