//! Remote object storage: upload of finished files and presigned reads.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("couldn't open {path} for upload: {message}")]
    Source { path: String, message: String },

    #[error("couldn't upload s3://{bucket}/{key}: {message}")]
    Remote {
        bucket: String,
        key: String,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum SignError {
    #[error("invalid presign expiry {ttl:?}: {message}")]
    InvalidExpiry { ttl: Duration, message: String },

    #[error("couldn't presign s3://{bucket}/{key}: {message}")]
    Presign {
        bucket: String,
        key: String,
        message: String,
    },
}

/// Object storage used by the ingestion pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `bucket/key`.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> Result<(), UploadError>;

    /// Presigned GET URL valid for `ttl`.
    async fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, SignError>;
}

/// [`ObjectStore`] backed by S3 or an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS provider chain.
    ///
    /// With a custom `endpoint` (MinIO, localstack, ...) path-style
    /// addressing is forced.
    pub async fn from_env(region: &str, endpoint: Option<&str>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        let client = match endpoint {
            Some(endpoint) => {
                let config = aws_sdk_s3::config::Builder::from(&shared)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(config)
            }
            None => Client::new(&shared),
        };

        info!(region, endpoint = ?endpoint, "S3 client initialized");
        Self::new(client)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        file: &Path,
        content_type: &str,
    ) -> Result<(), UploadError> {
        info!(bucket, key, "Uploading object to S3");

        let body = ByteStream::from_path(file)
            .await
            .map_err(|e| UploadError::Source {
                path: file.display().to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                error!(bucket, key, "S3 upload failed: {:?}", e);
                UploadError::Remote {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;

        Ok(())
    }

    async fn sign(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String, SignError> {
        if ttl.is_zero() {
            return Err(SignError::InvalidExpiry {
                ttl,
                message: "expiry must be in the future".to_string(),
            });
        }

        let presigning =
            PresigningConfig::expires_in(ttl).map_err(|e| SignError::InvalidExpiry {
                ttl,
                message: e.to_string(),
            })?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| SignError::Presign {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(request.uri().to_string())
    }
}
