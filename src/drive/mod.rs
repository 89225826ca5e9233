//! Object storage for chat attachments.
//!
//! Attachments are uploaded straight to the bucket by the client; the server
//! only records their keys. Presigned download URLs are produced when a message
//! is handed to the workflow engine.

use async_trait::async_trait;

#[cfg(feature = "drive")]
use crate::core::config::DriveConfig;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File storage is not configured")]
    NotConfigured,
    #[error("Failed to presign {path}: {message}")]
    Presign { path: String, message: String },
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn presigned_download_url(&self, path: &str) -> Result<String, StorageError>;
}

/// Used when no bucket is configured; every presign fails.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredStorage;

#[async_trait]
impl FileStorage for UnconfiguredStorage {
    async fn presigned_download_url(&self, _path: &str) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }
}

#[cfg(feature = "drive")]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    ttl: std::time::Duration,
}

#[cfg(feature = "drive")]
impl S3Storage {
    pub async fn from_config(config: &DriveConfig) -> Self {
        use aws_config::BehaviorVersion;
        use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials};

        let endpoint = if config.server.ends_with('/') {
            config.server.clone()
        } else {
            format!("{}/", config.server)
        };
        let base_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(aws_config::Region::new(config.region.clone()))
            .credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .load()
            .await;
        let s3_config = S3ConfigBuilder::from(&base_config)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            ttl: std::time::Duration::from_secs(config.presign_ttl_secs),
        }
    }
}

#[cfg(feature = "drive")]
#[async_trait]
impl FileStorage for S3Storage {
    async fn presigned_download_url(&self, path: &str) -> Result<String, StorageError> {
        use aws_sdk_s3::presigning::PresigningConfig;

        let presign_error = |message: String| StorageError::Presign {
            path: path.to_string(),
            message,
        };
        let presigning = PresigningConfig::expires_in(self.ttl).map_err(|e| presign_error(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path.trim_start_matches('/'))
            .presigned(presigning)
            .await
            .map_err(|e| presign_error(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}
