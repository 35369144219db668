use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::Client;
use docvault_core::models::Disposition;
use std::time::Duration;
use uuid::Uuid;

/// S3-backed object store.
///
/// Objects are written with SSE (AES-256) and never exposed publicly; the
/// only read path is a presigned GET URL with a bounded lifetime.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint_url {
            // S3-compatible providers generally require path-style addressing.
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(S3Storage {
            client: Client::from_conf(builder.build()),
            bucket,
        })
    }

    /// Map an SDK failure, separating "the backend did not answer" from
    /// operation-specific service errors.
    fn map_sdk_error<E>(operation: &str, err: SdkError<E>) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match &err {
            SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                StorageError::Unavailable(format!("{}: {}", operation, err))
            }
            _ => StorageError::UploadFailed(format!("{}: {}", operation, err)),
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let key = keys::generate_storage_key(owner_id, filename);
        let size = data.len();
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to upload object to S3"
                );
                Self::map_sdk_error("put_object", e)
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_millis(),
            "Uploaded object to S3"
        );

        Ok(key)
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        disposition: Disposition,
        original_filename: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::ConfigError(format!("presigning config: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .response_content_disposition(disposition.header_value(original_filename))
            .presigned(presigning)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "Failed to presign GET URL"
                );
                Self::map_sdk_error("presign_get", e)
            })?;

        Ok(request.uri().to_string())
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        // S3 delete is idempotent: deleting a missing key succeeds, which the
        // compensation path depends on.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    "Failed to delete object from S3"
                );
                match &e {
                    SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                        StorageError::Unavailable(format!("delete_object: {}", e))
                    }
                    _ => StorageError::DeleteFailed(format!("delete_object: {}", e)),
                }
            })?;

        tracing::debug!(bucket = %self.bucket, key = %storage_key, "Deleted object from S3");
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => Err(
                    StorageError::Unavailable(format!("head_object: {}", e)),
                ),
                _ => {
                    if e.as_service_error().map(|se| se.is_not_found()) == Some(true) {
                        Ok(false)
                    } else {
                        Err(StorageError::Unavailable(format!("head_object: {}", e)))
                    }
                }
            },
        }
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(storage_key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                    StorageError::Unavailable(format!("head_object: {}", e))
                }
                _ => {
                    if e.as_service_error().map(|se| se.is_not_found()) == Some(true) {
                        StorageError::NotFound(storage_key.to_string())
                    } else {
                        StorageError::Unavailable(format!("head_object: {}", e))
                    }
                }
            })?;

        Ok(head.content_length().unwrap_or(0).max(0) as u64)
    }
}
