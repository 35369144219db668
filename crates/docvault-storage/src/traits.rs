//! Storage abstraction trait
//!
//! This module defines the Storage trait the upload pipeline works against.

use async_trait::async_trait;
use docvault_core::models::Disposition;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The backend could not be reached or did not answer in time. Callers
    /// treat this as retryable, unlike the other variants.
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// The metadata pipeline works against this trait so tests can substitute
/// in-memory fakes and the backend can change without touching callers.
///
/// **Key format:** keys are owner-scoped: `documents/{owner_id}/{filename}`.
/// See the `keys` module.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a document body and return its storage key.
    ///
    /// The key embeds the owner and a generated object filename, never the
    /// client-supplied name.
    async fn put(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String>;

    /// Generate a time-limited GET URL for direct access.
    ///
    /// The disposition and the original filename are baked into the signed
    /// URL so the browser's download behavior cannot be altered after
    /// issuance.
    async fn presigned_get_url(
        &self,
        storage_key: &str,
        disposition: Disposition,
        original_filename: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Delete an object by its storage key.
    ///
    /// Deleting a missing key succeeds; callers rely on this for
    /// compensation after partial failures.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of a stored object.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;
}
