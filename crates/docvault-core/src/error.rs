//! Error types module
//!
//! This module provides the core error types used throughout docvault. All
//! errors are unified under the `AppError` enum, which carries the upload
//! pipeline's failure taxonomy: client-fixable validation and quota errors,
//! transient storage outages, and the server-side consistency conditions
//! (persistence failure, orphaned objects, missing objects behind live rows).
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so downstream crates without a database dependency can still use
//! the taxonomy.

use std::io;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like quota limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_UNAVAILABLE")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    /// Content validation produced one or more hard rejections. Never retried.
    #[error("Upload rejected: {}", reasons.join("; "))]
    ValidationRejected { reasons: Vec<String> },

    /// Accepting the file would push the owner past their storage quota.
    #[error("Quota exceeded: {used} of {limit} bytes used, upload of {requested} bytes refused")]
    QuotaExceeded {
        used: i64,
        limit: i64,
        requested: i64,
    },

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    /// The object store could not be reached or returned a transient error.
    /// Nothing was persisted, so the whole upload is safe to retry.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Metadata persistence failed after bytes were written. Surfaced to the
    /// caller as a generic failure; the compensating delete and audit trail
    /// are handled by the orchestrator before this propagates.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// A metadata row exists but the underlying object is gone.
    #[error("Document {0} exists in metadata but its object is missing")]
    DocumentGone(Uuid),

    /// Category still referenced by documents; delete refused.
    #[error("Category {id} is still referenced by {documents} document(s)")]
    CategoryInUse { id: Uuid, documents: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::ValidationRejected { .. } => (
            400,
            "VALIDATION_REJECTED",
            false,
            Some("Fix the file or its declared type and upload again"),
            false,
            LogLevel::Debug,
        ),
        AppError::QuotaExceeded { .. } => (
            413,
            "QUOTA_EXCEEDED",
            false,
            Some("Delete documents to free space or upload a smaller file"),
            false,
            LogLevel::Warn,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::StorageUnavailable(_) => (
            503,
            "STORAGE_UNAVAILABLE",
            true,
            Some("Retry the upload after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::PersistenceFailed(_) => (
            500,
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::DocumentGone(_) => (
            404,
            "DOCUMENT_GONE",
            false,
            Some("The document is no longer available"),
            false,
            LogLevel::Warn,
        ),
        AppError::CategoryInUse { .. } => (
            409,
            "CATEGORY_IN_USE",
            false,
            Some("Delete or recategorize the referencing documents first"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Only the document owner may perform this operation"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer credential"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::ValidationRejected { .. } => "ValidationRejected",
            AppError::QuotaExceeded { .. } => "QuotaExceeded",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::StorageUnavailable(_) => "StorageUnavailable",
            AppError::PersistenceFailed(_) => "PersistenceFailed",
            AppError::DocumentGone(_) => "DocumentGone",
            AppError::CategoryInUse { .. } => "CategoryInUse",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::ValidationRejected { reasons } => {
                format!("Upload rejected: {}", reasons.join("; "))
            }
            AppError::QuotaExceeded {
                used,
                limit,
                requested,
            } => format!(
                "Storage quota exceeded: {} of {} bytes used, upload of {} bytes refused",
                used, limit, requested
            ),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::StorageUnavailable(_) => {
                "Storage is temporarily unavailable, please retry".to_string()
            }
            // Internal inconsistency, not a user error. Details stay server-side.
            AppError::PersistenceFailed(_) => "Internal server error".to_string(),
            AppError::DocumentGone(_) => "Document not found".to_string(),
            AppError::CategoryInUse { documents, .. } => format!(
                "Category is still referenced by {} document(s)",
                documents
            ),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Forbidden(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_validation_rejected() {
        let err = AppError::ValidationRejected {
            reasons: vec![
                "empty file".to_string(),
                "executable-like signature".to_string(),
            ],
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "VALIDATION_REJECTED");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("empty file"));
        assert!(err.client_message().contains("executable-like"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_quota_exceeded() {
        let err = AppError::QuotaExceeded {
            used: 490 * 1024 * 1024,
            limit: 500 * 1024 * 1024,
            requested: 20 * 1024 * 1024,
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "QUOTA_EXCEEDED");
        assert!(!err.is_recoverable());
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_storage_unavailable_is_the_only_retryable_client_error() {
        let err = AppError::StorageUnavailable("connect timeout".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert!(err.is_recoverable());

        let terminal = [
            AppError::ValidationRejected {
                reasons: vec!["bad".into()],
            },
            AppError::QuotaExceeded {
                used: 1,
                limit: 1,
                requested: 1,
            },
            AppError::PersistenceFailed("insert failed".into()),
            AppError::Forbidden("not owner".into()),
        ];
        for err in terminal {
            assert!(!err.is_recoverable(), "{} should be terminal", err.error_code());
        }
    }

    #[test]
    fn test_persistence_failure_is_generic_to_callers() {
        let err = AppError::PersistenceFailed("unique violation on storage_key".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.client_message().contains("storage_key"));
    }

    #[test]
    fn test_document_gone_renders_as_not_found() {
        let id = Uuid::new_v4();
        let err = AppError::DocumentGone(id);
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "DOCUMENT_GONE");
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert!(!err.client_message().contains(&id.to_string()));
    }

    #[test]
    fn test_category_in_use_is_conflict() {
        let err = AppError::CategoryInUse {
            id: Uuid::new_v4(),
            documents: 3,
        };
        assert_eq!(err.http_status_code(), 409);
        assert!(err.client_message().contains('3'));
    }
}
