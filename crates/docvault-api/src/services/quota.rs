//! Per-owner storage quota tracking.
//!
//! Usage is recomputed from the metadata store on every check rather than
//! cached, so deletes free quota immediately and nothing can drift.

use docvault_core::models::QuotaSnapshot;
use docvault_core::AppError;
use docvault_db::DocumentStore;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuotaTracker {
    documents: Arc<dyn DocumentStore>,
    limit_bytes: i64,
}

impl QuotaTracker {
    pub fn new(documents: Arc<dyn DocumentStore>, limit_bytes: i64) -> Self {
        Self {
            documents,
            limit_bytes,
        }
    }

    pub async fn snapshot(&self, owner_id: Uuid) -> Result<QuotaSnapshot, AppError> {
        let (used_bytes, document_count) = self.documents.usage(owner_id).await?;
        Ok(QuotaSnapshot::new(
            used_bytes,
            document_count,
            self.limit_bytes,
        ))
    }

    /// Refuse an upload that would push the owner past their cap. Must be
    /// called before any bytes reach the object store.
    pub async fn ensure_fits(&self, owner_id: Uuid, requested: i64) -> Result<(), AppError> {
        let snapshot = self.snapshot(owner_id).await?;
        if !snapshot.fits(requested) {
            return Err(AppError::QuotaExceeded {
                used: snapshot.used_bytes,
                limit: snapshot.limit_bytes,
                requested,
            });
        }
        Ok(())
    }
}
