//! Audit trail repository. Append-only; nothing in the service reads these
//! rows back, they exist for operators and reconciliation sweeps.

use async_trait::async_trait;
use docvault_core::models::AuditEvent;
use docvault_core::AppError;
use sqlx::PgPool;

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    #[tracing::instrument(skip(self, event), fields(db.table = "audit_log", db.operation = "insert"))]
    async fn record(&self, event: &AuditEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (action, outcome, user_id, document_id, storage_key, detail, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.action.as_str())
        .bind(event.outcome.as_str())
        .bind(event.user_id)
        .bind(event.document_id)
        .bind(&event.storage_key)
        .bind(&event.detail)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
