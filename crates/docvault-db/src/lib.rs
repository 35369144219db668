//! Docvault Database Library
//!
//! Postgres repositories for document metadata, categories, and the audit
//! trail, plus pool construction and embedded migrations. Repositories are
//! exposed as traits so the upload pipeline can be tested against in-memory
//! implementations.

pub mod db;

use docvault_core::{AppError, Config};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

pub use db::audit::{AuditStore, PgAuditStore};
pub use db::categories::{CategoryStore, PgCategoryStore};
pub use db::documents::{DocumentStore, PgDocumentStore};
pub use db::transaction::TransactionGuard;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connect to Postgres with the configured pool bounds.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .connect(config.database_url())
        .await?;

    Ok(pool)
}

/// Apply pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), AppError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| AppError::InternalWithSource {
            message: "Migration failed".to_string(),
            source: e.into(),
        })
}
