//! Application initialization, extracted from main.rs.

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use docvault_core::Config;
use docvault_db::{PgAuditStore, PgCategoryStore, PgDocumentStore};
use docvault_inspect::ContentValidator;
use docvault_storage::create_storage;

use crate::services::{DocumentService, QuotaTracker, SpawnedAuditSink};
use crate::state::AppState;

/// Initialize the entire application: telemetry, database, storage, services,
/// routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    docvault_infra::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated");

    let pool = docvault_db::connect(&config).await?;
    docvault_db::migrate(&pool).await?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize object storage")?;

    let documents = Arc::new(PgDocumentStore::new(pool.clone()));
    let categories = Arc::new(PgCategoryStore::new(pool.clone()));
    let audit_store = Arc::new(PgAuditStore::new(pool.clone()));
    let audit = Arc::new(SpawnedAuditSink::new(audit_store.clone()));

    let validator = Arc::new(build_validator(&config));
    let quota = QuotaTracker::new(documents.clone(), config.user_quota_bytes() as i64);

    let service = Arc::new(DocumentService::new(
        validator,
        storage.clone(),
        documents.clone(),
        categories.clone(),
        quota.clone(),
        audit.clone(),
        config.max_file_size_bytes(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        pool,
        storage,
        documents,
        categories,
        audit_store,
        audit,
        quota,
        service,
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

#[cfg(feature = "clamav")]
fn build_validator(config: &Config) -> ContentValidator {
    use docvault_inspect::ClamAvScanner;

    if config.scanner_enabled() {
        let scanner = ClamAvScanner::with_timeout(
            config.scanner_host().to_string(),
            config.scanner_port(),
            config.scanner_timeout_secs(),
        );
        tracing::info!(
            host = config.scanner_host(),
            port = config.scanner_port(),
            fail_closed = config.scanner_fail_closed(),
            "Malware scanning enabled"
        );
        ContentValidator::new(Some(Arc::new(scanner)), config.scanner_fail_closed())
    } else {
        tracing::warn!("Malware scanning disabled, uploads are signature-checked only");
        ContentValidator::without_scanner()
    }
}

#[cfg(not(feature = "clamav"))]
fn build_validator(config: &Config) -> ContentValidator {
    if config.scanner_enabled() {
        tracing::warn!("SCANNER_ENABLED is set but the clamav feature is compiled out");
    }
    ContentValidator::without_scanner()
}
