//! Shared application state handed to every handler.

use std::sync::Arc;

use docvault_core::Config;
use docvault_db::{AuditStore, CategoryStore, DocumentStore};
use docvault_storage::Storage;
use sqlx::PgPool;

use crate::services::{AuditSink, DocumentService, QuotaTracker};

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub storage: Arc<dyn Storage>,
    pub documents: Arc<dyn DocumentStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub audit_store: Arc<dyn AuditStore>,
    pub audit: Arc<dyn AuditSink>,
    pub quota: QuotaTracker,
    pub service: Arc<DocumentService>,
}
