//! Database repositories for the data access layer.
//!
//! Each repository owns one table: `documents` (metadata), `categories`,
//! and `audit_log`. Repositories take a `PgPool` and return domain models
//! from `docvault-core`; no SQL leaks past this module.

pub mod audit;
pub mod categories;
pub mod documents;
pub mod transaction;

pub use audit::{AuditStore, PgAuditStore};
pub use categories::{CategoryStore, PgCategoryStore};
pub use documents::{DocumentStore, PgDocumentStore};
pub use transaction::TransactionGuard;
