//! Domain models shared across docvault components.

pub mod access;
pub mod audit;
pub mod category;
pub mod document;
pub mod list;
pub mod quota;
pub mod security;

pub use access::{AccessGrant, Disposition};
pub use audit::{AuditAction, AuditEvent, AuditOutcome};
pub use category::{Category, CategoryResponse, CreateCategory};
pub use document::{Document, DocumentResponse, DocumentSummary, DocumentUpdate};
pub use list::{DocumentFilter, Page, Pagination, TagMatch};
pub use quota::QuotaSnapshot;
pub use security::SecurityMetadata;
