pub mod audit;
pub mod quota;
pub mod upload;

pub use audit::{AuditSink, SpawnedAuditSink};
pub use quota::QuotaTracker;
pub use upload::{DocumentService, UploadRequest};
