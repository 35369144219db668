//! Audit trail events. Write-only; recording is fire-and-forget and must
//! never abort the operation being audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Upload,
    Download,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "upload",
            AuditAction::Download => "download",
            AuditAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
    /// Bytes exist in the object store with no metadata row referencing
    /// them. Recorded so a reconciliation sweep can find the key later.
    Orphaned,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Rejected => "rejected",
            AuditOutcome::Failed => "failed",
            AuditOutcome::Orphaned => "orphaned",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    pub user_id: Uuid,
    pub document_id: Option<Uuid>,
    pub storage_key: Option<String>,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, outcome: AuditOutcome, user_id: Uuid) -> Self {
        Self {
            action,
            outcome,
            user_id,
            document_id: None,
            storage_key: None,
            detail: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn document(mut self, id: Uuid) -> Self {
        self.document_id = Some(id);
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
