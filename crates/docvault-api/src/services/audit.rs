//! Fire-and-forget audit recording.
//!
//! Audit writes must never fail or slow down the operation being audited,
//! so the sink hands events to a background task and returns immediately.

use docvault_core::models::AuditEvent;
use docvault_db::AuditStore;
use std::sync::Arc;

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Sink that spawns one task per event and logs (but swallows) failures.
#[derive(Clone)]
pub struct SpawnedAuditSink {
    store: Arc<dyn AuditStore>,
}

impl SpawnedAuditSink {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }
}

impl AuditSink for SpawnedAuditSink {
    fn record(&self, event: AuditEvent) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.record(&event).await {
                tracing::error!(
                    error = %e,
                    action = event.action.as_str(),
                    outcome = event.outcome.as_str(),
                    user_id = %event.user_id,
                    "Failed to record audit event"
                );
            }
        });
    }
}
