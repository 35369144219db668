//! Security metadata captured by content inspection at upload time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of byte-level inspection, attached to a document at creation.
///
/// Immutable after creation and never user-editable; the upload pipeline
/// copies the accepted inspection report into this structure verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecurityMetadata {
    /// Content type derived from byte inspection; may differ from the
    /// declared type (recorded as a warning when it does).
    pub detected_content_type: Option<String>,
    /// Hex-encoded leading-byte fingerprint.
    pub signature_hex: String,
    /// Payload head matched a known executable/bytecode magic number.
    pub executable_like: bool,
    /// Embedded scripts or macros were found (warning, not rejection).
    pub active_content: bool,
    /// Non-fatal findings accumulated during inspection.
    pub warnings: Vec<String>,
    pub scanned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_metadata_round_trips_as_json() {
        let meta = SecurityMetadata {
            detected_content_type: Some("application/pdf".to_string()),
            signature_hex: "255044462d".to_string(),
            executable_like: false,
            active_content: true,
            warnings: vec!["embedded active content detected".to_string()],
            scanned_at: Utc::now(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        let back: SecurityMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
