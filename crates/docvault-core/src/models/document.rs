use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::security::SecurityMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Internal, key-safe filename (`{uuid}.{ext}`).
    pub filename: String,
    /// User-facing filename as uploaded (sanitized).
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    /// Reference into the object store. Unique and immutable once set.
    pub storage_key: String,
    pub category_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub security: SecurityMetadata,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-editable metadata fields. Bytes and security metadata are never
/// mutable; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DocumentUpdate {
    pub original_filename: Option<String>,
    #[serde(default, with = "double_option")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Distinguishes "field absent" (no change) from "field null" (clear it).
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl DocumentUpdate {
    pub fn is_empty(&self) -> bool {
        self.original_filename.is_none()
            && self.category_id.is_none()
            && self.description.is_none()
            && self.tags.is_none()
    }
}

/// Full response returned after upload and on single-document reads.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub security: SecurityMetadata,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            filename: doc.filename,
            original_filename: doc.original_filename,
            content_type: doc.content_type,
            file_size: doc.file_size,
            category_id: doc.category_id,
            description: doc.description,
            tags: doc.tags,
            security: doc.security,
            uploaded_at: doc.uploaded_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Compact representation for list/search pages.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        DocumentSummary {
            id: doc.id,
            original_filename: doc.original_filename,
            content_type: doc.content_type,
            file_size: doc.file_size,
            category_id: doc.category_id,
            tags: doc.tags,
            uploaded_at: doc.uploaded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_document() -> Document {
        Document {
            id: Uuid::new_v4(),
            filename: "8c7f9a2e.pdf".to_string(),
            original_filename: "quarterly-report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            file_size: 2048,
            storage_key: "documents/owner/8c7f9a2e.pdf".to_string(),
            category_id: None,
            owner_id: Uuid::new_v4(),
            description: Some("Q3 numbers".to_string()),
            tags: vec!["finance".to_string(), "q3".to_string()],
            security: SecurityMetadata {
                detected_content_type: Some("application/pdf".to_string()),
                signature_hex: "255044462d".to_string(),
                executable_like: false,
                active_content: false,
                warnings: vec![],
                scanned_at: Utc::now(),
            },
            uploaded_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_document_response_from_document() {
        let doc = test_document();
        let response = DocumentResponse::from(doc.clone());
        assert_eq!(response.id, doc.id);
        assert_eq!(response.original_filename, "quarterly-report.pdf");
        assert_eq!(response.file_size, 2048);
        assert_eq!(response.tags, doc.tags);
        assert_eq!(response.security, doc.security);
    }

    #[test]
    fn test_summary_omits_security_but_keeps_tags() {
        let doc = test_document();
        let summary = DocumentSummary::from(doc.clone());
        assert_eq!(summary.id, doc.id);
        assert_eq!(summary.tags, vec!["finance", "q3"]);
    }

    #[test]
    fn test_update_absent_vs_null_category() {
        let absent: DocumentUpdate = serde_json::from_str(r#"{}"#).unwrap();
        assert!(absent.category_id.is_none());
        assert!(absent.is_empty());

        let cleared: DocumentUpdate = serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));
        assert!(!cleared.is_empty());
    }
}
