//! Upload pipeline types.

use std::fmt;
use uuid::Uuid;

/// One upload, extracted from the multipart body plus its form fields.
#[derive(Debug)]
pub struct UploadRequest {
    pub data: Vec<u8>,
    pub original_filename: String,
    pub content_type: String,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Pipeline stage, used in logs so a failed upload shows how far it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Validating,
    Storing,
    Persisting,
    Complete,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Validating => "validating",
            UploadStage::Storing => "storing",
            UploadStage::Persisting => "persisting",
            UploadStage::Complete => "complete",
        };
        write!(f, "{}", name)
    }
}
