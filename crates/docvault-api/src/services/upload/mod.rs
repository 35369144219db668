mod service;
mod types;

pub use service::DocumentService;
pub use types::{UploadRequest, UploadStage};
