pub mod categories;
pub mod document_delete;
pub mod document_download;
pub mod document_get;
pub mod document_update;
pub mod document_upload;
pub mod health;
pub mod quota;
