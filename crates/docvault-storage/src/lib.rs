//! Docvault Storage Library
//!
//! Object-store abstraction and the S3 implementation behind it. Documents
//! are stored under owner-scoped keys, encrypted at rest, and only readable
//! through short-lived presigned URLs.
//!
//! # Storage key format
//!
//! All keys follow `documents/{owner_id}/{filename}` where the filename is a
//! generated UUID plus extension. Key generation is centralized in the
//! `keys` module.

pub mod factory;
pub mod keys;
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
