//! Shared key generation for the object store.
//!
//! Key format: `documents/{owner_id}/{filename}`. The stored filename is a
//! generated UUID plus the original extension; the client-supplied name only
//! lives in metadata.

use uuid::Uuid;

/// Generate a storage key for the given owner and object filename.
pub fn generate_storage_key(owner_id: Uuid, filename: &str) -> String {
    format!("documents/{}/{}", owner_id, filename)
}

/// Generate the object filename stored under the key: a fresh UUID keeping
/// the original extension (lowercased) when one is present.
pub fn object_filename(original_filename: &str) -> String {
    let id = Uuid::new_v4();
    match original_filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}.{}", id, ext.to_lowercase())
        }
        _ => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_owner_scoped() {
        let owner = Uuid::new_v4();
        let key = generate_storage_key(owner, "abc.pdf");
        assert_eq!(key, format!("documents/{}/abc.pdf", owner));
    }

    #[test]
    fn test_object_filename_keeps_extension() {
        let name = object_filename("Quarterly Report.PDF");
        assert!(name.ends_with(".pdf"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_object_filename_without_extension() {
        let name = object_filename("README");
        assert!(!name.contains('.'));
        assert!(Uuid::parse_str(&name).is_ok());
    }
}
