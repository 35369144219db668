//! Shared constants.

/// Versioned API prefix for all routes.
pub const API_PREFIX: &str = "/api/v0";

/// Validity window for presigned access URLs (15 minutes).
pub const ACCESS_URL_TTL_SECS: u64 = 15 * 60;

/// Default per-file size cap (50 MB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Default per-user storage quota (500 MB).
pub const DEFAULT_USER_QUOTA_BYTES: u64 = 500 * 1024 * 1024;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Maximum number of tags per document.
pub const MAX_TAGS: usize = 10;

/// Maximum length of a single tag in characters.
pub const MAX_TAG_CHARS: usize = 50;

/// Maximum filename length accepted from clients.
pub const MAX_FILENAME_CHARS: usize = 255;
