//! Derived per-user storage usage. Never cached persistently; recomputed
//! from the metadata store on demand so it cannot drift.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuotaSnapshot {
    pub used_bytes: i64,
    pub document_count: i64,
    pub limit_bytes: i64,
    pub remaining_bytes: i64,
}

impl QuotaSnapshot {
    pub fn new(used_bytes: i64, document_count: i64, limit_bytes: i64) -> Self {
        Self {
            used_bytes,
            document_count,
            limit_bytes,
            remaining_bytes: (limit_bytes - used_bytes).max(0),
        }
    }

    /// True if a file of `size` bytes fits within the remaining allowance.
    pub fn fits(&self, size: i64) -> bool {
        size <= self.remaining_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: i64 = 1024 * 1024;

    #[test]
    fn test_remaining_is_clamped_to_zero() {
        let snapshot = QuotaSnapshot::new(600 * MB, 12, 500 * MB);
        assert_eq!(snapshot.remaining_bytes, 0);
        assert!(!snapshot.fits(1));
    }

    #[test]
    fn test_fits_at_boundary() {
        let snapshot = QuotaSnapshot::new(490 * MB, 4, 500 * MB);
        assert!(snapshot.fits(10 * MB));
        assert!(!snapshot.fits(10 * MB + 1));
        assert!(!snapshot.fits(20 * MB));
    }
}
