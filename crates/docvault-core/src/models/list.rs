//! Filter and pagination types for document listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Tag filter semantics. The default is `Any` (set overlap) for
/// discoverability; `All` requires every requested tag to be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    #[default]
    Any,
    All,
}

/// Filter predicates for document listing. All predicates are optional and
/// conjunctive.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub owner_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub content_type: Option<String>,
    pub tags: Vec<String>,
    pub tag_match: TagMatch,
    /// Free-text query over original filename and description, ranked.
    pub query: Option<String>,
    pub uploaded_after: Option<DateTime<Utc>>,
    pub uploaded_before: Option<DateTime<Utc>>,
}

impl DocumentFilter {
    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none()
            && self.category_id.is_none()
            && self.content_type.is_none()
            && self.tags.is_empty()
            && self.query.is_none()
            && self.uploaded_after.is_none()
            && self.uploaded_before.is_none()
    }
}

/// Offset/limit pagination with sane bounds.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the overall totals.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let limit = pagination.limit();
        let total_pages = if total == 0 {
            0
        } else {
            ((total + limit as i64 - 1) / limit as i64) as u32
        };
        Self {
            items,
            total,
            page: pagination.page(),
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_bounds() {
        let default = Pagination::new(None, None);
        assert_eq!(default.page(), 1);
        assert_eq!(default.limit(), Pagination::DEFAULT_LIMIT);
        assert_eq!(default.offset(), 0);

        let clamped = Pagination::new(Some(0), Some(10_000));
        assert_eq!(clamped.page(), 1);
        assert_eq!(clamped.limit(), Pagination::MAX_LIMIT);

        let third = Pagination::new(Some(3), Some(25));
        assert_eq!(third.offset(), 50);
    }

    #[test]
    fn test_page_count_rounds_up() {
        let page = Page::new(vec![1, 2, 3], 41, Pagination::new(Some(1), Some(20)));
        assert_eq!(page.total_pages, 3);

        let empty: Page<i32> = Page::new(vec![], 0, Pagination::default());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_tag_match_defaults_to_any() {
        assert_eq!(TagMatch::default(), TagMatch::Any);
        let filter = DocumentFilter::default();
        assert_eq!(filter.tag_match, TagMatch::Any);
        assert!(filter.is_empty());
    }
}
