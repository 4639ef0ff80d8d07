//! Pagination types
//!
//! Page numbers come straight from the query string and are resolved
//! leniently: garbage means the first page, anything outside the valid
//! range means the last page. A request never fails because of its page.

use serde::{Deserialize, Serialize};

/// Largest accepted page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 6,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Resolve a raw `page` query value against a collection of `total` items.
    pub fn resolve(raw: Option<&str>, total: i64, per_page: u32) -> Self {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let last = num_pages(total, per_page);

        let page = match raw.map(str::trim).map(str::parse::<i64>) {
            Some(Ok(n)) if n >= 1 && n <= i64::from(last) => n as u32,
            Some(Ok(_)) => last,
            Some(Err(_)) | None => 1,
        };

        Self { page, per_page }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Number of pages needed for `total` items; never less than one.
pub fn num_pages(total: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.max(1));
    let pages = (total.max(0) + per_page - 1) / per_page;
    pages.clamp(1, i64::from(u32::MAX)) as u32
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        num_pages(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Navigation summary for templates
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            number: self.page,
            num_pages: self.total_pages(),
            total: self.total,
            has_previous: self.has_prev(),
            has_next: self.has_next(),
            previous_page_number: self.page.saturating_sub(1).max(1),
            next_page_number: (self.page + 1).min(self.total_pages()),
        }
    }
}

/// Serializable page navigation data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub total: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: u32,
    pub next_page_number: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_or_garbage_page_is_first() {
        assert_eq!(ListParams::resolve(None, 20, 6).page, 1);
        assert_eq!(ListParams::resolve(Some("abc"), 20, 6).page, 1);
        assert_eq!(ListParams::resolve(Some(""), 20, 6).page, 1);
        assert_eq!(ListParams::resolve(Some("2.5"), 20, 6).page, 1);
    }

    #[test]
    fn test_out_of_range_page_is_last() {
        assert_eq!(ListParams::resolve(Some("99"), 20, 6).page, 4);
        assert_eq!(ListParams::resolve(Some("0"), 20, 6).page, 4);
        assert_eq!(ListParams::resolve(Some("-3"), 20, 6).page, 4);
    }

    #[test]
    fn test_valid_page_kept() {
        let params = ListParams::resolve(Some(" 3 "), 20, 6);
        assert_eq!(params.page, 3);
        assert_eq!(params.offset(), 12);
        assert_eq!(params.limit(), 6);
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        assert_eq!(num_pages(0, 6), 1);
        let params = ListParams::resolve(Some("5"), 0, 6);
        assert_eq!(params.page, 1);

        let result: PagedResult<i32> = PagedResult::new(vec![], 0, &params);
        let info = result.page_info();
        assert_eq!(info.num_pages, 1);
        assert!(!info.has_next);
        assert!(!info.has_previous);
    }

    #[test]
    fn test_page_info_navigation() {
        let params = ListParams::new(2, 6);
        let result = PagedResult::new(vec![1, 2, 3, 4, 5, 6], 13, &params);
        let info = result.page_info();
        assert_eq!(info.number, 2);
        assert_eq!(info.num_pages, 3);
        assert!(info.has_previous);
        assert!(info.has_next);
        assert_eq!(info.previous_page_number, 1);
        assert_eq!(info.next_page_number, 3);
    }

    proptest! {
        #[test]
        fn resolved_page_is_always_in_range(
            raw in proptest::option::of(".{0,8}"),
            total in 0i64..10_000,
            per_page in 1u32..50,
        ) {
            let params = ListParams::resolve(raw.as_deref(), total, per_page);
            prop_assert!(params.page >= 1);
            prop_assert!(params.page <= num_pages(total, per_page));
        }

        #[test]
        fn num_pages_covers_every_item(total in 0i64..10_000, per_page in 1u32..50) {
            let pages = i64::from(num_pages(total, per_page));
            prop_assert!(pages * i64::from(per_page) >= total);
            prop_assert!(pages == 1 || (pages - 1) * i64::from(per_page) < total);
        }
    }
}
