//! Pagination types for search results.
//!
//! Pages are offset-based: a [`PageRequest`] names a zero-based page index
//! and a page size. A page size of 0 means "everything on one page".
//! The reported total is always the size of the full result set, even when
//! the requested page lies past its end.

use serde::{Deserialize, Serialize};

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: usize,
    /// Items per page; 0 disables paging.
    pub page_size: usize,
}

impl PageRequest {
    /// Creates a request; negative or absent pages normalize to 0, as does
    /// any page of an unbounded request.
    pub fn new(page: Option<i64>, page_size: usize) -> Self {
        let page = page
            .filter(|p| *p > 0 && page_size > 0)
            .and_then(|p| usize::try_from(p).ok())
            .unwrap_or(0);
        Self { page, page_size }
    }

    /// A request returning every item.
    pub fn all() -> Self {
        Self {
            page: 0,
            page_size: 0,
        }
    }

    /// Caps the page size to `max`. An unbounded request stays unbounded.
    pub fn capped(mut self, max: usize) -> Self {
        if self.page_size > max {
            self.page_size = max;
        }
        self
    }

    /// Returns true when paging is disabled.
    pub fn is_unbounded(&self) -> bool {
        self.page_size == 0
    }

    /// The page index actually served: 0 when paging is disabled.
    pub fn served_page(&self) -> usize {
        if self.is_unbounded() { 0 } else { self.page }
    }

    /// Index of the first item of this page.
    pub fn offset(&self) -> usize {
        if self.is_unbounded() {
            0
        } else {
            self.page.saturating_mul(self.page_size)
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, 20)
    }
}

/// Information about a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// The page index that was served.
    pub page: usize,

    /// The page size that was applied (0 = unbounded).
    pub page_size: usize,

    /// Total count of matching items.
    pub total: u64,
}

impl PageInfo {
    /// Returns true if items exist after this page.
    pub fn has_next(&self) -> bool {
        self.page_size != 0
            && (self.page as u64)
                .saturating_add(1)
                .saturating_mul(self.page_size as u64)
                < self.total
    }

    /// Returns true if this is not the first page.
    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}

/// A page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,

    /// Pagination information.
    pub page_info: PageInfo,
}

impl<T> Page<T> {
    /// Creates a new page with the given items and page info.
    pub fn new(items: Vec<T>, page_info: PageInfo) -> Self {
        Self { items, page_info }
    }

    /// Creates an empty page for the request.
    pub fn empty(request: &PageRequest) -> Self {
        Self {
            items: Vec::new(),
            page_info: PageInfo {
                page: request.served_page(),
                page_size: request.page_size,
                total: 0,
            },
        }
    }

    /// Returns true if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maps the items to a different type.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
        }
    }
}

/// Slices an ordered, already complete list into one page.
pub fn paginate<T>(items: Vec<T>, request: &PageRequest) -> Page<T> {
    let total = items.len();
    let page_info = PageInfo {
        page: request.served_page(),
        page_size: request.page_size,
        total: total as u64,
    };

    if request.is_unbounded() {
        return Page::new(items, page_info);
    }

    let start = request.offset();
    if start >= total {
        return Page::new(Vec::new(), page_info);
    }
    let end = start.saturating_add(request.page_size).min(total);
    let items = items.into_iter().skip(start).take(end - start).collect();
    Page::new(items, page_info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://ex.org/id/{i}")).collect()
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate(ids(15), &PageRequest::new(Some(1), 10));
        assert_eq!(page.len(), 5);
        assert_eq!(page.page_info.total, 15);
        assert_eq!(page.items[0], "http://ex.org/id/10");
        assert!(!page.page_info.has_next());
        assert!(page.page_info.has_previous());
    }

    #[test]
    fn test_page_past_end_is_empty_with_total() {
        let page = paginate(ids(15), &PageRequest::new(Some(5), 10));
        assert!(page.is_empty());
        assert_eq!(page.page_info.total, 15);
    }

    #[test]
    fn test_unbounded_request_serves_page_zero() {
        assert_eq!(PageRequest::new(Some(3), 0).page, 0);

        let request = PageRequest {
            page: 4,
            page_size: 0,
        };
        let page = paginate(ids(15), &request);
        assert_eq!(page.len(), 15);
        assert_eq!(page.page_info.page, 0);
        assert!(!page.page_info.has_previous());
        assert_eq!(Page::<String>::empty(&request).page_info.page, 0);
    }

    #[test]
    fn test_negative_or_missing_page_is_first() {
        assert_eq!(PageRequest::new(Some(-3), 10).page, 0);
        assert_eq!(PageRequest::new(None, 10).page, 0);
        let page = paginate(ids(15), &PageRequest::new(Some(-1), 10));
        assert_eq!(page.len(), 10);
        assert!(page.page_info.has_next());
    }

    #[test]
    fn test_zero_page_size_returns_everything() {
        let page = paginate(ids(15), &PageRequest::new(Some(3), 0));
        assert_eq!(page.len(), 15);
        assert_eq!(page.page_info.total, 15);
    }

    #[test]
    fn test_capped() {
        assert_eq!(PageRequest::new(None, 500).capped(100).page_size, 100);
        assert_eq!(PageRequest::all().capped(100).page_size, 0);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let page = paginate(ids(3), &PageRequest::new(Some(i64::MAX), usize::MAX));
        assert!(page.is_empty());
        assert_eq!(page.page_info.total, 3);
    }

    #[test]
    fn test_map_keeps_page_info() {
        let page = paginate(ids(4), &PageRequest::new(Some(0), 2)).map(|s| s.len());
        assert_eq!(page.len(), 2);
        assert_eq!(page.page_info.total, 4);
    }
}
