//! Pagination primitives shared by list queries.

use serde::{Deserialize, Serialize};

/// Caller-supplied page selection. 1-based pages, clamped page size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        // Widened before multiplying: `page` comes straight from client
        // query strings and can be u32::MAX.
        (self.page as usize - 1) * self.page_size as usize
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}

/// Pagination metadata carried alongside paginated payloads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(total: u64, request: PageRequest) -> Self {
        let total_pages = (total as f64 / request.page_size as f64).ceil() as u32;
        Self {
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages,
        }
    }
}

/// A page of results plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            data,
            pagination: Pagination::new(total, request),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_inputs() {
        let req = PageRequest::new(0, 1000);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, PageRequest::MAX_PAGE_SIZE);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination::new(21, PageRequest::new(1, 10));
        assert_eq!(p.total_pages, 3);

        let empty = Pagination::new(0, PageRequest::new(1, 10));
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn offset_follows_page() {
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn offset_survives_the_largest_page_number() {
        let req = PageRequest::new(u32::MAX, 10);
        assert_eq!(req.offset(), (u32::MAX as usize - 1) * 10);
    }
}
