//! Shared page-number pagination helpers.

use thiserror::Error;

/// A 1-based page request with a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Row offset for the requested page; page numbers below 1 clamp to the
    /// first page (they are rejected later by [`Page::new`]).
    pub fn offset(&self) -> i64 {
        i64::from(self.number.saturating_sub(1)) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// One materialized page of a listing plus the totals needed to render
/// pagination controls.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub size: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    /// Validate the request against the total row count. Page 1 of an empty
    /// listing is an empty page; any other out-of-range number is an error.
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Result<Self, PaginationError> {
        let page = Self {
            items,
            number: request.number,
            size: request.size,
            total_items,
        };

        if request.number < 1 || request.number > page.total_pages() {
            return Err(PaginationError::OutOfRange {
                number: request.number,
                total_pages: page.total_pages(),
            });
        }

        Ok(page)
    }

    /// Total page count; an empty listing still has one (empty) page.
    pub fn total_pages(&self) -> u32 {
        let size = u64::from(self.size.max(1));
        let pages = self.total_items.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages()
    }

    pub fn previous_number(&self) -> u32 {
        self.number.saturating_sub(1)
    }

    pub fn next_number(&self) -> u32 {
        self.number.saturating_add(1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page {number} is out of range (1..={total_pages})")]
    OutOfRange { number: u32, total_pages: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_zero_based_pages() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(3, 10).offset(), 20);
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
        assert_eq!(PageRequest::new(2, 10).limit(), 10);
    }

    #[test]
    fn first_page_of_empty_listing_is_empty_not_an_error() {
        let page = Page::<u32>::new(Vec::new(), PageRequest::new(1, 10), 0).expect("empty page");
        assert_eq!(page.total_pages(), 1);
        assert!(!page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn out_of_range_pages_are_rejected() {
        let err = Page::<u32>::new(Vec::new(), PageRequest::new(3, 10), 15).expect_err("page 3 of 2");
        assert_eq!(
            err,
            PaginationError::OutOfRange {
                number: 3,
                total_pages: 2
            }
        );

        assert!(Page::<u32>::new(Vec::new(), PageRequest::new(0, 10), 15).is_err());
    }

    #[test]
    fn total_pages_round_up() {
        let page = Page::new(vec![1, 2, 3, 4, 5], PageRequest::new(2, 10), 15).expect("page 2");
        assert_eq!(page.total_pages(), 2);
        assert!(page.has_previous());
        assert!(!page.has_next());
        assert_eq!(page.previous_number(), 1);
    }
}
