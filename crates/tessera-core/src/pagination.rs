//! Page-number pagination shared by repositories and the HTTP layer.

use serde::Serialize;

use crate::defaults::{FIRST_PAGE, PER_PAGE, PER_PAGE_MAX};

/// A validated page request. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: FIRST_PAGE,
            per_page: PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Build from raw caller input. Pages below 1 become 1; page sizes are
    /// clamped to `1..=PER_PAGE_MAX` and default to `default_per_page`.
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: u32) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .map(|p| p.min(u32::MAX as i64) as u32)
            .unwrap_or(FIRST_PAGE);
        let per_page = per_page
            .map(|n| n.clamp(1, PER_PAGE_MAX as i64) as u32)
            .unwrap_or_else(|| default_per_page.clamp(1, PER_PAGE_MAX));
        Self { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// One page of results plus the total they were drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    /// Matching rows before pagination.
    pub total: i64,
    pub page: PageRequest,
}

impl<T> Paginated<T> {
    pub fn empty(page: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
        }
    }

    /// Slice an already filtered and sorted collection.
    pub fn from_sorted(all: Vec<T>, page: PageRequest) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect();
        Self { items, total, page }
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn total_pages(&self) -> u32 {
        let per_page = self.page.per_page.max(1) as i64;
        let pages = (self.total + per_page - 1) / per_page;
        pages.max(1) as u32
    }

    pub fn next_page(&self) -> Option<u32> {
        (self.page.page < self.total_pages()).then(|| self.page.page + 1)
    }

    pub fn prev_page(&self) -> Option<u32> {
        (self.page.page > FIRST_PAGE).then(|| self.page.page - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }
}
