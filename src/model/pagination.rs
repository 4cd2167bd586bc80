use serde::Serialize;

use crate::config::PaginationConfig;

/// Requested page after query-string parsing. Page numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub size: u64,
}

impl PageRequest {
    /// Parse `page` / `page_size` query values.
    ///
    /// Returns `None` when `page` is not a positive integer. A missing or
    /// unusable `page_size` falls back to the configured default and large
    /// values are clamped to the configured maximum.
    pub fn from_params(
        page: Option<&str>,
        page_size: Option<&str>,
        config: &PaginationConfig,
    ) -> Option<Self> {
        let number = match page.map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw.parse::<u64>().ok().filter(|n| *n >= 1)?,
        };

        let size = page_size
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n.min(config.max_page_size.max(1)))
            .unwrap_or(config.page_size.max(1));

        Some(Self { number, size })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }

    /// Number of pages for `count` rows; an empty set still has one page.
    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.size).max(1)
    }

    pub fn is_within(&self, count: u64) -> bool {
        self.number <= self.num_pages(count)
    }
}

/// One slice of an ordered result set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.request.number < self.request.num_pages(self.count)
    }

    pub fn has_previous(&self) -> bool {
        self.request.number > 1
    }
}

/// Pagination envelope returned by list endpoints
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}
