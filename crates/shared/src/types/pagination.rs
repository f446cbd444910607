//! Paging for transaction listings.
//!
//! Clients may send any `page`/`per_page`; out-of-range values are clamped
//! rather than rejected, and the clamped values are echoed back in [`PageMeta`].

use serde::{Deserialize, Serialize};

/// Which slice of a listing the client wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number; 0 is read as 1.
    #[serde(default = "PageRequest::first_page")]
    pub page: u32,
    /// Rows per page, clamped to `1..=MAX_PER_PAGE`.
    #[serde(default = "PageRequest::default_per_page")]
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: Self::first_page(),
            per_page: Self::default_per_page(),
        }
    }
}

impl PageRequest {
    /// Largest page size a client may ask for.
    pub const MAX_PER_PAGE: u32 = 100;

    const fn first_page() -> u32 {
        1
    }

    const fn default_per_page() -> u32 {
        20
    }

    /// Page number after clamping.
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.page.max(1)
    }

    /// Page size after clamping.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, Self::MAX_PER_PAGE)
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number() - 1) * self.limit()
    }

    /// Rows to fetch.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size())
    }

    /// Wraps one fetched page together with the total row count.
    #[must_use]
    pub fn respond<T>(&self, data: Vec<T>, total: u64) -> PageResponse<T> {
        let per_page = self.page_size();
        let total_pages = u32::try_from(total.div_ceil(u64::from(per_page)))
            .unwrap_or(u32::MAX)
            .max(1);
        PageResponse {
            data,
            meta: PageMeta {
                page: self.page_number(),
                per_page,
                total,
                total_pages,
            },
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// Rows on this page.
    pub data: Vec<T>,
    /// Where this page sits in the listing.
    pub meta: PageMeta,
}

/// Paging metadata; an empty listing still reports one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Clamped page number.
    pub page: u32,
    /// Clamped page size.
    pub per_page: u32,
    /// Matching rows across all pages.
    pub total: u64,
    /// At least 1.
    pub total_pages: u32,
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
