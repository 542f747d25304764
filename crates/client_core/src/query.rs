//! Search/filter/page state for the public listing.

use std::sync::Arc;

use shared::domain::StatusFilter;
use tracing::debug;

use crate::cache::{CacheLookup, CollectionCache, PageResult, QueryKey};

/// Number of posts per public-listing page.
pub const PAGE_SIZE: u32 = 8;

/// Identifies one cacheable page of the public listing. Two signatures are
/// equal iff all four fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature {
    pub search: String,
    pub status: StatusFilter,
    pub page: u32,
    pub page_size: u32,
}

impl QuerySignature {
    pub fn first_page(search: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
            page: 1,
            page_size: PAGE_SIZE,
        }
    }

    pub fn same_filter(&self, other: &QuerySignature) -> bool {
        self.search == other.search && self.status == other.status
    }
}

/// Owns the current query coordinates for the public listing and hands the
/// signature to the collection cache whenever it changes. Performs no I/O of
/// its own.
pub struct QueryController {
    cache: Arc<CollectionCache>,
    signature: QuerySignature,
    known_total_pages: u32,
}

impl QueryController {
    pub fn new(cache: Arc<CollectionCache>) -> Self {
        Self {
            cache,
            signature: QuerySignature::first_page("", StatusFilter::Any),
            known_total_pages: 1,
        }
    }

    pub fn signature(&self) -> &QuerySignature {
        &self.signature
    }

    /// Page count from the most recent page result for the active filter;
    /// page controls are derived from this.
    pub fn total_pages(&self) -> u32 {
        self.known_total_pages
    }

    /// Resolve the current signature through the cache.
    pub async fn refresh(&self) -> CacheLookup {
        self.cache
            .resolve(QueryKey::Page(self.signature.clone()))
            .await
    }

    /// Changing the search text invalidates the notion of "current page"
    /// under the old filter, so the page resets to 1.
    pub async fn set_search_text(&mut self, search: impl Into<String>) -> CacheLookup {
        let search = search.into();
        if search != self.signature.search {
            self.known_total_pages = 1;
        }
        self.signature.search = search;
        self.signature.page = 1;
        self.refresh().await
    }

    /// Same page-reset rule as [`Self::set_search_text`].
    pub async fn set_status_filter(&mut self, status: StatusFilter) -> CacheLookup {
        if status != self.signature.status {
            self.known_total_pages = 1;
        }
        self.signature.status = status;
        self.signature.page = 1;
        self.refresh().await
    }

    /// Rejected (no-op, `None`) when `page` falls outside the bounds of the
    /// most recent page result for the active filter.
    pub async fn set_page(&mut self, page: u32) -> Option<CacheLookup> {
        if page < 1 || page > self.known_total_pages {
            debug!(
                page,
                total_pages = self.known_total_pages,
                "rejecting out-of-range page"
            );
            return None;
        }
        self.signature.page = page;
        Some(self.refresh().await)
    }

    /// Feed a delivered page result back so page bounds track the server.
    /// Results for other filters are ignored.
    pub fn note_page_result(&mut self, result: &PageResult) {
        if let QueryKey::Page(signature) = &result.key {
            if signature.same_filter(&self.signature) {
                self.known_total_pages = result.total_pages.max(1);
            }
        }
    }
}
