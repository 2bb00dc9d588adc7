//! Paginated envelope and the list-state machine shared by every list view.
//!
//! The backend is the source of truth for `total` and `totalPages`. The list
//! state only clamps the current page against the last page count the backend
//! reported; it never derives bounds from locally held records.

use serde::{Deserialize, Serialize};

/// Uniform response envelope for every list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub total_pages: u32,
    pub page: u32,
}

impl<T> Paginated<T> {
    /// Map every record, keeping the pagination counters.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            total_pages: self.total_pages,
            page: self.page,
        }
    }

    /// An empty first page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            total_pages: 1,
            page: 1,
        }
    }

    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Envelope as it arrives on the wire, before normalization.
///
/// Some proxy deployments omit the counters; [`EnvelopeBody::normalize`]
/// fills them in from the data that is present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeBody<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl<T> EnvelopeBody<T> {
    /// Fill missing counters: `total = data.len()`, `totalPages = 1`,
    /// `page = requested page or 1`.
    #[must_use]
    pub fn normalize(self, requested_page: Option<u32>) -> Paginated<T> {
        let total = self.total.unwrap_or(self.data.len() as u64);
        Paginated {
            total,
            total_pages: self.total_pages.unwrap_or(1).max(1),
            page: self.page.or(requested_page).unwrap_or(1).max(1),
            data: self.data,
        }
    }
}

// =============================================================================
// Request parameters
// =============================================================================

/// Parameters for a list request. Absent fields are not sent at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub const fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Drop the search term (for endpoints that do not filter by text).
    #[must_use]
    pub fn without_search(mut self) -> Self {
        self.search = None;
        self
    }

    /// Drop the status filter (for endpoints that do not filter by status).
    #[must_use]
    pub fn without_status(mut self) -> Self {
        self.status = None;
        self
    }

    /// Query pairs in wire order: `status`, `page`, `per_page`, `search`.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

// =============================================================================
// List state machine
// =============================================================================

/// Page/search/status state of a list view.
///
/// Any change to the search text or status filter resets the page to 1, and
/// page moves are clamped to `[1, total_pages]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState {
    page: u32,
    per_page: u32,
    search: String,
    status_filter: Option<String>,
    total_pages: u32,
}

impl ListState {
    /// Fresh state on page 1 with an unknown (single) page count.
    #[must_use]
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            search: String::new(),
            status_filter: None,
            total_pages: 1,
        }
    }

    /// Start with a fixed status filter (e.g. the members view only lists
    /// active subscriptions).
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.set_status_filter(Some(status.into()));
        self
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub fn status_filter(&self) -> Option<&str> {
        self.status_filter.as_deref()
    }

    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Update the search text; resets to page 1 if it changed.
    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search != self.search {
            self.search = search;
            self.page = 1;
        }
    }

    /// Update the status filter; resets to page 1 if it changed.
    ///
    /// An empty string clears the filter.
    pub fn set_status_filter(&mut self, status: Option<String>) {
        let status = status.filter(|s| !s.is_empty());
        if status != self.status_filter {
            self.status_filter = status;
            self.page = 1;
        }
    }

    pub fn next_page(&mut self) {
        self.go_to(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to(self.page.saturating_sub(1));
    }

    /// Jump to a page, clamped to `[1, total_pages]`.
    pub fn go_to(&mut self, page: u32) {
        self.page = page.clamp(1, self.total_pages);
    }

    /// Adopt the backend's page count and re-clamp the current page.
    pub fn apply_response<T>(&mut self, response: &Paginated<T>) {
        self.total_pages = response.total_pages.max(1);
        self.page = self.page.clamp(1, self.total_pages);
    }

    /// Request parameters for the current state.
    #[must_use]
    pub fn params(&self) -> ListParams {
        ListParams {
            page: Some(self.page),
            per_page: Some(self.per_page),
            status: self.status_filter.clone(),
            search: Some(self.search.clone()).filter(|s| !s.is_empty()),
        }
    }
}

impl Default for ListState {
    fn default() -> Self {
        Self::new(20)
    }
}
