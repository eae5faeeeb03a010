use serde::Serialize;

use locsong_api::ophim::types::{MovieItem, Pagination};
use locsong_core::pagination::{page_range, PageSlot};
use locsong_core::query::{QueryState, QueryStatus};

/// Pages shown on each side of the current page in a pager.
pub const PAGER_DELTA: u32 = 2;

/// What a page should render, derived from its active query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ViewStatus {
    /// Guarded off, e.g. a keyword that is too short.
    Disabled,
    Loading,
    Ready,
    /// Showing cached data while a refresh runs.
    Refreshing,
    Error(String),
}

impl ViewStatus {
    pub fn from_state<T>(state: &QueryState<T>) -> Self {
        match state.status {
            QueryStatus::Disabled => Self::Disabled,
            QueryStatus::Error => Self::Error(
                state
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".into()),
            ),
            _ if state.data.is_none() => Self::Loading,
            _ if state.is_fetching => Self::Refreshing,
            _ => Self::Ready,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub current: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

impl PageInfo {
    /// Page info for a request of page `requested`, before data arrives.
    pub fn requested(requested: u32) -> Self {
        Self {
            current: requested.max(1),
            total_pages: 1,
            total_items: 0,
        }
    }

    pub fn from_pagination(pagination: &Pagination, requested: u32) -> Self {
        Self {
            current: requested.max(1),
            total_pages: pagination.total_pages(),
            total_items: pagination.total_items,
        }
    }

    pub fn slots(&self) -> Vec<PageSlot> {
        page_range(self.current, self.total_pages, PAGER_DELTA)
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }
}

/// Which query a [`ListView`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSource {
    List,
    Search,
}

/// A grid of titles with a pager. Same shape for list and search results.
#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    pub title: String,
    pub items: Vec<MovieItem>,
    pub page: PageInfo,
    pub status: ViewStatus,
    pub source: ViewSource,
}
