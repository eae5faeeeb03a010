//! Full search results page and the navbar suggestion box.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use locsong_api::ophim::types::{MovieItem, SearchData, SearchParams};
use locsong_api::CatalogService;
use locsong_core::debounce::Debouncer;
use locsong_core::query::{QueryClient, QueryError, QueryObserver};

use crate::browse::{DEFAULT_PAGE_SIZE, SEARCH_DEBOUNCE};
use crate::queries::{keyword_is_searchable, CatalogQueries};
use crate::view::{ListView, PageInfo, ViewSource, ViewStatus};

/// Suggestions shown under the navbar search box.
pub const SUGGESTION_LIMIT: u32 = 8;

/// The results page for a keyword from the address bar.
pub struct SearchPage<A> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    keyword: String,
    page: u32,
    limit: u32,
    results: QueryObserver<SearchData>,
}

impl<A: CatalogService + 'static> SearchPage<A> {
    pub fn new(queries: CatalogQueries<A>, client: QueryClient, keyword: &str, page: u32) -> Self {
        let keyword = keyword.trim().to_string();
        let page = page.max(1);
        let query = queries.search(&params(&keyword, page, DEFAULT_PAGE_SIZE));
        let results = client.observe(&query);
        Self {
            queries,
            client,
            keyword,
            page,
            limit: DEFAULT_PAGE_SIZE,
            results,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn set_page(&mut self, page: u32) {
        let page = page.max(1);
        if page != self.page {
            self.page = page;
            self.observe();
        }
    }

    pub fn set_keyword(&mut self, keyword: &str) {
        let keyword = keyword.trim();
        if keyword != self.keyword {
            self.keyword = keyword.to_string();
            self.page = 1;
            self.observe();
        }
    }

    fn observe(&mut self) {
        let params = params(&self.keyword, self.page, self.limit);
        self.results = self.client.observe(&self.queries.search(&params));
    }

    /// A keyword under two characters yields a `Disabled` view with a
    /// prompt instead of results.
    pub fn view(&self) -> ListView {
        let state = self.results.state();
        let status = ViewStatus::from_state(&state);
        let (items, page) = match state.data() {
            Some(data) => (
                data.items.clone(),
                PageInfo::from_pagination(&data.params.pagination, self.page),
            ),
            None => (Vec::new(), PageInfo::requested(self.page)),
        };
        let title = if keyword_is_searchable(&self.keyword) {
            format!("Kết quả: \"{}\"", self.keyword)
        } else {
            "Nhập ít nhất 2 ký tự để tìm kiếm".to_string()
        };
        ListView {
            title,
            items,
            page,
            status,
            source: ViewSource::Search,
        }
    }

    pub async fn changed(&mut self) -> Result<(), QueryError> {
        self.results.changed().await
    }

    pub async fn settled(&mut self) -> ListView {
        self.results.settled().await;
        self.view()
    }
}

/// One row in the suggestion dropdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub slug: String,
    pub name: String,
    pub origin_name: String,
    pub year: u32,
    pub thumb_url: String,
}

impl From<&MovieItem> for Suggestion {
    fn from(item: &MovieItem) -> Self {
        Self {
            slug: item.slug.clone(),
            name: item.name.clone(),
            origin_name: item.origin_name.clone(),
            year: item.year,
            thumb_url: item.thumb_url.clone(),
        }
    }
}

/// Debounced navbar search.
pub struct SearchSuggestions<A> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    input: Debouncer<String>,
    input_changes: watch::Receiver<String>,
    keyword: String,
    results: QueryObserver<SearchData>,
}

impl<A: CatalogService + 'static> SearchSuggestions<A> {
    pub fn new(queries: CatalogQueries<A>, client: QueryClient) -> Self {
        Self::with_delay(queries, client, SEARCH_DEBOUNCE)
    }

    pub fn with_delay(queries: CatalogQueries<A>, client: QueryClient, delay: Duration) -> Self {
        let input = Debouncer::new(String::new(), delay);
        let input_changes = input.subscribe();
        let results = client.observe(&queries.search(&params("", 1, SUGGESTION_LIMIT)));
        Self {
            queries,
            client,
            input,
            input_changes,
            keyword: String::new(),
            results,
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.input.push(text.to_string());
    }

    pub fn text(&self) -> &str {
        self.input.raw()
    }

    /// Debounced, trimmed keyword the suggestions belong to.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Whether suggestions are being fetched for a searchable keyword.
    pub fn is_searching(&self) -> bool {
        keyword_is_searchable(&self.keyword) && self.results.state().is_loading()
    }

    /// Empty below two characters.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        if !keyword_is_searchable(&self.keyword) {
            return Vec::new();
        }
        self.results
            .state()
            .data()
            .map(|data| data.items.iter().map(Suggestion::from).collect())
            .unwrap_or_default()
    }

    fn sync_keyword(&mut self) {
        let keyword = self.input_changes.borrow_and_update().trim().to_string();
        if keyword != self.keyword {
            self.keyword = keyword;
            let params = params(&self.keyword, 1, SUGGESTION_LIMIT);
            self.results = self.client.observe(&self.queries.search(&params));
        }
    }

    pub async fn changed(&mut self) -> Result<(), QueryError> {
        let input_changed = tokio::select! {
            res = self.input_changes.changed() => {
                res.map_err(|_| QueryError::Disposed)?;
                true
            }
            res = self.results.changed() => {
                res?;
                false
            }
        };
        if input_changed {
            self.sync_keyword();
        }
        Ok(())
    }

    /// Wait for the pending keyword to apply and its results to settle.
    pub async fn settled(&mut self) -> Vec<Suggestion> {
        loop {
            self.sync_keyword();
            let waiting = self.input.raw().trim() != self.keyword
                || !self.results.state().is_settled();
            if !waiting || self.changed().await.is_err() {
                return self.suggestions();
            }
        }
    }
}

fn params(keyword: &str, page: u32, limit: u32) -> SearchParams {
    SearchParams {
        keyword: keyword.to_string(),
        page: Some(page),
        limit: Some(limit),
    }
}
