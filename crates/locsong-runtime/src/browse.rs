//! List pages with an in-page search box.
//!
//! A [`BrowseSession`] keeps two queries alive: the source's list and a
//! keyword search. Which one the view shows depends only on the debounced
//! keyword, so the two sources are never mixed.

use std::time::Duration;

use tokio::sync::watch;

use locsong_api::ophim::types::{MovieListData, MovieListParams, SearchData, SearchParams};
use locsong_api::CatalogService;
use locsong_core::debounce::Debouncer;
use locsong_core::query::{Query, QueryClient, QueryError, QueryObserver};

use crate::queries::{keyword_is_searchable, CatalogQueries};
use crate::sort::{decompose, DEFAULT_SORT};
use crate::text::title_case_slug;
use crate::view::{ListView, PageInfo, ViewSource, ViewStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 24;
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(400);

/// How a [`BrowseSession`] starts out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseOptions {
    pub page: u32,
    pub page_size: u32,
    pub sort: String,
    /// Only applies to named lists.
    pub category: Option<String>,
    pub debounce: Duration,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: DEFAULT_SORT.to_string(),
            category: None,
            debounce: SEARCH_DEBOUNCE,
        }
    }
}

impl BrowseOptions {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn sort(mut self, selector: &str) -> Self {
        self.sort = selector.to_string();
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }
}

/// Named lists and their catalog titles.
pub const LIST_TITLES: [(&str, &str); 9] = [
    ("phim-moi", "Phim Mới Cập Nhật"),
    ("phim-bo", "Phim Bộ"),
    ("phim-le", "Phim Lẻ"),
    ("tv-shows", "TV Shows"),
    ("hoat-hinh", "Hoạt Hình"),
    ("phim-chieu-rap", "Phim Chiếu Rạp"),
    ("phim-bo-dang-chieu", "Phim Bộ Đang Chiếu"),
    ("phim-bo-hoan-thanh", "Phim Bộ Hoàn Thành"),
    ("phim-sap-chieu", "Phim Sắp Chiếu"),
];

/// Title for a named list: its catalog name when known, else the slug in
/// title case.
pub fn list_title(slug: &str) -> String {
    LIST_TITLES
        .iter()
        .find(|(known, _)| *known == slug)
        .map(|(_, title)| title.to_string())
        .unwrap_or_else(|| title_case_slug(slug))
}

/// What a browse page lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseSource {
    List(String),
    Category(String),
    Country(String),
    Year(u32),
}

impl BrowseSource {
    /// Title used until the upstream one arrives.
    pub fn fallback_title(&self) -> String {
        match self {
            Self::List(slug) => list_title(slug),
            Self::Category(slug) | Self::Country(slug) => title_case_slug(slug),
            Self::Year(year) => format!("Phim năm {year}"),
        }
    }

    fn query<A: CatalogService + 'static>(
        &self,
        queries: &CatalogQueries<A>,
        params: &MovieListParams,
    ) -> Query<MovieListData> {
        match self {
            Self::List(slug) => queries.movie_list(slug, params),
            Self::Category(slug) => queries.movies_by_category(slug, params),
            Self::Country(slug) => queries.movies_by_country(slug, params),
            Self::Year(year) => queries.movies_by_year(*year, params),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseMode {
    List,
    Search,
}

pub struct BrowseSession<A> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    source: BrowseSource,
    page: u32,
    page_size: u32,
    sort: String,
    category: Option<String>,
    search_input: Debouncer<String>,
    search_changes: watch::Receiver<String>,
    keyword: String,
    list: QueryObserver<MovieListData>,
    found: QueryObserver<SearchData>,
}

impl<A: CatalogService + 'static> BrowseSession<A> {
    pub fn new(
        queries: CatalogQueries<A>,
        client: QueryClient,
        source: BrowseSource,
        page: u32,
    ) -> Self {
        Self::with_options(queries, client, source, BrowseOptions::page(page))
    }

    /// Open a session whose first list request already carries the given
    /// sort and category.
    pub fn with_options(
        queries: CatalogQueries<A>,
        client: QueryClient,
        source: BrowseSource,
        options: BrowseOptions,
    ) -> Self {
        let BrowseOptions {
            page,
            page_size,
            sort,
            category,
            debounce,
        } = options;
        let page = page.max(1);
        let page_size = page_size.max(1);
        let category = match source {
            BrowseSource::List(_) => category.filter(|c| !c.is_empty()),
            _ => None,
        };
        let search_input = Debouncer::new(String::new(), debounce);
        let search_changes = search_input.subscribe();

        let params = list_params(page, page_size, &sort, category.as_deref());
        let list = client.observe(&source.query(&queries, &params));
        let found = client.observe(&queries.search(&search_params("", page, page_size)));

        tracing::debug!(?source, page, "browse session opened");
        Self {
            queries,
            client,
            source,
            page,
            page_size,
            sort,
            category,
            search_input,
            search_changes,
            keyword: String::new(),
            list,
            found,
        }
    }

    pub fn source(&self) -> &BrowseSource {
        &self.source
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn sort(&self) -> &str {
        &self.sort
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Raw text in the search box, before debouncing.
    pub fn search_text(&self) -> &str {
        self.search_input.raw()
    }

    /// Debounced, trimmed keyword currently applied.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn mode(&self) -> BrowseMode {
        if keyword_is_searchable(&self.keyword) {
            BrowseMode::Search
        } else {
            BrowseMode::List
        }
    }

    // ── Inputs ───────────────────────────────────────────────────

    pub fn set_page(&mut self, page: u32) {
        let page = page.max(1);
        if page == self.page {
            return;
        }
        self.page = page;
        self.observe_list();
        self.observe_search();
    }

    /// Apply a sort selector such as `year_asc`.
    pub fn set_sort(&mut self, selector: &str) {
        if selector == self.sort {
            return;
        }
        self.sort = selector.to_string();
        self.observe_list();
    }

    /// Category filter. Only named lists take one; other sources already
    /// are a category, country or year.
    pub fn set_category(&mut self, category: Option<String>) {
        let category = category.filter(|c| !c.is_empty());
        if category == self.category {
            return;
        }
        self.category = category;
        if matches!(self.source, BrowseSource::List(_)) {
            self.observe_list();
        }
    }

    /// Type into the search box. The keyword applies after the quiet
    /// period; see [`changed`](Self::changed).
    pub fn set_search_text(&mut self, text: &str) {
        self.search_input.push(text.to_string());
    }

    /// Apply the typed keyword immediately.
    pub fn submit_search(&mut self) {
        self.search_input.flush();
        self.sync_keyword();
    }

    fn observe_list(&mut self) {
        let category = match self.source {
            BrowseSource::List(_) => self.category.as_deref(),
            _ => None,
        };
        let params = list_params(self.page, self.page_size, &self.sort, category);
        self.list = self.client.observe(&self.source.query(&self.queries, &params));
    }

    fn observe_search(&mut self) {
        let params = search_params(&self.keyword, self.page, self.page_size);
        self.found = self.client.observe(&self.queries.search(&params));
    }

    fn sync_keyword(&mut self) {
        let keyword = self.search_changes.borrow_and_update().trim().to_string();
        if keyword != self.keyword {
            tracing::debug!(keyword = %keyword, "browse keyword applied");
            self.keyword = keyword;
            self.observe_search();
        }
    }

    // ── Outputs ──────────────────────────────────────────────────

    pub fn view(&self) -> ListView {
        match self.mode() {
            BrowseMode::List => {
                let state = self.list.state();
                let status = ViewStatus::from_state(&state);
                let (title, items, page) = match state.data() {
                    Some(data) => (
                        Some(data.title_page.clone()).filter(|t| !t.is_empty()),
                        data.items.clone(),
                        PageInfo::from_pagination(&data.params.pagination, self.page),
                    ),
                    None => (None, Vec::new(), PageInfo::requested(self.page)),
                };
                ListView {
                    title: title.unwrap_or_else(|| self.source.fallback_title()),
                    items,
                    page,
                    status,
                    source: ViewSource::List,
                }
            }
            BrowseMode::Search => {
                let state = self.found.state();
                let status = ViewStatus::from_state(&state);
                let (items, page) = match state.data() {
                    Some(data) => (
                        data.items.clone(),
                        PageInfo::from_pagination(&data.params.pagination, self.page),
                    ),
                    None => (Vec::new(), PageInfo::requested(self.page)),
                };
                ListView {
                    title: format!("Kết quả: \"{}\"", self.keyword),
                    items,
                    page,
                    status,
                    source: ViewSource::Search,
                }
            }
        }
    }

    /// Wait for the next change to the keyword or to either query.
    pub async fn changed(&mut self) -> Result<(), QueryError> {
        let keyword_changed = tokio::select! {
            res = self.search_changes.changed() => {
                res.map_err(|_| QueryError::Disposed)?;
                true
            }
            res = self.list.changed() => {
                res?;
                false
            }
            res = self.found.changed() => {
                res?;
                false
            }
        };
        if keyword_changed {
            self.sync_keyword();
        }
        Ok(())
    }

    /// Wait until the active query has settled and return the view.
    pub async fn settled(&mut self) -> ListView {
        loop {
            self.sync_keyword();
            let settled = match self.mode() {
                BrowseMode::List => self.list.state().is_settled(),
                BrowseMode::Search => self.found.state().is_settled(),
            };
            if settled || self.changed().await.is_err() {
                return self.view();
            }
        }
    }
}

fn list_params(page: u32, limit: u32, sort: &str, category: Option<&str>) -> MovieListParams {
    let (sort_field, sort_type) = decompose(sort);
    MovieListParams {
        page: Some(page),
        limit: Some(limit),
        sort_field: Some(sort_field),
        sort_type: Some(sort_type),
        category: category.map(str::to_string),
        ..Default::default()
    }
}

fn search_params(keyword: &str, page: u32, limit: u32) -> SearchParams {
    SearchParams {
        keyword: keyword.to_string(),
        page: Some(page),
        limit: Some(limit),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use locsong_core::query::CacheConfig;

    use super::*;
    use crate::testing::FakeCatalog;

    fn open_session(
        api: &Arc<FakeCatalog>,
        source: BrowseSource,
    ) -> (BrowseSession<FakeCatalog>, QueryClient) {
        let client = QueryClient::new(CacheConfig::default());
        let queries = CatalogQueries::new(api.clone());
        (BrowseSession::new(queries, client.clone(), source, 1), client)
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_mode_by_default() {
        let api = Arc::new(FakeCatalog::default());
        let (mut session, _client) = open_session(&api, BrowseSource::List("phim-bo".into()));

        let view = session.settled().await;
        assert_eq!(view.source, ViewSource::List);
        assert_eq!(view.status, ViewStatus::Ready);
        assert_eq!(view.title, "Danh sách phim-bo");
        assert_eq!(view.items.len(), 24);
        assert_eq!(view.page.total_pages, 5);
        assert_eq!(api.calls("search:"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_title_when_upstream_is_blank() {
        let api = Arc::new(FakeCatalog::with_blank_titles());
        let (mut airing, _client) =
            open_session(&api, BrowseSource::List("phim-bo-dang-chieu".into()));
        assert_eq!(airing.settled().await.title, "Phim Bộ Đang Chiếu");

        let (mut unknown, _client) = open_session(&api, BrowseSource::List("phim-hay".into()));
        assert_eq!(unknown.settled().await.title, "Phim Hay");
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_burst_searches_once() {
        let api = Arc::new(FakeCatalog::default());
        let (mut session, _client) = open_session(&api, BrowseSource::Category("co-trang".into()));
        session.settled().await;

        for text in ["b", "ba", "bat"] {
            session.set_search_text(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(session.mode(), BrowseMode::List);
        }
        assert_eq!(session.search_text(), "bat");

        session.changed().await.unwrap();
        assert_eq!(session.keyword(), "bat");
        let view = session.settled().await;

        assert_eq!(view.source, ViewSource::Search);
        assert_eq!(view.title, "Kết quả: \"bat\"");
        assert_eq!(view.items[0].slug, "bat-0");
        assert_eq!(api.call_log().iter().filter(|c| c.starts_with("search:")).count(), 1);
        assert_eq!(api.calls("search:bat"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_keyword_stays_in_list_mode() {
        let api = Arc::new(FakeCatalog::default());
        let (mut session, _client) = open_session(&api, BrowseSource::Country("han-quoc".into()));

        session.set_search_text(" a ");
        session.submit_search();
        assert_eq!(session.keyword(), "a");

        let view = session.settled().await;
        assert_eq!(view.source, ViewSource::List);
        assert_eq!(api.calls("search:"), 0);

        // Clearing the box after a search goes back to the list.
        session.set_search_text("avatar");
        session.submit_search();
        assert_eq!(session.settled().await.source, ViewSource::Search);
        session.set_search_text("");
        session.submit_search();
        assert_eq!(session.view().source, ViewSource::List);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_change_fetches_new_key() {
        let api = Arc::new(FakeCatalog::default());
        let (mut session, client) = open_session(&api, BrowseSource::Year(2024));
        session.settled().await;

        session.set_page(2);
        let view = session.settled().await;
        assert_eq!(view.page.current, 2);
        assert_eq!(view.items[0].slug, "2024-p2-0");
        assert_eq!(api.calls("year:2024:1"), 1);
        assert_eq!(api.calls("year:2024:2"), 1);

        // Going back is served from cache.
        session.set_page(1);
        let view = session.settled().await;
        assert_eq!(view.items[0].slug, "2024-p1-0");
        assert_eq!(api.calls("year:2024:1"), 1);
        assert!(client.len() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sort_and_category_change_the_list_key() {
        let api = Arc::new(FakeCatalog::default());
        let (mut session, client) = open_session(&api, BrowseSource::List("phim-le".into()));
        session.settled().await;

        session.set_sort("year_asc");
        session.settled().await;
        session.set_category(Some("hanh-dong".into()));
        session.settled().await;

        assert_eq!(api.calls("list:phim-le:1"), 3);
        assert_eq!(session.sort(), "year_asc");
        assert_eq!(session.category(), Some("hanh-dong"));
        // Two unobserved list entries, one observed, plus the disabled search.
        assert_eq!(client.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_sort_and_category_fetch_once() {
        let api = Arc::new(FakeCatalog::default());
        let client = QueryClient::new(CacheConfig::default());
        let options = BrowseOptions::page(2)
            .sort("year_asc")
            .category(Some("hanh-dong".into()));
        let mut session = BrowseSession::with_options(
            CatalogQueries::new(api.clone()),
            client.clone(),
            BrowseSource::List("phim-le".into()),
            options,
        );

        let view = session.settled().await;
        assert_eq!(view.items[0].slug, "phim-le-p2-0");
        assert_eq!(session.sort(), "year_asc");
        assert_eq!(session.category(), Some("hanh-dong"));
        assert_eq!(api.calls("list:"), 1);
        assert_eq!(client.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_option_ignored_outside_lists() {
        let api = Arc::new(FakeCatalog::default());
        let session = BrowseSession::with_options(
            CatalogQueries::new(api.clone()),
            QueryClient::new(CacheConfig::default()),
            BrowseSource::Country("han-quoc".into()),
            BrowseOptions::default().category(Some("hanh-dong".into())),
        );
        assert_eq!(session.category(), None);
    }

    #[test]
    fn test_list_titles() {
        assert_eq!(list_title("phim-moi"), "Phim Mới Cập Nhật");
        assert_eq!(list_title("tv-shows"), "TV Shows");
        assert_eq!(list_title("phim-hay-nhat"), "Phim Hay Nhat");
        assert_eq!(BrowseSource::Year(2020).fallback_title(), "Phim năm 2020");
    }
}
