//! Page-level sessions over the catalog: query builders, list and search
//! browsing, the home feed and the watch page.

pub mod browse;
pub mod home;
pub mod queries;
pub mod search;
pub mod sort;
pub mod text;
pub mod view;
pub mod watch;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use locsong_api::ophim::types::{FilterListData, MovieDetailData};
use locsong_api::{CatalogService, OphimClient, OphimError};
use locsong_core::config::{AppConfig, CacheSettings};
use locsong_core::progress::{FileStore, KeyValueStore, WatchProgressEntry, WatchProgressStore};
use locsong_core::query::{CacheConfig, QueryClient, QueryError, QueryState, QueryStatus};

pub use browse::{BrowseMode, BrowseOptions, BrowseSession, BrowseSource};
pub use home::{HeroRotation, HomeFeed, HomeView, Showcase};
pub use queries::{CatalogQueries, FilterKind};
pub use search::{SearchPage, SearchSuggestions, Suggestion};
pub use view::{ListView, PageInfo, ViewSource, ViewStatus};
pub use watch::{SharedProgress, WatchPage, WatchSession, WatchView};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Cache retention from the `[cache]` config section.
pub fn cache_config(settings: &CacheSettings) -> CacheConfig {
    CacheConfig {
        gc_time: Duration::from_secs(settings.gc_time_secs),
        gc_interval: Duration::from_secs(settings.gc_interval_secs),
        max_entries: settings.max_entries,
    }
}

/// Shared services for every page: one catalog client, one query cache and
/// one progress store.
pub struct Runtime<A = OphimClient> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    progress: SharedProgress,
    config: Arc<RwLock<AppConfig>>,
}

impl Runtime<OphimClient> {
    /// Build the live runtime: OPhim over HTTP, progress in the data dir.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: AppConfig) -> Result<Self, RuntimeError> {
        let api = OphimClient::new(
            &config.api.base_url,
            &config.api.api_version,
            config.api.timeout(),
        )
        .map_err(|e| RuntimeError::Http(e.to_string()))?;
        let backend: Box<dyn KeyValueStore> = Box::new(FileStore::new(AppConfig::data_dir()));
        Ok(Self::with_parts(Arc::new(api), config, backend))
    }
}

impl<A: CatalogService + 'static> Runtime<A> {
    pub fn with_parts(api: Arc<A>, config: AppConfig, backend: Box<dyn KeyValueStore>) -> Self {
        let client = QueryClient::init(cache_config(&config.cache));
        let progress = Arc::new(WatchProgressStore::with_config(backend, &config.progress));
        tracing::debug!(base_url = %config.api.base_url, "runtime ready");
        Self {
            queries: CatalogQueries::new(api),
            client,
            progress,
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn queries(&self) -> &CatalogQueries<A> {
        &self.queries
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn progress(&self) -> &SharedProgress {
        &self.progress
    }

    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    pub async fn update_config(&self, new_config: AppConfig) -> Result<(), RuntimeError> {
        new_config
            .save()
            .map_err(|e| RuntimeError::Config(e.to_string()))?;
        *self.config.write().await = new_config;
        Ok(())
    }

    // ── Pages ────────────────────────────────────────────────────

    pub fn home(&self) -> HomeFeed<A> {
        HomeFeed::new(self.queries.clone(), self.client.clone())
    }

    /// Browse options seeded from the `[browse]` config section.
    pub async fn browse_options(&self, page: u32) -> BrowseOptions {
        let browse = self.config.read().await.browse.clone();
        BrowseOptions {
            page,
            page_size: browse.page_size.max(1),
            debounce: browse.search_debounce(),
            ..BrowseOptions::default()
        }
    }

    pub fn browse(&self, source: BrowseSource, options: BrowseOptions) -> BrowseSession<A> {
        BrowseSession::with_options(self.queries.clone(), self.client.clone(), source, options)
    }

    pub fn search(&self, keyword: &str, page: u32) -> SearchPage<A> {
        SearchPage::new(self.queries.clone(), self.client.clone(), keyword, page)
    }

    pub async fn suggestions(&self) -> SearchSuggestions<A> {
        let delay = self.config.read().await.browse.search_debounce();
        SearchSuggestions::with_delay(self.queries.clone(), self.client.clone(), delay)
    }

    pub async fn watch(&self, slug: &str) -> WatchSession<A> {
        let cdn_base = self.config.read().await.api.cdn_image_url.clone();
        WatchSession::new(
            self.queries.clone(),
            self.client.clone(),
            self.progress.clone(),
            slug,
        )
        .with_cdn_base(cdn_base)
    }

    // ── One-shot reads ───────────────────────────────────────────

    pub async fn filters(&self, kind: FilterKind) -> Result<Arc<FilterListData>, RuntimeError> {
        let state = self.client.fetch(&self.queries.filters(kind)).await;
        into_data(state, &format!("{kind:?}"))
    }

    pub async fn detail(&self, slug: &str) -> Result<Arc<MovieDetailData>, RuntimeError> {
        let state = self.client.fetch(&self.queries.movie_detail(slug)).await;
        into_data(state, slug)
    }

    // ── History ──────────────────────────────────────────────────

    /// Watch history, most recent first.
    pub fn history(&self) -> Vec<WatchProgressEntry> {
        self.progress.recent()
    }

    pub fn clear_history(&self, slug: &str) {
        self.progress.clear(slug);
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Mark every cached catalog response stale; observed ones refetch.
    pub fn refresh(&self) -> usize {
        self.client.invalidate(&queries::root_key())
    }

    /// Stop background work and drop the cache.
    pub fn shutdown(&self) {
        self.client.dispose();
    }
}

fn into_data<T>(state: QueryState<T>, what: &str) -> Result<Arc<T>, RuntimeError> {
    if let Some(data) = state.data {
        return Ok(data);
    }
    match state.error {
        Some(e) if e.source_as::<OphimError>().is_some_and(OphimError::is_not_found) => {
            Err(RuntimeError::NotFound(what.to_string()))
        }
        Some(e) => Err(e.into()),
        None if state.status == QueryStatus::Disabled => {
            Err(RuntimeError::NotFound(what.to_string()))
        }
        None => Err(RuntimeError::Query(QueryError::Aborted {
            key: what.to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use locsong_core::progress::{MemoryStore, WatchPosition};

    use super::*;
    use crate::testing::FakeCatalog;

    fn runtime(api: FakeCatalog) -> (Runtime<FakeCatalog>, Arc<FakeCatalog>) {
        let api = Arc::new(api);
        let backend: Box<dyn KeyValueStore> = Box::new(MemoryStore::default());
        (
            Runtime::with_parts(api.clone(), AppConfig::default(), backend),
            api,
        )
    }

    #[test]
    fn test_cache_config_from_settings() {
        let config = cache_config(&AppConfig::default().cache);
        assert_eq!(config.gc_time, Duration::from_secs(600));
        assert_eq!(config.gc_interval, Duration::from_secs(60));
        assert_eq!(config.max_entries, 256);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_not_found() {
        let (runtime, api) = runtime(FakeCatalog::with_missing("ghost"));

        let err = runtime.detail("ghost").await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(ref slug) if slug == "ghost"));
        assert_eq!(api.calls("detail:ghost"), 1);

        let err = runtime.detail("").await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
        assert_eq!(api.calls("detail:"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_are_cached() {
        let (runtime, api) = runtime(FakeCatalog::default());

        let categories = runtime.filters(FilterKind::Categories).await.unwrap();
        assert_eq!(categories.items[1].slug, "co-trang");
        runtime.filters(FilterKind::Categories).await.unwrap();
        assert_eq!(api.calls("categories"), 1);

        let years = runtime.filters(FilterKind::Years).await.unwrap();
        assert_eq!(years.items[0].name, "2024");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_records_history() {
        let (runtime, _api) = runtime(FakeCatalog::default());

        let mut session = runtime.watch("vu-an").await;
        session.settled().await;
        session.select_episode(1);

        let history = runtime.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].slug, "vu-an");
        assert_eq!(history[0].episode_name, "2");

        runtime.clear_history("vu-an");
        assert!(runtime.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_is_newest_first() {
        let (runtime, _api) = runtime(FakeCatalog::default());
        for (slug, at) in [("a", 1_000), ("b", 3_000), ("c", 2_000)] {
            runtime.progress().save_at(
                WatchPosition {
                    slug: slug.into(),
                    server_index: 0,
                    episode_index: 0,
                    episode_name: "1".into(),
                    server_name: "Vietsub #1".into(),
                },
                now_ms() - 10_000 + at,
            );
        }
        let slugs: Vec<_> = runtime.history().into_iter().map(|e| e.slug).collect();
        assert_eq!(slugs, ["b", "c", "a"]);
    }

    fn now_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disposes_cache() {
        let (runtime, _api) = runtime(FakeCatalog::default());
        runtime.filters(FilterKind::Countries).await.unwrap();
        assert!(!runtime.client().is_empty());

        runtime.shutdown();
        assert!(runtime.client().is_disposed());
        assert!(matches!(
            runtime.filters(FilterKind::Countries).await,
            Err(RuntimeError::Query(QueryError::Disposed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_browse_uses_configured_page_size() {
        let (runtime, _api) = runtime(FakeCatalog::default());
        let options = runtime.browse_options(1).await;
        assert_eq!(options.debounce, Duration::from_millis(400));
        let mut session = runtime.browse(BrowseSource::List("phim-moi".into()), options);
        let view = session.settled().await;
        assert_eq!(view.items.len(), 24);
        assert_eq!(view.title, "Danh sách phim-moi");
    }
}
