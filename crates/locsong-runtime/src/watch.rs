//! Watch page: player, server and episode pickers, cast and related titles.

use std::sync::Arc;

use serde::Serialize;

use locsong_api::image::{build_tmdb_image_url, normalize_image_url, CDN_BASE};
use locsong_api::ophim::types::{
    Episode, FilterItem, ImageKind, MovieDetail, MovieDetailData, MovieImagesData, MovieItem,
    MovieListData, MovieListParams, MoviePeople, MoviePeoplesData,
};
use locsong_api::{CatalogService, OphimError};
use locsong_core::progress::{KeyValueStore, WatchPosition, WatchProgressStore};
use locsong_core::query::{QueryClient, QueryError, QueryObserver, QueryStatus};

use crate::queries::CatalogQueries;
use crate::text::{format_rating, strip_html};

/// Progress store shared by every watch session.
pub type SharedProgress = Arc<WatchProgressStore<Box<dyn KeyValueStore>>>;

/// Episodes listed before the rest are folded away.
pub const EPISODE_COLLAPSE: usize = 30;
pub const RELATED_LIMIT: u32 = 9;
pub const RELATED_SHOWN: usize = 8;
pub const RELATED_FALLBACK_CATEGORY: &str = "hanh-dong";
pub const POSTER_SIZE: &str = "w500";

#[derive(Debug, Clone, Serialize)]
pub struct ServerTab {
    pub index: usize,
    pub name: String,
    pub episode_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeTab {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchView {
    pub slug: String,
    pub name: String,
    pub origin_name: String,
    pub year: u32,
    pub quality: String,
    pub lang: String,
    pub episode_current: String,
    pub categories: Vec<FilterItem>,
    pub servers: Vec<ServerTab>,
    pub server_index: usize,
    pub episodes: Vec<EpisodeTab>,
    /// Episodes folded away behind a "show more" toggle.
    pub hidden_episodes: usize,
    pub episode_index: usize,
    pub current: Option<Episode>,
    pub rating: Option<String>,
    pub description: String,
    pub poster_url: String,
    pub related: Vec<MovieItem>,
    pub actors: Vec<MoviePeople>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "view", rename_all = "snake_case")]
pub enum WatchPage {
    Loading,
    NotFound,
    Error(String),
    Ready(Box<WatchView>),
}

pub struct WatchSession<A> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    progress: SharedProgress,
    slug: String,
    cdn_base: String,
    server_index: usize,
    episode_index: usize,
    expanded: bool,
    detail: QueryObserver<MovieDetailData>,
    images: QueryObserver<MovieImagesData>,
    peoples: QueryObserver<MoviePeoplesData>,
    related: Option<QueryObserver<MovieListData>>,
}

impl<A: CatalogService + 'static> WatchSession<A> {
    /// Open a title, resuming from saved progress when there is any.
    pub fn new(
        queries: CatalogQueries<A>,
        client: QueryClient,
        progress: SharedProgress,
        slug: &str,
    ) -> Self {
        let (server_index, episode_index) = match progress.get(slug) {
            Some(saved) => {
                tracing::debug!(
                    slug,
                    server = saved.server_index,
                    episode = saved.episode_index,
                    "resuming watch progress"
                );
                (saved.server_index, saved.episode_index)
            }
            None => (0, 0),
        };

        let detail = client.observe(&queries.movie_detail(slug));
        let images = client.observe(&queries.movie_images(slug));
        let peoples = client.observe(&queries.movie_peoples(slug));

        let mut session = Self {
            queries,
            client,
            progress,
            slug: slug.to_string(),
            cdn_base: CDN_BASE.to_string(),
            server_index,
            episode_index,
            expanded: false,
            detail,
            images,
            peoples,
            related: None,
        };
        session.attach_related();
        session
    }

    /// Base used for relative poster paths.
    pub fn with_cdn_base(mut self, cdn_base: impl Into<String>) -> Self {
        self.cdn_base = cdn_base.into();
        self
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Pick a server. The episode goes back to the first one.
    pub fn select_server(&mut self, index: usize) {
        let servers = self.server_count();
        self.server_index = match servers {
            Some(count) if count > 0 => index.min(count - 1),
            _ => index,
        };
        self.episode_index = 0;
        self.save_progress();
    }

    /// Pick an episode on the current server, clamped to its list.
    pub fn select_episode(&mut self, index: usize) {
        self.episode_index = index;
        if let Some(detail) = self.detail.state().data() {
            let (_, episode) = clamp(&detail.item, self.server_index, index);
            self.episode_index = episode;
        }
        self.save_progress();
    }

    /// Show every episode instead of the first [`EPISODE_COLLAPSE`].
    pub fn expand_episodes(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    fn server_count(&self) -> Option<usize> {
        self.detail
            .state()
            .data()
            .map(|detail| detail.item.episodes.len())
    }

    fn save_progress(&self) {
        let state = self.detail.state();
        let Some(detail) = state.data() else {
            return;
        };
        let (server_index, episode_index) =
            clamp(&detail.item, self.server_index, self.episode_index);
        let Some(server) = detail.item.episodes.get(server_index) else {
            return;
        };
        let Some(episode) = server.server_data.get(episode_index) else {
            return;
        };
        self.progress.save(WatchPosition {
            slug: self.slug.clone(),
            server_index,
            episode_index,
            episode_name: episode.name.clone(),
            server_name: server.server_name.clone(),
        });
    }

    /// Related titles come from the first category, so they wait for the
    /// detail.
    fn attach_related(&mut self) {
        if self.related.is_some() {
            return;
        }
        let state = self.detail.state();
        let Some(detail) = state.data() else {
            return;
        };
        let category = detail
            .item
            .category
            .first()
            .map(|c| c.slug.as_str())
            .filter(|slug| !slug.is_empty())
            .unwrap_or(RELATED_FALLBACK_CATEGORY);
        let params = MovieListParams {
            limit: Some(RELATED_LIMIT),
            ..Default::default()
        };
        let query = self.queries.movies_by_category(category, &params);
        self.related = Some(self.client.observe(&query));
    }

    pub fn page(&self) -> WatchPage {
        let state = self.detail.state();
        if state.status == QueryStatus::Error && state.data.is_none() {
            return match &state.error {
                Some(e) if is_not_found(e) => WatchPage::NotFound,
                Some(e) => WatchPage::Error(e.to_string()),
                None => WatchPage::Error("unknown error".into()),
            };
        }
        match state.data() {
            Some(detail) => WatchPage::Ready(Box::new(self.view(&detail.item))),
            None if state.status == QueryStatus::Disabled => WatchPage::NotFound,
            None => WatchPage::Loading,
        }
    }

    fn view(&self, movie: &MovieDetail) -> WatchView {
        let (server_index, episode_index) = clamp(movie, self.server_index, self.episode_index);
        let all_episodes = movie
            .episodes
            .get(server_index)
            .map(|s| s.server_data.as_slice())
            .unwrap_or_default();
        let shown = if self.expanded {
            all_episodes.len()
        } else {
            all_episodes.len().min(EPISODE_COLLAPSE)
        };

        let related = self
            .related
            .as_ref()
            .and_then(|observer| observer.state().data.clone())
            .map(|data| {
                data.items
                    .iter()
                    .filter(|item| item.slug != self.slug)
                    .take(RELATED_SHOWN)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let actors = self
            .peoples
            .state()
            .data()
            .map(|data| {
                data.peoples
                    .iter()
                    .filter(|p| p.character.as_deref().is_some_and(|c| !c.is_empty()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        WatchView {
            slug: movie.slug.clone(),
            name: movie.name.clone(),
            origin_name: movie.origin_name.clone(),
            year: movie.year,
            quality: movie.quality.clone(),
            lang: movie.lang.clone(),
            episode_current: movie.episode_current.clone(),
            categories: movie.category.clone(),
            servers: movie
                .episodes
                .iter()
                .enumerate()
                .map(|(index, server)| ServerTab {
                    index,
                    name: server.server_name.clone(),
                    episode_count: server.server_data.len(),
                })
                .collect(),
            server_index,
            episodes: all_episodes[..shown]
                .iter()
                .enumerate()
                .map(|(index, ep)| EpisodeTab {
                    index,
                    name: ep.name.clone(),
                })
                .collect(),
            hidden_episodes: all_episodes.len() - shown,
            episode_index,
            current: all_episodes.get(episode_index).cloned(),
            rating: format_rating(movie),
            description: strip_html(&movie.content),
            poster_url: self.poster_url(movie),
            related,
            actors,
        }
    }

    /// TMDB poster when the images payload yields an absolute URL, else the
    /// catalog poster on the CDN.
    fn poster_url(&self, movie: &MovieDetail) -> String {
        let tmdb = self.images.state().data().and_then(|images| {
            let poster = images.first_of(ImageKind::Poster)?;
            let url = build_tmdb_image_url(
                &images.image_sizes,
                ImageKind::Poster,
                &poster.file_path,
                Some(POSTER_SIZE),
            );
            url.starts_with("http").then_some(url)
        });
        tmdb.unwrap_or_else(|| normalize_image_url(&movie.poster_url, &self.cdn_base))
    }

    /// Wait for the next change to any of the page's queries.
    pub async fn changed(&mut self) -> Result<(), QueryError> {
        let related = &mut self.related;
        let related = async move {
            match related {
                Some(observer) => observer.changed().await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            res = self.detail.changed() => res?,
            res = self.images.changed() => res?,
            res = self.peoples.changed() => res?,
            res = related => res?,
        }
        self.attach_related();
        Ok(())
    }

    /// Wait until every query has settled and return the page.
    pub async fn settled(&mut self) -> WatchPage {
        self.detail.settled().await;
        self.attach_related();
        self.images.settled().await;
        self.peoples.settled().await;
        if let Some(related) = &mut self.related {
            related.settled().await;
        }
        self.page()
    }
}

fn is_not_found(error: &QueryError) -> bool {
    error
        .source_as::<OphimError>()
        .is_some_and(OphimError::is_not_found)
}

/// Clamp a server and episode index to what the title actually has.
fn clamp(movie: &MovieDetail, server_index: usize, episode_index: usize) -> (usize, usize) {
    let server_index = server_index.min(movie.episodes.len().saturating_sub(1));
    let episodes = movie
        .episodes
        .get(server_index)
        .map_or(0, |s| s.server_data.len());
    (server_index, episode_index.min(episodes.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use locsong_core::progress::MemoryStore;
    use locsong_core::query::CacheConfig;

    use super::*;
    use crate::testing::FakeCatalog;

    fn progress() -> SharedProgress {
        let backend: Box<dyn KeyValueStore> = Box::new(MemoryStore::default());
        Arc::new(WatchProgressStore::new(backend))
    }

    fn session(
        api: &Arc<FakeCatalog>,
        progress: &SharedProgress,
        slug: &str,
    ) -> WatchSession<FakeCatalog> {
        WatchSession::new(
            CatalogQueries::new(api.clone()),
            QueryClient::new(CacheConfig::default()),
            progress.clone(),
            slug,
        )
    }

    fn ready(page: WatchPage) -> WatchView {
        match page {
            WatchPage::Ready(view) => *view,
            other => panic!("expected a ready page, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_title_renders_not_found_once() {
        let api = Arc::new(FakeCatalog::with_missing("ghost"));
        let progress = progress();
        let mut session = session(&api, &progress, "ghost");

        assert!(matches!(session.settled().await, WatchPage::NotFound));
        assert!(matches!(session.page(), WatchPage::NotFound));
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        assert!(matches!(session.settled().await, WatchPage::NotFound));
        assert_eq!(api.calls("detail:ghost"), 1);
        assert_eq!(api.calls("category:"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_view() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        let mut session = session(&api, &progress, "vu-an");

        let view = ready(session.settled().await);
        assert_eq!(view.name, "Phim vu-an");
        assert_eq!(view.rating.as_deref(), Some("8.1"));
        assert_eq!(view.description, "Một vụ án mới.");
        assert_eq!(view.poster_url, "https://image.tmdb.org/t/p/w500/poster.jpg");
        assert_eq!(view.servers.len(), 2);
        assert_eq!(view.servers[1].name, "Thuyết Minh #1");
        assert_eq!(view.episodes.len(), 3);
        assert_eq!(view.hidden_episodes, 0);
        assert_eq!(
            view.current.as_ref().map(|e| e.link_embed.as_str()),
            Some("https://embed/v1/1")
        );
        let actors: Vec<_> = view.actors.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(actors, ["Diễn viên A", "Diễn viên C"]);
        assert_eq!(view.related.len(), RELATED_SHOWN);
        assert_eq!(api.calls("category:co-trang"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_related_excludes_current_title() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        let mut session = session(&api, &progress, "co-trang-p1-3");

        let view = ready(session.settled().await);
        assert_eq!(view.related.len(), RELATED_SHOWN);
        assert!(view.related.iter().all(|m| m.slug != "co-trang-p1-3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_server_resets_episode_and_saves() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        let mut session = session(&api, &progress, "vu-an");
        session.settled().await;

        session.select_episode(2);
        assert_eq!(ready(session.page()).episode_index, 2);

        session.select_server(1);
        let view = ready(session.page());
        assert_eq!(view.server_index, 1);
        assert_eq!(view.episode_index, 0);
        assert_eq!(
            view.current.map(|e| e.link_m3u8),
            Some("https://m3u8/tm/1".to_string())
        );

        let saved = progress.get("vu-an").unwrap();
        assert_eq!(saved.server_index, 1);
        assert_eq!(saved.episode_index, 0);
        assert_eq!(saved.server_name, "Thuyết Minh #1");
        assert_eq!(saved.episode_name, "1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_episode_index_is_clamped() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        let mut session = session(&api, &progress, "vu-an");
        session.settled().await;

        session.select_episode(10);
        assert_eq!(ready(session.page()).episode_index, 2);
        assert_eq!(progress.get("vu-an").unwrap().episode_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_saved_progress() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        progress.save(WatchPosition {
            slug: "vu-an".into(),
            server_index: 1,
            episode_index: 1,
            episode_name: "2".into(),
            server_name: "Thuyết Minh #1".into(),
        });

        let mut session = session(&api, &progress, "vu-an");
        let view = ready(session.settled().await);
        assert_eq!(view.server_index, 1);
        assert_eq!(view.episode_index, 1);
        assert_eq!(
            view.current.map(|e| e.link_embed),
            Some("https://embed/tm/2".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_saved_progress_is_clamped() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        progress.save(WatchPosition {
            slug: "vu-an".into(),
            server_index: 5,
            episode_index: 9,
            episode_name: "10".into(),
            server_name: "Gone".into(),
        });

        let mut session = session(&api, &progress, "vu-an");
        let view = ready(session.settled().await);
        assert_eq!((view.server_index, view.episode_index), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_slug_is_not_found_without_fetching() {
        let api = Arc::new(FakeCatalog::default());
        let progress = progress();
        let mut session = session(&api, &progress, "");
        assert!(matches!(session.settled().await, WatchPage::NotFound));
        assert!(api.call_log().is_empty());
    }
}
