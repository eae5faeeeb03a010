//! Landing page: hero banner, top 10, genre shortcuts and list rows.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use locsong_api::image::{normalize_image_url, CDN_BASE};
use locsong_api::ophim::types::{
    HomeData, MovieDetailData, MovieItem, MovieListData, MovieListParams,
};
use locsong_api::CatalogService;
use locsong_core::query::{QueryClient, QueryObserver, QueryState};

use crate::queries::CatalogQueries;
use crate::text::{format_rating, strip_html};
use crate::view::ViewStatus;

/// Titles per home row.
pub const ROW_LIMIT: u32 = 14;
pub const TOP10_LIMIT: u32 = 10;
pub const TOP10_SLUG: &str = "phim-bo";
pub const HERO_SLIDES: usize = 5;
pub const HERO_INTERVAL: Duration = Duration::from_secs(5);

pub const SHOWCASE_SLUG: &str = "hoat-hinh";
pub const SHOWCASE_LIMIT: u32 = 12;

/// Rows below the hero, in display order.
pub const HOME_ROWS: [(&str, &str); 4] = [
    ("phim-bo", "Phim Bộ"),
    ("phim-le", "Phim Lẻ"),
    ("hoat-hinh", "Hoạt Hình"),
    ("tv-shows", "TV Shows"),
];

/// Genre tiles. Each links to a category page.
pub const GENRE_SHORTCUTS: [(&str, &str); 12] = [
    ("Hành Động", "hanh-dong"),
    ("Tình Cảm", "tinh-cam"),
    ("Kinh Dị", "kinh-di"),
    ("Hài Hước", "hai-huoc"),
    ("Viễn Tưởng", "vien-tuong"),
    ("Cổ Trang", "co-trang"),
    ("Hoạt Hình", "hoat-hinh"),
    ("Chiếu Rạp", "chieu-rap"),
    ("Tâm Lý", "tam-ly"),
    ("Thái Lan", "thai-lan"),
    ("Hàn Quốc", "han-quoc"),
    ("Sitcom", "sitcom"),
];

fn first_page(limit: u32) -> MovieListParams {
    MovieListParams::page(1, limit)
}

fn items_of(state: &QueryState<MovieListData>) -> Vec<MovieItem> {
    state.data().map(|d| d.items.clone()).unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub slug: String,
    pub title: String,
    pub items: Vec<MovieItem>,
    pub status: ViewStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub cdn_base: String,
    pub hero: Vec<MovieItem>,
    pub top10: Vec<MovieItem>,
    /// Latest updates straight from the home payload.
    pub new_releases: RowView,
    pub rows: Vec<RowView>,
}

pub struct HomeFeed<A> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    home: QueryObserver<HomeData>,
    top10: QueryObserver<MovieListData>,
    rows: Vec<(&'static str, &'static str, QueryObserver<MovieListData>)>,
}

impl<A: CatalogService + 'static> HomeFeed<A> {
    pub fn new(queries: CatalogQueries<A>, client: QueryClient) -> Self {
        let home = client.observe(&queries.home());
        let top10 = client.observe(&queries.movie_list(TOP10_SLUG, &first_page(TOP10_LIMIT)));
        let rows = HOME_ROWS
            .iter()
            .map(|&(slug, title)| {
                let query = queries.movie_list(slug, &first_page(ROW_LIMIT));
                (slug, title, client.observe(&query))
            })
            .collect();
        Self {
            queries,
            client,
            home,
            top10,
            rows,
        }
    }

    /// Image CDN announced by the home payload, or the default one.
    pub fn cdn_base(&self) -> String {
        self.home
            .state()
            .data()
            .and_then(|d| d.cdn_image_domain.clone())
            .filter(|cdn| !cdn.is_empty())
            .unwrap_or_else(|| CDN_BASE.to_string())
    }

    pub fn thumb_url(&self, item: &MovieItem) -> String {
        normalize_image_url(&item.thumb_url, &self.cdn_base())
    }

    pub fn poster_url(&self, item: &MovieItem) -> String {
        normalize_image_url(&item.poster_url, &self.cdn_base())
    }

    pub fn hero_items(&self) -> Vec<MovieItem> {
        self.home
            .state()
            .data()
            .map(|d| d.items.iter().take(HERO_SLIDES).cloned().collect())
            .unwrap_or_default()
    }

    /// Rotation over the current hero slides.
    pub fn hero_rotation(&self) -> HeroRotation {
        HeroRotation::start(self.hero_items().len())
    }

    /// Detail for one hero slide, for its description and rating.
    pub fn hero_detail(&self, index: usize) -> HeroDetail {
        let slug = self
            .hero_items()
            .get(index)
            .map(|item| item.slug.clone())
            .unwrap_or_default();
        HeroDetail {
            detail: self.client.observe(&self.queries.movie_detail(&slug)),
        }
    }

    /// Top ten of any named list, e.g. `phim-le` next to the default `phim-bo` slider.
    pub fn top10(&self, slug: &str) -> QueryObserver<MovieListData> {
        self.client
            .observe(&self.queries.movie_list(slug, &first_page(TOP10_LIMIT)))
    }

    pub fn showcase(&self) -> Showcase<A> {
        Showcase::new(self.queries.clone(), self.client.clone())
    }

    pub fn view(&self) -> HomeView {
        let home = self.home.state();
        let new_releases = RowView {
            slug: "phim-moi".into(),
            title: "Phim Mới Cập Nhật".into(),
            items: home.data().map(|d| d.items.clone()).unwrap_or_default(),
            status: ViewStatus::from_state(&home),
        };
        let rows = self
            .rows
            .iter()
            .map(|(slug, title, observer)| {
                let state = observer.state();
                RowView {
                    slug: slug.to_string(),
                    title: title.to_string(),
                    items: items_of(&state),
                    status: ViewStatus::from_state(&state),
                }
            })
            .collect();
        HomeView {
            cdn_base: self.cdn_base(),
            hero: self.hero_items(),
            top10: items_of(&self.top10.state()),
            new_releases,
            rows,
        }
    }

    pub async fn settled(&mut self) -> HomeView {
        self.home.settled().await;
        self.top10.settled().await;
        for (_, _, observer) in &mut self.rows {
            observer.settled().await;
        }
        self.view()
    }
}

/// Description and rating for a hero slide.
pub struct HeroDetail {
    detail: QueryObserver<MovieDetailData>,
}

impl HeroDetail {
    pub fn description(&self) -> Option<String> {
        self.detail
            .state()
            .data()
            .map(|d| strip_html(&d.item.content))
            .filter(|text| !text.is_empty())
    }

    pub fn rating(&self) -> Option<String> {
        self.detail.state().data().and_then(|d| format_rating(&d.item))
    }

    pub async fn settled(&mut self) {
        self.detail.settled().await;
    }
}

/// Auto-advancing hero index.
///
/// Ticks every interval and wraps at the slide count. Inactive with one
/// slide or none. The timer task is aborted on drop.
pub struct HeroRotation {
    len: usize,
    index: Arc<watch::Sender<usize>>,
    task: Option<JoinHandle<()>>,
}

impl HeroRotation {
    /// Must be called from within a tokio runtime when `len > 1`.
    pub fn start(len: usize) -> Self {
        Self::with_interval(len, HERO_INTERVAL)
    }

    pub fn with_interval(len: usize, period: Duration) -> Self {
        let (sender, _) = watch::channel(0usize);
        let index = Arc::new(sender);
        let task = (len > 1).then(|| {
            let index = index.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    index.send_modify(|i| *i = (*i + 1) % len);
                }
            })
        });
        Self { len, index, task }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn current(&self) -> usize {
        *self.index.borrow()
    }

    /// Jump to a slide, e.g. from a dot indicator.
    pub fn select(&self, index: usize) {
        if index < self.len {
            self.index.send_replace(index);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.index.subscribe()
    }
}

impl Drop for HeroRotation {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Featured title in the animation showcase.
#[derive(Debug, Clone, Serialize)]
pub struct ShowcaseFeature {
    pub item: MovieItem,
    pub description: Option<String>,
    pub rating: Option<String>,
}

/// Animation strip with one selected title shown in detail.
pub struct Showcase<A> {
    queries: CatalogQueries<A>,
    client: QueryClient,
    list: QueryObserver<MovieListData>,
    selected: usize,
    detail: QueryObserver<MovieDetailData>,
}

impl<A: CatalogService + 'static> Showcase<A> {
    pub fn new(queries: CatalogQueries<A>, client: QueryClient) -> Self {
        let list =
            client.observe(&queries.movie_list(SHOWCASE_SLUG, &first_page(SHOWCASE_LIMIT)));
        let detail = client.observe(&queries.movie_detail(""));
        let mut showcase = Self {
            queries,
            client,
            list,
            selected: 0,
            detail,
        };
        showcase.attach_detail();
        showcase
    }

    pub fn items(&self) -> Vec<MovieItem> {
        items_of(&self.list.state())
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Select a title. Out of range indices are ignored.
    pub fn select(&mut self, index: usize) {
        if index < self.items().len() {
            self.selected = index;
            self.attach_detail();
        }
    }

    fn attach_detail(&mut self) {
        let slug = self
            .items()
            .get(self.selected)
            .map(|item| item.slug.clone())
            .unwrap_or_default();
        let query = self.queries.movie_detail(&slug);
        if self.detail.query().key() != query.key() {
            self.detail = self.client.observe(&query);
        }
    }

    pub fn feature(&self) -> Option<ShowcaseFeature> {
        let item = self.items().get(self.selected)?.clone();
        let state = self.detail.state();
        let detail = state.data().map(|d| &d.item);
        Some(ShowcaseFeature {
            item,
            description: detail
                .map(|d| strip_html(&d.content))
                .filter(|text| !text.is_empty()),
            rating: detail.and_then(format_rating),
        })
    }

    /// Warm the detail cache for every listed title so switching the
    /// selection renders at once.
    pub async fn prefetch_details(&self) {
        let queries: Vec<_> = self
            .items()
            .iter()
            .map(|item| self.queries.movie_detail(&item.slug))
            .collect();
        join_all(queries.iter().map(|query| self.client.prefetch(query))).await;
        tracing::debug!(count = queries.len(), "showcase details prefetched");
    }

    pub async fn settled(&mut self) -> Option<ShowcaseFeature> {
        self.list.settled().await;
        self.attach_detail();
        self.detail.settled().await;
        self.feature()
    }
}
