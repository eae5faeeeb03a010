//! One query descriptor per catalog endpoint.
//!
//! Keys follow `["ophim", <resource>, <identifiers…>, <params>]` so a
//! prefix like `["ophim", "movieDetail"]` can be invalidated as a group.

use std::sync::Arc;

use locsong_api::ophim::types::{
    FilterListData, HomeData, MovieDetailData, MovieImagesData, MovieKeywordsData, MovieListData,
    MovieListParams, MoviePeoplesData, SearchData, SearchParams,
};
use locsong_api::CatalogService;
use locsong_core::query::{Query, QueryKey};

/// Freshness windows per resource.
pub mod stale_time {
    use std::time::Duration;

    const MINUTE: u64 = 60;

    /// Categories, countries and years.
    pub const FILTERS: Duration = Duration::from_secs(24 * 60 * MINUTE);
    pub const HOME: Duration = Duration::from_secs(5 * MINUTE);
    pub const MOVIE_LIST: Duration = Duration::from_secs(10 * MINUTE);
    pub const SEARCH: Duration = Duration::from_secs(3 * MINUTE);
    pub const MOVIE_DETAIL: Duration = Duration::from_secs(30 * MINUTE);
    pub const MOVIE_IMAGES: Duration = Duration::from_secs(60 * MINUTE);
    pub const MOVIE_PEOPLES: Duration = Duration::from_secs(60 * MINUTE);
    pub const MOVIE_KEYWORDS: Duration = Duration::from_secs(60 * MINUTE);
}

/// Minimum keyword length before a search is sent.
pub const MIN_KEYWORD_CHARS: usize = 2;

/// Whether `keyword`, ignoring surrounding whitespace, is long enough to search.
pub fn keyword_is_searchable(keyword: &str) -> bool {
    keyword.trim().chars().count() >= MIN_KEYWORD_CHARS
}

/// Namespace shared by every catalog key.
pub fn root_key() -> QueryKey {
    QueryKey::new("ophim")
}

/// Which filter list to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Categories,
    Countries,
    Years,
}

/// Builds catalog queries bound to one [`CatalogService`].
pub struct CatalogQueries<A> {
    api: Arc<A>,
}

impl<A> Clone for CatalogQueries<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

impl<A: CatalogService + 'static> CatalogQueries<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn home(&self) -> Query<HomeData> {
        let api = self.api.clone();
        Query::new(root_key().push("home"), move || {
            let api = api.clone();
            async move { api.home().await }
        })
        .stale_time(stale_time::HOME)
    }

    pub fn movie_list(&self, slug: &str, params: &MovieListParams) -> Query<MovieListData> {
        let key = root_key()
            .push("movieList")
            .push(slug)
            .with_params(params);
        let api = self.api.clone();
        let slug = slug.to_string();
        let params = params.clone();
        Query::new(key, move || {
            let api = api.clone();
            let slug = slug.clone();
            let params = params.clone();
            async move { api.movie_list(&slug, &params).await }
        })
        .stale_time(stale_time::MOVIE_LIST)
    }

    /// Disabled until the keyword is long enough to search.
    pub fn search(&self, params: &SearchParams) -> Query<SearchData> {
        let enabled = keyword_is_searchable(&params.keyword);
        let key = root_key().push("search").with_params(params);
        let api = self.api.clone();
        let params = params.clone();
        Query::new(key, move || {
            let api = api.clone();
            let params = params.clone();
            async move { api.search(&params).await }
        })
        .stale_time(stale_time::SEARCH)
        .enabled(enabled)
    }

    pub fn filters(&self, kind: FilterKind) -> Query<FilterListData> {
        let resource = match kind {
            FilterKind::Categories => "categories",
            FilterKind::Countries => "countries",
            FilterKind::Years => "years",
        };
        let api = self.api.clone();
        Query::new(root_key().push(resource), move || {
            let api = api.clone();
            async move {
                match kind {
                    FilterKind::Categories => api.categories().await,
                    FilterKind::Countries => api.countries().await,
                    FilterKind::Years => api.years().await,
                }
            }
        })
        .stale_time(stale_time::FILTERS)
    }

    pub fn categories(&self) -> Query<FilterListData> {
        self.filters(FilterKind::Categories)
    }

    pub fn countries(&self) -> Query<FilterListData> {
        self.filters(FilterKind::Countries)
    }

    pub fn years(&self) -> Query<FilterListData> {
        self.filters(FilterKind::Years)
    }

    pub fn movies_by_category(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Query<MovieListData> {
        let key = root_key().push("category").push(slug).with_params(params);
        let api = self.api.clone();
        let slug = slug.to_string();
        let params = params.clone();
        Query::new(key, move || {
            let api = api.clone();
            let slug = slug.clone();
            let params = params.clone();
            async move { api.movies_by_category(&slug, &params).await }
        })
        .stale_time(stale_time::MOVIE_LIST)
    }

    pub fn movies_by_country(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Query<MovieListData> {
        let key = root_key().push("country").push(slug).with_params(params);
        let api = self.api.clone();
        let slug = slug.to_string();
        let params = params.clone();
        Query::new(key, move || {
            let api = api.clone();
            let slug = slug.clone();
            let params = params.clone();
            async move { api.movies_by_country(&slug, &params).await }
        })
        .stale_time(stale_time::MOVIE_LIST)
    }

    pub fn movies_by_year(&self, year: u32, params: &MovieListParams) -> Query<MovieListData> {
        let key = root_key().push("year").push(year).with_params(params);
        let api = self.api.clone();
        let params = params.clone();
        Query::new(key, move || {
            let api = api.clone();
            let params = params.clone();
            async move { api.movies_by_year(year, &params).await }
        })
        .stale_time(stale_time::MOVIE_LIST)
    }

    /// Disabled for an empty slug.
    pub fn movie_detail(&self, slug: &str) -> Query<MovieDetailData> {
        let api = self.api.clone();
        let owned = slug.to_string();
        Query::new(root_key().push("movieDetail").push(slug), move || {
            let api = api.clone();
            let slug = owned.clone();
            async move { api.movie_detail(&slug).await }
        })
        .stale_time(stale_time::MOVIE_DETAIL)
        .enabled(!slug.is_empty())
    }

    pub fn movie_images(&self, slug: &str) -> Query<MovieImagesData> {
        let api = self.api.clone();
        let owned = slug.to_string();
        Query::new(root_key().push("movieImages").push(slug), move || {
            let api = api.clone();
            let slug = owned.clone();
            async move { api.movie_images(&slug).await }
        })
        .stale_time(stale_time::MOVIE_IMAGES)
        .enabled(!slug.is_empty())
    }

    pub fn movie_peoples(&self, slug: &str) -> Query<MoviePeoplesData> {
        let api = self.api.clone();
        let owned = slug.to_string();
        Query::new(root_key().push("moviePeoples").push(slug), move || {
            let api = api.clone();
            let slug = owned.clone();
            async move { api.movie_peoples(&slug).await }
        })
        .stale_time(stale_time::MOVIE_PEOPLES)
        .enabled(!slug.is_empty())
    }

    pub fn movie_keywords(&self, slug: &str) -> Query<MovieKeywordsData> {
        let api = self.api.clone();
        let owned = slug.to_string();
        Query::new(root_key().push("movieKeywords").push(slug), move || {
            let api = api.clone();
            let slug = owned.clone();
            async move { api.movie_keywords(&slug).await }
        })
        .stale_time(stale_time::MOVIE_KEYWORDS)
        .enabled(!slug.is_empty())
    }
}
