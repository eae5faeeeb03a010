//! Canned catalog used by the session tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use locsong_api::ophim::types::{
    FilterListData, HomeData, MovieDetailData, MovieImagesData, MovieKeywordsData, MovieListData,
    MovieListParams, MoviePeoplesData, SearchData, SearchParams,
};
use locsong_api::{CatalogService, OphimError};

pub const TOTAL_ITEMS: u64 = 100;

pub struct FakeCatalog {
    pub latency: Duration,
    pub missing: HashSet<String>,
    pub blank_titles: bool,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(20),
            missing: HashSet::new(),
            blank_titles: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeCatalog {
    pub fn with_missing(slug: &str) -> Self {
        Self {
            missing: HashSet::from([slug.to_string()]),
            ..Default::default()
        }
    }

    pub fn with_blank_titles() -> Self {
        Self {
            blank_titles: true,
            ..Default::default()
        }
    }

    /// Number of recorded calls whose label starts with `prefix`.
    pub fn calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, label: String) {
        self.calls.lock().unwrap().push(label);
        tokio::time::sleep(self.latency).await;
    }

    fn check(&self, slug: &str) -> Result<(), OphimError> {
        if self.missing.contains(slug) {
            Err(OphimError::Api {
                status: 404,
                message: "not found".into(),
            })
        } else {
            Ok(())
        }
    }

    fn list(&self, prefix: &str, title: &str, params: &MovieListParams) -> MovieListData {
        let page = params.page.unwrap_or(1);
        let limit = params.limit.unwrap_or(24);
        let items: Vec<_> = (0..limit)
            .map(|i| item(&format!("{prefix}-p{page}-{i}"), "hanh-dong"))
            .collect();
        let title = if self.blank_titles { "" } else { title };
        serde_json::from_value(json!({
            "titlePage": title,
            "items": items,
            "params": { "pagination": {
                "currentPage": page,
                "totalItems": TOTAL_ITEMS,
                "totalItemsPerPage": limit
            }}
        }))
        .unwrap()
    }
}

pub fn item(slug: &str, category: &str) -> serde_json::Value {
    json!({
        "_id": format!("id-{slug}"),
        "name": format!("Phim {slug}"),
        "slug": slug,
        "origin_name": slug,
        "type": "series",
        "thumb_url": format!("{slug}-thumb.jpg"),
        "poster_url": format!("{slug}-poster.jpg"),
        "year": 2024,
        "category": [{ "_id": category, "slug": category, "name": category }],
        "country": []
    })
}

impl CatalogService for FakeCatalog {
    async fn home(&self) -> Result<HomeData, OphimError> {
        self.record("home".into()).await;
        let items: Vec<_> = (0..6).map(|i| item(&format!("home-{i}"), "hanh-dong")).collect();
        Ok(serde_json::from_value(json!({
            "items": items,
            "params": { "pagination": { "currentPage": 1, "totalItems": 6, "totalItemsPerPage": 24 } },
            "APP_DOMAIN_CDN_IMAGE": "https://img.ophim.live/uploads/movies"
        }))
        .unwrap())
    }

    async fn movie_list(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.record(format!("list:{slug}:{}", params.page.unwrap_or(1)))
            .await;
        Ok(self.list(slug, &format!("Danh sách {slug}"), params))
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchData, OphimError> {
        self.record(format!("search:{}", params.keyword)).await;
        let page = params.page.unwrap_or(1);
        let limit = params.limit.unwrap_or(24).min(3);
        let items: Vec<_> = (0..limit)
            .map(|i| item(&format!("{}-{i}", params.keyword), "hanh-dong"))
            .collect();
        Ok(serde_json::from_value(json!({
            "titlePage": "",
            "items": items,
            "params": {
                "keyword": params.keyword,
                "pagination": { "currentPage": page, "totalItems": limit, "totalItemsPerPage": 24 }
            }
        }))
        .unwrap())
    }

    async fn categories(&self) -> Result<FilterListData, OphimError> {
        self.record("categories".into()).await;
        Ok(serde_json::from_value(json!({ "items": [
            { "_id": "1", "slug": "hanh-dong", "name": "Hành Động" },
            { "_id": "2", "slug": "co-trang", "name": "Cổ Trang" }
        ]}))
        .unwrap())
    }

    async fn movies_by_category(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.record(format!("category:{slug}:{}", params.page.unwrap_or(1)))
            .await;
        Ok(self.list(slug, &format!("Thể loại {slug}"), params))
    }

    async fn countries(&self) -> Result<FilterListData, OphimError> {
        self.record("countries".into()).await;
        Ok(serde_json::from_value(json!({ "items": [
            { "_id": "1", "slug": "han-quoc", "name": "Hàn Quốc" }
        ]}))
        .unwrap())
    }

    async fn movies_by_country(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.record(format!("country:{slug}:{}", params.page.unwrap_or(1)))
            .await;
        Ok(self.list(slug, &format!("Quốc gia {slug}"), params))
    }

    async fn years(&self) -> Result<FilterListData, OphimError> {
        self.record("years".into()).await;
        Ok(serde_json::from_value(json!({ "items": [
            { "_id": "2024", "slug": "2024", "name": "2024" }
        ]}))
        .unwrap())
    }

    async fn movies_by_year(
        &self,
        year: u32,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.record(format!("year:{year}:{}", params.page.unwrap_or(1)))
            .await;
        Ok(self.list(&year.to_string(), &format!("Năm {year}"), params))
    }

    async fn movie_detail(&self, slug: &str) -> Result<MovieDetailData, OphimError> {
        self.record(format!("detail:{slug}")).await;
        self.check(slug)?;
        Ok(serde_json::from_value(json!({ "item": {
            "_id": format!("id-{slug}"),
            "name": format!("Phim {slug}"),
            "slug": slug,
            "origin_name": slug,
            "content": "<p>Một <b>vụ án</b> mới.</p>",
            "type": "series",
            "status": "ongoing",
            "poster_url": format!("{slug}-poster.jpg"),
            "thumb_url": format!("{slug}-thumb.jpg"),
            "year": 2024,
            "category": [{ "_id": "2", "slug": "co-trang", "name": "Cổ Trang" }],
            "episodes": [
                { "server_name": "Vietsub #1", "server_data": [
                    { "name": "1", "slug": "tap-1", "filename": "", "link_embed": "https://embed/v1/1", "link_m3u8": "https://m3u8/v1/1" },
                    { "name": "2", "slug": "tap-2", "filename": "", "link_embed": "https://embed/v1/2", "link_m3u8": "https://m3u8/v1/2" },
                    { "name": "3", "slug": "tap-3", "filename": "", "link_embed": "https://embed/v1/3", "link_m3u8": "https://m3u8/v1/3" }
                ]},
                { "server_name": "Thuyết Minh #1", "server_data": [
                    { "name": "1", "slug": "tap-1", "filename": "", "link_embed": "https://embed/tm/1", "link_m3u8": "https://m3u8/tm/1" },
                    { "name": "2", "slug": "tap-2", "filename": "", "link_embed": "https://embed/tm/2", "link_m3u8": "https://m3u8/tm/2" }
                ]}
            ],
            "tmdb": { "type": "tv", "id": "42", "vote_average": 7.5, "vote_count": 10 },
            "imdb": { "id": "tt42", "vote_average": 8.14, "vote_count": 100 }
        }}))
        .unwrap())
    }

    async fn movie_images(&self, slug: &str) -> Result<MovieImagesData, OphimError> {
        self.record(format!("images:{slug}")).await;
        self.check(slug)?;
        Ok(serde_json::from_value(json!({
            "slug": slug,
            "image_sizes": {
                "backdrop": { "original": "https://image.tmdb.org/t/p/original", "w1280": "https://image.tmdb.org/t/p/w1280" },
                "poster": { "original": "https://image.tmdb.org/t/p/original", "w500": "https://image.tmdb.org/t/p/w500" }
            },
            "images": [
                { "width": 1920, "height": 1080, "aspect_ratio": 1.78, "type": "backdrop", "file_path": "/back.jpg", "iso_639_1": null },
                { "width": 500, "height": 750, "aspect_ratio": 0.67, "type": "poster", "file_path": "/poster.jpg", "iso_639_1": "vi" }
            ]
        }))
        .unwrap())
    }

    async fn movie_peoples(&self, slug: &str) -> Result<MoviePeoplesData, OphimError> {
        self.record(format!("peoples:{slug}")).await;
        self.check(slug)?;
        Ok(serde_json::from_value(json!({ "peoples": [
            { "id": 1, "name": "Diễn viên A", "character": "Thám tử", "job": null, "profile_path": "/a.jpg" },
            { "id": 2, "name": "Đạo diễn B", "character": null, "job": "Director", "profile_path": null },
            { "id": 3, "name": "Diễn viên C", "character": "Hung thủ", "job": null, "profile_path": null }
        ]}))
        .unwrap())
    }

    async fn movie_keywords(&self, slug: &str) -> Result<MovieKeywordsData, OphimError> {
        self.record(format!("keywords:{slug}")).await;
        self.check(slug)?;
        Ok(serde_json::from_value(json!({ "keywords": [
            { "id": 1, "name": "detective" }
        ]}))
        .unwrap())
    }
}
