use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::error::OphimError;
use super::types::{
    decode_envelope, FilterListData, HomeData, MovieDetailData, MovieImagesData, MovieKeywordsData,
    MovieListData, MovieListParams, MoviePeoplesData, SearchData, SearchParams,
};
use crate::traits::CatalogService;

pub const DEFAULT_BASE_URL: &str = "https://ophim1.com";
pub const DEFAULT_API_VERSION: &str = "v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// OPhim v1 catalog client.
///
/// Every call is a single GET. Nothing is retried or cached here; the
/// query cache in `locsong-core` owns both concerns.
#[derive(Debug, Clone)]
pub struct OphimClient {
    api_root: Url,
    http: Client,
}

impl OphimClient {
    /// Build a client for `{base_url}/{api_version}/api`.
    pub fn new(base_url: &str, api_version: &str, timeout: Duration) -> Result<Self, OphimError> {
        let root = format!(
            "{}/{}/api",
            base_url.trim_end_matches('/'),
            api_version.trim_matches('/')
        );
        let api_root = Url::parse(&root).map_err(|e| OphimError::Parse(e.to_string()))?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { api_root, http })
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// Append path segments to the API root. Segments are percent-encoded,
    /// so slugs can't escape their position in the path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, OphimError> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|()| OphimError::Parse(format!("cannot append path to {}", self.api_root)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, OphimError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "OPhim API error");
            Err(OphimError::Api {
                status,
                message: body,
            })
        }
    }

    async fn get<T, Q>(&self, segments: &[&str], query: Option<&Q>) -> Result<T, OphimError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        let started = Instant::now();

        let mut req = self.http.get(url.clone());
        if let Some(query) = query {
            req = req.query(query);
        }
        let resp = req.send().await?;
        let resp = Self::check_response(resp).await?;

        let body = resp.bytes().await?;

        tracing::debug!(
            url = %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OPhim request finished"
        );
        decode_envelope(&body)
    }
}

impl Default for OphimClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_VERSION, DEFAULT_TIMEOUT)
            .expect("built-in OPhim base URL is valid")
    }
}

impl CatalogService for OphimClient {
    async fn home(&self) -> Result<HomeData, OphimError> {
        self.get::<_, ()>(&["home"], None).await
    }

    async fn movie_list(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.get(&["danh-sach", slug], Some(params)).await
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchData, OphimError> {
        self.get(&["tim-kiem"], Some(params)).await
    }

    async fn categories(&self) -> Result<FilterListData, OphimError> {
        self.get::<_, ()>(&["the-loai"], None).await
    }

    async fn movies_by_category(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.get(&["the-loai", slug], Some(params)).await
    }

    async fn countries(&self) -> Result<FilterListData, OphimError> {
        self.get::<_, ()>(&["quoc-gia"], None).await
    }

    async fn movies_by_country(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        self.get(&["quoc-gia", slug], Some(params)).await
    }

    async fn years(&self) -> Result<FilterListData, OphimError> {
        self.get::<_, ()>(&["nam-phat-hanh"], None).await
    }

    async fn movies_by_year(
        &self,
        year: u32,
        params: &MovieListParams,
    ) -> Result<MovieListData, OphimError> {
        let year = year.to_string();
        self.get(&["nam-phat-hanh", &year], Some(params)).await
    }

    async fn movie_detail(&self, slug: &str) -> Result<MovieDetailData, OphimError> {
        self.get::<_, ()>(&["phim", slug], None).await
    }

    async fn movie_images(&self, slug: &str) -> Result<MovieImagesData, OphimError> {
        self.get::<_, ()>(&["phim", slug, "images"], None).await
    }

    async fn movie_peoples(&self, slug: &str) -> Result<MoviePeoplesData, OphimError> {
        self.get::<_, ()>(&["phim", slug, "peoples"], None).await
    }

    async fn movie_keywords(&self, slug: &str) -> Result<MovieKeywordsData, OphimError> {
        self.get::<_, ()>(&["phim", slug, "keywords"], None).await
    }
}
