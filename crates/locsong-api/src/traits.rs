//! The catalog seam.
//!
//! [`OphimClient`](crate::ophim::OphimClient) implements it over HTTP; tests
//! across the workspace implement it with canned data.

use std::future::Future;

use crate::ophim::types::{
    FilterListData, HomeData, MovieDetailData, MovieImagesData, MovieKeywordsData, MovieListData,
    MovieListParams, MoviePeoplesData, SearchData, SearchParams,
};
use crate::ophim::OphimError;

/// One method per catalog endpoint.
pub trait CatalogService: Send + Sync {
    /// Home feed: newest items plus the CDN domain for images.
    fn home(&self) -> impl Future<Output = Result<HomeData, OphimError>> + Send;

    /// A named list such as `phim-bo` or `hoat-hinh`.
    fn movie_list(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> impl Future<Output = Result<MovieListData, OphimError>> + Send;

    fn search(
        &self,
        params: &SearchParams,
    ) -> impl Future<Output = Result<SearchData, OphimError>> + Send;

    fn categories(&self) -> impl Future<Output = Result<FilterListData, OphimError>> + Send;

    fn movies_by_category(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> impl Future<Output = Result<MovieListData, OphimError>> + Send;

    fn countries(&self) -> impl Future<Output = Result<FilterListData, OphimError>> + Send;

    fn movies_by_country(
        &self,
        slug: &str,
        params: &MovieListParams,
    ) -> impl Future<Output = Result<MovieListData, OphimError>> + Send;

    fn years(&self) -> impl Future<Output = Result<FilterListData, OphimError>> + Send;

    fn movies_by_year(
        &self,
        year: u32,
        params: &MovieListParams,
    ) -> impl Future<Output = Result<MovieListData, OphimError>> + Send;

    /// Full record with episode servers.
    fn movie_detail(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<MovieDetailData, OphimError>> + Send;

    /// TMDB images forwarded by the catalog, with their size tables.
    fn movie_images(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<MovieImagesData, OphimError>> + Send;

    fn movie_peoples(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<MoviePeoplesData, OphimError>> + Send;

    fn movie_keywords(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<MovieKeywordsData, OphimError>> + Send;
}
