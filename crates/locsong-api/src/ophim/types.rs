use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::OphimError;

// ── Envelope ─────────────────────────────────────────────────────

/// The `{status, message?, data}` wrapper every OPhim response shares.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Envelope status. Newer endpoints send `"success"`/`"error"`, a few
/// older ones still send a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeStatus {
    Flag(bool),
    Text(StatusText),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusText {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

impl EnvelopeStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Flag(true) | Self::Text(StatusText::Success))
    }
}

impl<T> Envelope<T> {
    /// Narrow the envelope to its payload, rejecting failed or empty ones.
    pub fn into_data(self) -> Result<T, OphimError> {
        if !self.status.is_success() {
            return Err(OphimError::Envelope {
                message: self
                    .message
                    .unwrap_or_else(|| "upstream reported failure".into()),
            });
        }
        self.data.ok_or_else(|| OphimError::Envelope {
            message: "response has no data".into(),
        })
    }
}

/// Decode a response body, checking the envelope status before the payload
/// shape, so a failed envelope with a stray `data` object is still reported
/// as [`OphimError::Envelope`].
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, OphimError> {
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| OphimError::Parse(e.to_string()))?;
    let data = envelope.into_data()?;
    serde_json::from_value(data).map_err(|e| OphimError::Parse(e.to_string()))
}

// ── Shared pieces ────────────────────────────────────────────────

/// Category, country or year tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItem {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub total_items_per_page: u32,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

fn first_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_items: 0,
            total_items_per_page: 0,
            total_pages: None,
        }
    }
}

impl Pagination {
    /// Page count, computed from the item totals when upstream omits it.
    pub fn total_pages(&self) -> u32 {
        if let Some(pages) = self.total_pages {
            return pages.max(1);
        }
        if self.total_items == 0 || self.total_items_per_page == 0 {
            return 1;
        }
        let per_page = u64::from(self.total_items_per_page);
        let pages = self.total_items.div_ceil(per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoOnPage {
    #[serde(default)]
    pub title_head: String,
    #[serde(default)]
    pub description_head: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadCrumb {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub position: u32,
}

// ── Movies ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieType {
    Series,
    Single,
    Hoathinh,
    Tvshows,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieStatus {
    Ongoing,
    Completed,
    Trailer,
    Upcoming,
    #[serde(other)]
    Other,
}

/// A title as it appears in home, list and search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub origin_name: String,
    #[serde(default)]
    pub alternative_names: Vec<String>,
    #[serde(rename = "type")]
    pub movie_type: MovieType,
    #[serde(default)]
    pub thumb_url: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub category: Vec<FilterItem>,
    #[serde(default)]
    pub country: Vec<FilterItem>,
    pub time: Option<String>,
    pub episode_current: Option<String>,
    pub episode_total: Option<String>,
    pub quality: Option<String>,
    pub lang: Option<String>,
    pub chieurap: Option<bool>,
    pub sub_docquyen: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbRating {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub season: Option<u32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdbRating {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u64,
}

/// One playable episode on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub link_embed: String,
    #[serde(default)]
    pub link_m3u8: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeServer {
    pub server_name: String,
    #[serde(default)]
    pub server_data: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub time: String,
}

/// Full title record from the detail endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub origin_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub movie_type: MovieType,
    pub status: Option<MovieStatus>,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub thumb_url: String,
    #[serde(default)]
    pub is_copyright: bool,
    #[serde(default)]
    pub sub_docquyen: bool,
    #[serde(default)]
    pub chieurap: bool,
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub episode_current: String,
    #[serde(default)]
    pub episode_total: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub lang: String,
    pub notify: Option<String>,
    pub showtimes: Option<String>,
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub view: u64,
    #[serde(default)]
    pub actor: Vec<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub category: Vec<FilterItem>,
    #[serde(default)]
    pub country: Vec<FilterItem>,
    #[serde(default)]
    pub episodes: Vec<EpisodeServer>,
    pub tmdb: Option<TmdbRating>,
    pub imdb: Option<ImdbRating>,
    pub created: Option<Timestamp>,
    pub modified: Option<Timestamp>,
}

// ── Request parameters ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    #[serde(rename = "modified.time")]
    ModifiedTime,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "_id")]
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    Asc,
    Desc,
}

/// Query parameters for list, category, country and year endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovieListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<SortType>,
    /// Comma separated category slugs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

impl MovieListParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Default::default()
        }
    }
}

/// Query parameters for keyword search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    pub keyword: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// ── Response payloads ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeData {
    #[serde(rename = "seoOnPage", default)]
    pub seo_on_page: SeoOnPage,
    #[serde(default)]
    pub items: Vec<MovieItem>,
    #[serde(default)]
    pub params: PaginationParams,
    #[serde(rename = "APP_DOMAIN_CDN_IMAGE", default)]
    pub cdn_image_domain: Option<String>,
    #[serde(rename = "APP_DOMAIN_FRONTEND", default)]
    pub frontend_domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieListData {
    #[serde(rename = "titlePage", default)]
    pub title_page: String,
    #[serde(default)]
    pub items: Vec<MovieItem>,
    #[serde(default)]
    pub params: PaginationParams,
    #[serde(rename = "breadCrumb", default)]
    pub bread_crumb: Vec<BreadCrumb>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPaginationParams {
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchData {
    #[serde(rename = "titlePage", default)]
    pub title_page: String,
    #[serde(default)]
    pub items: Vec<MovieItem>,
    #[serde(default)]
    pub params: SearchPaginationParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterListData {
    #[serde(default)]
    pub items: Vec<FilterItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetailData {
    pub item: MovieDetail,
    #[serde(rename = "seoOnPage", default)]
    pub seo_on_page: Option<SeoOnPage>,
    #[serde(rename = "breadCrumb", default)]
    pub bread_crumb: Vec<BreadCrumb>,
}

/// Size key → base URL, e.g. `{"original": ".../original", "w500": ".../w500"}`.
pub type ImageSizeTable = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSizes {
    #[serde(default)]
    pub backdrop: ImageSizeTable,
    #[serde(default)]
    pub poster: ImageSizeTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Backdrop,
    Poster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbImage {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub aspect_ratio: f64,
    #[serde(rename = "type")]
    pub kind: ImageKind,
    pub file_path: String,
    pub iso_639_1: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieImagesData {
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub tmdb_type: Option<String>,
    pub tmdb_season: Option<u32>,
    #[serde(default)]
    pub ophim_id: Option<String>,
    #[serde(default)]
    pub slug: String,
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub image_sizes: ImageSizes,
    #[serde(default)]
    pub images: Vec<TmdbImage>,
}

impl MovieImagesData {
    /// First image of the given kind, in upstream order.
    pub fn first_of(&self, kind: ImageKind) -> Option<&TmdbImage> {
        self.images.iter().find(|img| img.kind == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePeople {
    pub id: u64,
    pub name: String,
    pub character: Option<String>,
    pub job: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoviePeoplesData {
    #[serde(default)]
    pub peoples: Vec<MoviePeople>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieKeyword {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieKeywordsData {
    #[serde(default)]
    pub keywords: Vec<MovieKeyword>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_list_envelope() {
        let json = r#"{
            "status": "success",
            "data": {
                "titlePage": "Phim Bộ",
                "items": [
                    {
                        "_id": "65f1",
                        "name": "Người Hùng Bất Đắc Dĩ",
                        "slug": "nguoi-hung-bat-dac-di",
                        "origin_name": "Reluctant Hero",
                        "type": "series",
                        "thumb_url": "nguoi-hung-bat-dac-di-thumb.jpg",
                        "poster_url": "nguoi-hung-bat-dac-di-poster.jpg",
                        "year": 2024,
                        "category": [{ "_id": "c1", "slug": "hanh-dong", "name": "Hành Động" }],
                        "country": [{ "_id": "k1", "slug": "han-quoc", "name": "Hàn Quốc" }],
                        "episode_current": "Tập 8",
                        "quality": "FHD",
                        "lang": "Vietsub"
                    }
                ],
                "params": {
                    "pagination": { "currentPage": 1, "totalItems": 50, "totalItemsPerPage": 24 }
                }
            }
        }"#;

        let envelope: Envelope<MovieListData> = serde_json::from_str(json).unwrap();
        let data = envelope.into_data().unwrap();
        assert_eq!(data.title_page, "Phim Bộ");
        assert_eq!(data.items.len(), 1);

        let item = &data.items[0];
        assert_eq!(item.slug, "nguoi-hung-bat-dac-di");
        assert_eq!(item.movie_type, MovieType::Series);
        assert_eq!(item.category[0].slug, "hanh-dong");
        assert_eq!(item.episode_total, None);
        // 50 items at 24 per page.
        assert_eq!(data.params.pagination.total_pages(), 3);
    }

    #[test]
    fn test_failed_envelope_is_rejected() {
        let json = r#"{ "status": "error", "message": "Movie not found", "data": null }"#;
        let envelope: Envelope<MovieDetailData> = serde_json::from_str(json).unwrap();
        let err = envelope.into_data().unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Movie not found"));
    }

    #[test]
    fn test_failed_envelope_with_mismatched_data_is_not_found() {
        let json = br#"{ "status": "error", "message": "Movie not found", "data": {} }"#;
        let err = decode_envelope::<MovieDetailData>(json).unwrap_err();
        assert!(matches!(err, OphimError::Envelope { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_successful_envelope_with_wrong_shape_is_parse_error() {
        let json = br#"{ "status": "success", "data": {} }"#;
        let err = decode_envelope::<MovieDetailData>(json).unwrap_err();
        assert!(matches!(err, OphimError::Parse(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_boolean_status_is_accepted() {
        let json = r#"{ "status": true, "data": { "items": [] } }"#;
        let envelope: Envelope<FilterListData> = serde_json::from_str(json).unwrap();
        assert!(envelope.into_data().unwrap().items.is_empty());
    }

    #[test]
    fn test_total_pages_prefers_upstream_value() {
        let explicit = Pagination {
            current_page: 2,
            total_items: 100,
            total_items_per_page: 24,
            total_pages: Some(7),
        };
        assert_eq!(explicit.total_pages(), 7);

        let empty = Pagination::default();
        assert_eq!(empty.total_pages(), 1);

        let exact = Pagination {
            total_items: 48,
            total_items_per_page: 24,
            ..Default::default()
        };
        assert_eq!(exact.total_pages(), 2);
    }

    #[test]
    fn test_deserialize_detail_with_episodes() {
        let json = r#"{
            "item": {
                "_id": "abc",
                "name": "Thám Tử Lừng Danh",
                "slug": "tham-tu-lung-danh",
                "origin_name": "Detective",
                "content": "<p>Một <b>vụ án</b> mới.</p>",
                "type": "series",
                "status": "ongoing",
                "year": 2023,
                "actor": ["A", "B"],
                "episodes": [
                    {
                        "server_name": "Vietsub #1",
                        "server_data": [
                            { "name": "1", "slug": "tap-1", "filename": "f1", "link_embed": "https://embed/1", "link_m3u8": "https://m3u8/1" },
                            { "name": "2", "slug": "tap-2", "filename": "f2", "link_embed": "https://embed/2", "link_m3u8": "https://m3u8/2" }
                        ]
                    }
                ],
                "tmdb": { "type": "tv", "id": "42", "season": 1, "vote_average": 7.94, "vote_count": 120 },
                "imdb": { "id": "tt1", "vote_average": 8.1, "vote_count": 3000 }
            }
        }"#;

        let data: MovieDetailData = serde_json::from_str(json).unwrap();
        let item = data.item;
        assert_eq!(item.status, Some(MovieStatus::Ongoing));
        assert_eq!(item.episodes[0].server_data.len(), 2);
        assert_eq!(item.episodes[0].server_data[1].link_embed, "https://embed/2");
        assert_eq!(item.imdb.map(|r| r.vote_average), Some(8.1));
    }

    #[test]
    fn test_unknown_movie_type_is_other() {
        let json = r#"{ "_id": "1", "name": "x", "slug": "x", "type": "documentary" }"#;
        let item: MovieItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.movie_type, MovieType::Other);
    }

    #[test]
    fn test_list_params_skip_unset_fields() {
        let params = MovieListParams {
            page: Some(2),
            limit: Some(24),
            sort_field: Some(SortField::ModifiedTime),
            sort_type: Some(SortType::Desc),
            ..Default::default()
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "page": 2,
                "limit": 24,
                "sort_field": "modified.time",
                "sort_type": "desc"
            })
        );
    }
}
