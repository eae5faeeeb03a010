//! Image URL resolution for catalog thumbnails and TMDB artwork.

use crate::ophim::types::{ImageKind, ImageSizes};

/// Current image CDN.
pub const CDN_BASE: &str = "https://phimimg.com";

/// Retired CDN host that still shows up in older records.
const LEGACY_HOST: &str = "https://img.ophim.live";
const LEGACY_UPLOADS: &str = "https://img.ophim.live/uploads/movies";

fn normalize_cdn(cdn_base: &str) -> String {
    let base = cdn_base
        .replacen(LEGACY_UPLOADS, CDN_BASE, 1)
        .replacen(LEGACY_HOST, CDN_BASE, 1);
    match base.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => base,
    }
}

/// Resolve a `thumb_url`/`poster_url` value to an absolute URL.
///
/// Legacy-host URLs are moved to the current CDN, other absolute URLs pass
/// through, and relative paths are joined onto `cdn_base`. Applying it to
/// its own output is a no-op.
pub fn normalize_image_url(url: &str, cdn_base: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    if let Some(rest) = url.strip_prefix(LEGACY_HOST) {
        return format!("{CDN_BASE}{rest}");
    }

    if url.starts_with("http") {
        return url.to_string();
    }

    let path = url.strip_prefix('/').unwrap_or(url);
    format!("{}/{}", normalize_cdn(cdn_base), path)
}

/// Default TMDB size key per image kind.
pub fn default_size(kind: ImageKind) -> &'static str {
    match kind {
        ImageKind::Backdrop => "w1280",
        ImageKind::Poster => "w500",
    }
}

/// Build a TMDB image URL from the size tables of an images payload.
///
/// Falls back to the `original` size when the preferred key is missing.
/// Returns an empty string when there's no file path or no usable base.
pub fn build_tmdb_image_url(
    sizes: &ImageSizes,
    kind: ImageKind,
    file_path: &str,
    size: Option<&str>,
) -> String {
    if file_path.is_empty() {
        return String::new();
    }

    let table = match kind {
        ImageKind::Backdrop => &sizes.backdrop,
        ImageKind::Poster => &sizes.poster,
    };
    let preferred = size.unwrap_or_else(|| default_size(kind));

    match table.get(preferred).or_else(|| table.get("original")) {
        Some(base) if !base.is_empty() => format!("{base}{file_path}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes() -> ImageSizes {
        let mut sizes = ImageSizes::default();
        sizes.backdrop.insert(
            "w1280".into(),
            "https://image.tmdb.org/t/p/w1280".into(),
        );
        sizes.backdrop.insert(
            "original".into(),
            "https://image.tmdb.org/t/p/original".into(),
        );
        sizes.poster.insert(
            "original".into(),
            "https://image.tmdb.org/t/p/original".into(),
        );
        sizes
    }

    #[test]
    fn test_relative_path_joins_cdn() {
        assert_eq!(
            normalize_image_url("/uploads/movies/a-thumb.jpg", "https://phimimg.com/"),
            "https://phimimg.com/uploads/movies/a-thumb.jpg"
        );
        assert_eq!(
            normalize_image_url("a-thumb.jpg", "https://img.ophim.live/uploads/movies"),
            "https://phimimg.com/a-thumb.jpg"
        );
    }

    #[test]
    fn test_legacy_host_is_swapped() {
        assert_eq!(
            normalize_image_url(
                "https://img.ophim.live/uploads/movies/a-poster.jpg",
                CDN_BASE
            ),
            "https://phimimg.com/uploads/movies/a-poster.jpg"
        );
    }

    #[test]
    fn test_other_absolute_urls_pass_through() {
        let url = "https://image.tmdb.org/t/p/w500/x.jpg";
        assert_eq!(normalize_image_url(url, CDN_BASE), url);
        assert_eq!(normalize_image_url("", CDN_BASE), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "a-thumb.jpg",
            "/a-thumb.jpg",
            "https://img.ophim.live/uploads/movies/a.jpg",
            "https://cdn.example.org/a.jpg",
        ];
        for input in inputs {
            let once = normalize_image_url(input, "https://img.ophim.live/");
            let twice = normalize_image_url(&once, "https://img.ophim.live/");
            assert_eq!(once, twice, "input: {input}");
        }
    }

    #[test]
    fn test_tmdb_url_uses_preferred_size() {
        let url = build_tmdb_image_url(&sizes(), ImageKind::Backdrop, "/b.jpg", None);
        assert_eq!(url, "https://image.tmdb.org/t/p/w1280/b.jpg");
    }

    #[test]
    fn test_tmdb_url_falls_back_to_original() {
        let url = build_tmdb_image_url(&sizes(), ImageKind::Poster, "/p.jpg", None);
        assert_eq!(url, "https://image.tmdb.org/t/p/original/p.jpg");

        let url = build_tmdb_image_url(&sizes(), ImageKind::Backdrop, "/b.jpg", Some("w300"));
        assert_eq!(url, "https://image.tmdb.org/t/p/original/b.jpg");
    }

    #[test]
    fn test_tmdb_url_without_base_or_path_is_empty() {
        assert_eq!(
            build_tmdb_image_url(&ImageSizes::default(), ImageKind::Poster, "/p.jpg", None),
            ""
        );
        assert_eq!(
            build_tmdb_image_url(&sizes(), ImageKind::Backdrop, "", None),
            ""
        );
    }
}
