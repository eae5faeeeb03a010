use std::sync::LazyLock;

use regex::Regex;

use locsong_api::ophim::types::MovieDetail;

static RE_HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Drop HTML tags from a catalog description.
pub fn strip_html(html: &str) -> String {
    RE_HTML_TAG.replace_all(html, "").trim().to_string()
}

/// Score to show for a title: IMDb when it has one, TMDB otherwise, to one
/// decimal place. Zero means "no score".
pub fn format_rating(detail: &MovieDetail) -> Option<String> {
    let imdb = detail.imdb.as_ref().map(|r| r.vote_average);
    let tmdb = detail.tmdb.as_ref().map(|r| r.vote_average);
    [imdb, tmdb]
        .into_iter()
        .flatten()
        .find(|score| *score != 0.0)
        .map(|score| format!("{score:.1}"))
}

/// `phim-bo-dang-chieu` → `Phim Bo Dang Chieu`.
pub fn title_case_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
