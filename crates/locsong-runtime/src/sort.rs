use locsong_api::ophim::types::{SortField, SortType};

/// A selectable ordering for list pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOption {
    pub label: &'static str,
    pub value: &'static str,
}

pub const DEFAULT_SORT: &str = "modified.time_desc";

pub const SORT_OPTIONS: [SortOption; 3] = [
    SortOption {
        label: "Mới cập nhật",
        value: "modified.time_desc",
    },
    SortOption {
        label: "Năm mới nhất",
        value: "year_desc",
    },
    SortOption {
        label: "Năm cũ nhất",
        value: "year_asc",
    },
];

/// Split a selector like `year_asc` into request parameters.
///
/// Anything mentioning `year` sorts by year, ascending only when the
/// selector ends in `asc`. Everything else is newest-modified first.
pub fn decompose(selector: &str) -> (SortField, SortType) {
    if selector.contains("year") {
        let direction = if selector.ends_with("asc") {
            SortType::Asc
        } else {
            SortType::Desc
        };
        (SortField::Year, direction)
    } else {
        (SortField::ModifiedTime, SortType::Desc)
    }
}
