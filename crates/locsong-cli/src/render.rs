//! Plain-text output for each command.

use locsong_api::image::normalize_image_url;
use locsong_api::ophim::types::{FilterListData, MovieDetail, MovieItem};
use locsong_core::pagination::PageSlot;
use locsong_core::progress::WatchProgressEntry;
use locsong_runtime::home::GENRE_SHORTCUTS;
use locsong_runtime::text::{format_rating, strip_html};
use locsong_runtime::{HomeView, ListView, PageInfo, ViewStatus, WatchPage};

fn item_line(item: &MovieItem) -> String {
    let mut line = format!("  {:<40} {}", item.slug, item.name);
    if item.year > 0 {
        line.push_str(&format!(" ({})", item.year));
    }
    if let Some(episode) = item.episode_current.as_deref().filter(|e| !e.is_empty()) {
        line.push_str(&format!(" [{episode}]"));
    }
    line
}

fn pager(page: &PageInfo) -> String {
    page.slots()
        .iter()
        .map(|slot| match slot {
            PageSlot::Page(p) if *p == page.current => format!("[{p}]"),
            PageSlot::Page(p) => p.to_string(),
            PageSlot::Gap => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn status_note(status: &ViewStatus) -> Option<String> {
    match status {
        ViewStatus::Ready => None,
        ViewStatus::Loading => Some("đang tải…".into()),
        ViewStatus::Refreshing => Some("đang cập nhật…".into()),
        ViewStatus::Disabled => Some("nhập ít nhất 2 ký tự".into()),
        ViewStatus::Error(message) => Some(format!("lỗi: {message}")),
    }
}

pub fn list(view: &ListView) {
    println!("{}", view.title);
    if let Some(note) = status_note(&view.status) {
        println!("  ({note})");
    }
    for item in &view.items {
        println!("{}", item_line(item));
    }
    if view.page.total_items > 0 {
        println!(
            "Trang {}/{} · {} phim   {}",
            view.page.current,
            view.page.total_pages,
            view.page.total_items,
            pager(&view.page)
        );
    }
}

pub fn home(view: &HomeView) {
    println!("Nổi bật");
    for item in &view.hero {
        println!("{}", item_line(item));
        println!(
            "      {}",
            normalize_image_url(&item.poster_url, &view.cdn_base)
        );
    }

    println!("\nTop 10 phim bộ hôm nay");
    for (rank, item) in view.top10.iter().enumerate() {
        println!("  {:>2}. {} ({})", rank + 1, item.name, item.slug);
    }

    println!("\nBạn đang quan tâm gì?");
    let genres: Vec<_> = GENRE_SHORTCUTS
        .iter()
        .map(|(name, slug)| format!("{name} [{slug}]"))
        .collect();
    println!("  {}", genres.join(" · "));

    for row in std::iter::once(&view.new_releases).chain(&view.rows) {
        println!("\n{} ({})", row.title, row.slug);
        if let Some(note) = status_note(&row.status) {
            println!("  ({note})");
        }
        for item in &row.items {
            println!("{}", item_line(item));
        }
    }
}

pub fn filters(data: &FilterListData) {
    for item in &data.items {
        println!("  {:<24} {}", item.slug, item.name);
    }
}

pub fn detail(movie: &MovieDetail) {
    println!("{} ({})", movie.name, movie.origin_name);
    println!("  slug      {}", movie.slug);
    println!("  năm       {}", movie.year);
    if let Some(rating) = format_rating(movie) {
        println!("  điểm      {rating}");
    }
    if !movie.episode_current.is_empty() {
        println!("  tập       {}", movie.episode_current);
    }
    if !movie.quality.is_empty() || !movie.lang.is_empty() {
        println!("  chất lượng {} · {}", movie.quality, movie.lang);
    }
    let categories: Vec<_> = movie.category.iter().map(|c| c.name.as_str()).collect();
    if !categories.is_empty() {
        println!("  thể loại  {}", categories.join(", "));
    }
    let description = strip_html(&movie.content);
    if !description.is_empty() {
        println!("\n{description}");
    }
    for server in &movie.episodes {
        let names: Vec<_> = server.server_data.iter().map(|e| e.name.as_str()).collect();
        println!("\n{} ({} tập)", server.server_name, names.len());
        println!("  {}", names.join(" "));
    }
}

pub fn watch(page: &WatchPage) {
    let view = match page {
        WatchPage::Ready(view) => view,
        WatchPage::Loading => return println!("đang tải…"),
        WatchPage::NotFound => return println!("Không tìm thấy phim"),
        WatchPage::Error(message) => return println!("lỗi: {message}"),
    };

    println!("{} ({})", view.name, view.origin_name);
    if let Some(rating) = &view.rating {
        println!("  điểm   {rating}");
    }
    println!("  poster {}", view.poster_url);

    let servers: Vec<_> = view
        .servers
        .iter()
        .map(|s| {
            if s.index == view.server_index {
                format!("[{}]", s.name)
            } else {
                s.name.clone()
            }
        })
        .collect();
    println!("  server {}", servers.join(" · "));

    match &view.current {
        Some(episode) => {
            println!("  tập    {}", episode.name);
            println!("  embed  {}", episode.link_embed);
            if !episode.link_m3u8.is_empty() {
                println!("  m3u8   {}", episode.link_m3u8);
            }
        }
        None => println!("  (chưa có tập nào)"),
    }
    if view.hidden_episodes > 0 {
        println!("  … còn {} tập", view.hidden_episodes);
    }

    if !view.description.is_empty() {
        println!("\n{}", view.description);
    }
    if !view.actors.is_empty() {
        let actors: Vec<_> = view
            .actors
            .iter()
            .map(|p| match &p.character {
                Some(character) => format!("{} ({character})", p.name),
                None => p.name.clone(),
            })
            .collect();
        println!("\nDiễn viên: {}", actors.join(", "));
    }
    if !view.related.is_empty() {
        println!("\nCó thể bạn thích");
        for item in &view.related {
            println!("{}", item_line(item));
        }
    }
}

pub fn history(entries: &[WatchProgressEntry]) {
    if entries.is_empty() {
        println!("Chưa có lịch sử xem");
        return;
    }
    for entry in entries {
        println!(
            "  {:<40} {} · tập {}",
            entry.slug, entry.server_name, entry.episode_name
        );
    }
}
