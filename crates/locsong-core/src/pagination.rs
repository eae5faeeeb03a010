/// One slot in a pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(u32),
    Gap,
}

/// Pages around `current`, always including the first and last page, with
/// a [`PageSlot::Gap`] wherever pages are skipped.
///
/// `current` is clamped into `1..=total`, and `total` is at least 1.
pub fn page_range(current: u32, total: u32, delta: u32) -> Vec<PageSlot> {
    let total = total.max(1);
    let current = current.clamp(1, total);
    let left = current.saturating_sub(delta).max(1);
    let right = current.saturating_add(delta).min(total);

    let mut slots = Vec::new();
    if left > 1 {
        slots.push(PageSlot::Page(1));
        if left > 2 {
            slots.push(PageSlot::Gap);
        }
    }
    slots.extend((left..=right).map(PageSlot::Page));
    if right < total {
        if right < total - 1 {
            slots.push(PageSlot::Gap);
        }
        slots.push(PageSlot::Page(total));
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::PageSlot::{Gap, Page};
    use super::*;

    #[test]
    fn test_middle_page_has_both_gaps() {
        assert_eq!(
            page_range(10, 20, 2),
            vec![Page(1), Gap, Page(8), Page(9), Page(10), Page(11), Page(12), Gap, Page(20)]
        );
    }

    #[test]
    fn test_edges() {
        assert_eq!(page_range(1, 5, 2), vec![Page(1), Page(2), Page(3), Gap, Page(5)]);
        assert_eq!(page_range(4, 5, 2), vec![Page(1), Page(2), Page(3), Page(4), Page(5)]);
        assert_eq!(page_range(1, 1, 2), vec![Page(1)]);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        assert_eq!(page_range(0, 0, 2), vec![Page(1)]);
        assert_eq!(page_range(99, 3, 2), vec![Page(1), Page(2), Page(3)]);
    }
}
