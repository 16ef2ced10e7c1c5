//! Offset pagination for "Load more" listings.
//!
//! Listings fetch fixed-size pages and append them to what is already shown.
//! The accumulator drops items that were already seen, so an item that
//! shifts across a page boundary between requests is listed once.

use std::collections::HashSet;

/// Anything with a stable backend identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Offset of a 1-based page. Page `0` is treated as page `1`.
#[must_use]
pub const fn page_offset(page: u32, limit: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(limit)
}

/// Deepest page a "Load more" listing fetches.
pub const MAX_PAGES: u32 = 50;

/// Whether more pages exist after `page` pages of `limit` items each.
#[must_use]
pub fn has_more_pages(count: u64, limit: u32, page: u32) -> bool {
    count > u64::from(limit) * u64::from(page)
}

/// Pages needed to show `count` items, `limit` per page. At least 1.
#[must_use]
pub fn page_count(count: u64, limit: u32) -> u32 {
    if limit == 0 {
        return 1;
    }
    let pages = count.div_ceil(u64::from(limit)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// The page after `page`, unless that would pass [`MAX_PAGES`].
#[must_use]
pub fn following_page(page: u32) -> Option<u32> {
    page.checked_add(1).filter(|next| *next <= MAX_PAGES)
}

/// The "Load more" target after `page` while the listing has more items.
#[must_use]
pub fn next_page(count: u64, limit: u32, page: u32) -> Option<u32> {
    if has_more_pages(count, limit, page) {
        following_page(page)
    } else {
        None
    }
}

/// Items accumulated across pages, de-duplicated by id.
#[derive(Debug, Clone)]
pub struct Accumulator<T> {
    items: Vec<T>,
    seen: HashSet<String>,
    total: u64,
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            total: 0,
        }
    }
}

impl<T: Identified> Accumulator<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page, skipping ids that are already present.
    pub fn extend(&mut self, page: impl IntoIterator<Item = T>) {
        for item in page {
            if self.seen.insert(item.id().to_owned()) {
                self.items.push(item);
            }
        }
    }

    /// Record the backend's total count for the listing.
    pub const fn set_total(&mut self, total: u64) {
        self.total = total;
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// `total > items shown`.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total > self.items.len() as u64
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str);

    impl Identified for Item {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(2, 20), 20);
        assert_eq!(page_offset(5, 8), 32);
        assert_eq!(page_offset(0, 20), 0);
    }

    #[test]
    fn test_accumulator_skips_duplicates() {
        let mut acc = Accumulator::new();
        acc.extend([Item("a"), Item("b")]);
        acc.extend([Item("b"), Item("c")]);

        assert_eq!(acc.items(), &[Item("a"), Item("b"), Item("c")]);
    }

    #[test]
    fn test_accumulator_has_more() {
        let mut acc = Accumulator::new();
        acc.set_total(3);
        acc.extend([Item("a"), Item("b")]);
        assert!(acc.has_more());

        acc.extend([Item("c")]);
        assert!(!acc.has_more());
    }

    #[test]
    fn test_accumulator_duplicates_do_not_count_toward_shown() {
        let mut acc = Accumulator::new();
        acc.set_total(3);
        acc.extend([Item("a"), Item("b")]);
        acc.extend([Item("b")]);
        assert_eq!(acc.len(), 2);
        assert!(acc.has_more());
    }

    #[test]
    fn test_has_more_pages() {
        assert!(has_more_pages(11, 5, 2));
        assert!(!has_more_pages(10, 5, 2));
        assert!(!has_more_pages(0, 5, 1));
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(5, 0), 1);
        assert_eq!(page_count(u64::MAX, 1), u32::MAX);
    }

    #[test]
    fn test_next_page_stops_at_max_pages() {
        assert_eq!(next_page(100, 10, 1), Some(2));
        assert_eq!(next_page(100, 10, 10), None);
        assert_eq!(next_page(u64::MAX, 10, MAX_PAGES), None);
        assert_eq!(next_page(u64::MAX, 10, u32::MAX), None);
    }
}
