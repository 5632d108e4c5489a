use std::collections::BTreeSet;

use crate::tiktek_client::Book;

/// Books whose title contains `query` case-insensitively, in their original order.
pub fn filter_by_title(books: &[Book], query: &str) -> Vec<Book> {
    let needle = query.to_lowercase();
    books
        .iter()
        .filter(|b| b.title.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Display order: favorites first, then by title. Stable for equal titles.
pub fn order_for_display(books: &mut [Book], favorites: &BTreeSet<String>) {
    books.sort_by(|a, b| {
        let a_fav = favorites.contains(&a.id);
        let b_fav = favorites.contains(&b.id);
        b_fav.cmp(&a_fav).then_with(|| a.title.cmp(&b.title))
    });
}

/// What the catalog shows for a fetched list, the free-text query and the favorite set.
/// A blank query (after trimming) shows everything.
pub fn visible_books(books: &[Book], query: &str, favorites: &BTreeSet<String>) -> Vec<Book> {
    let query = query.trim();
    let mut visible = if query.is_empty() {
        books.to_vec()
    } else {
        filter_by_title(books, query)
    };
    order_for_display(&mut visible, favorites);
    visible
}
