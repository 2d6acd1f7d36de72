//! Listing filter and ordering shared by all store backends.

use std::cmp::Ordering;

use crate::book::Book;

/// Escape character used when a predicate is rendered as a SQL `LIKE` pattern.
pub const LIKE_ESCAPE: char = '\\';

/// Filter applied to the book collection during listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Predicate {
    #[default]
    MatchAll,
    /// Case-insensitive substring of title or author.
    ContainsTerm(String),
}

impl Predicate {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            Predicate::MatchAll => true,
            Predicate::ContainsTerm(term) => {
                let needle = term.to_lowercase();
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
            }
        }
    }

    /// Lower-cased `%term%` with wildcards escaped, or `None` for `MatchAll`.
    ///
    /// Compare it against lower-cased columns; the folding matches `matches`.
    pub fn like_pattern(&self) -> Option<String> {
        match self {
            Predicate::MatchAll => None,
            Predicate::ContainsTerm(term) => {
                Some(format!("%{}%", escape_like(&term.to_lowercase())))
            }
        }
    }
}

/// Escape `LIKE` metacharacters so they match literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Listing order: newest first, higher id first on equal timestamps.
pub fn listing_order(a: &Book, b: &Book) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}
