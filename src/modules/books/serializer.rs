//! Flat external representation of a book, shared by the JSON API and the
//! HTML views.

use std::collections::HashMap;

use serde::Serialize;
use shelf_db::{Book, BookId, Category, CategoryId};
use time::OffsetDateTime;

/// Categories keyed by id, used to resolve `category_name`.
pub type CategoryIndex = HashMap<CategoryId, Category>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Representation {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub category_id: Option<CategoryId>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub category_name: Option<String>,
}

pub fn index_categories(categories: impl IntoIterator<Item = Category>) -> CategoryIndex {
    categories
        .into_iter()
        .map(|category| (category.id, category))
        .collect()
}

/// Project `book`; `category` only counts when it is the one the book points at.
pub fn serialize(book: &Book, category: Option<&Category>) -> Representation {
    let category_name = category
        .filter(|category| book.category_id == Some(category.id))
        .map(|category| category.name.clone());

    Representation {
        id: book.id,
        title: book.title.clone(),
        author: book.author.clone(),
        price: book.price,
        category_id: book.category_id,
        created_at: book.created_at,
        updated_at: book.updated_at,
        category_name,
    }
}

pub fn serialize_many(books: &[Book], categories: &CategoryIndex) -> Vec<Representation> {
    books
        .iter()
        .map(|book| {
            let category = book.category_id.and_then(|id| categories.get(&id));
            serialize(book, category)
        })
        .collect()
}
