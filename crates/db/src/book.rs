use std::fmt;

use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::StoreError;

pub type BookId = i64;
pub type CategoryId = i64;

/// A persisted catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub price: f64,
    /// Weak reference; the category may not exist anymore.
    pub category_id: Option<CategoryId>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A grouping referenced by books. Seeded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Raw attribute set submitted on create or update.
///
/// `None` keeps the current value (or blank, on create). Values are kept as
/// submitted text so that validation can report non-numeric input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<String>,
    /// An empty string clears the reference.
    pub category_id: Option<String>,
}

/// Attribute set that passed validation and may be written.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attributes {
    pub title: String,
    pub author: String,
    pub price: f64,
    pub category_id: Option<CategoryId>,
}

/// Candidate record assembled from the current state plus submitted changes.
#[derive(Debug, Clone, Default)]
pub(crate) struct Draft {
    title: String,
    author: String,
    price: String,
    category_id: String,
}

impl Draft {
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
            price: book.price.to_string(),
            category_id: book
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }

    pub fn apply(mut self, changes: BookChanges) -> Self {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(author) = changes.author {
            self.author = author;
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(category_id) = changes.category_id {
            self.category_id = category_id;
        }
        self
    }

    /// Check every field and collect all violations.
    ///
    /// `category_exists` is only consulted for a well-formed category id.
    pub fn validate<F>(self, category_exists: F) -> Result<Attributes, StoreError>
    where
        F: FnOnce(CategoryId) -> Result<bool, StoreError>,
    {
        let mut errors = ValidationErrors::default();

        if self.title.trim().is_empty() {
            errors.add("title", "can't be blank");
        }
        if self.author.trim().is_empty() {
            errors.add("author", "can't be blank");
        }

        let price = match self.price.trim() {
            "" => {
                errors.add("price", "can't be blank");
                None
            }
            raw => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() => Some(value),
                _ => {
                    errors.add("price", "is not a number");
                    None
                }
            },
        };

        let category_id = match self.category_id.trim() {
            "" => None,
            raw => match raw.parse::<CategoryId>() {
                Ok(id) => {
                    if !category_exists(id)? {
                        errors.add("category", "must exist");
                    }
                    Some(id)
                }
                Err(_) => {
                    errors.add("category", "is invalid");
                    None
                }
            },
        };

        match price {
            Some(price) if errors.is_empty() => Ok(Attributes {
                title: self.title,
                author: self.author,
                price,
                category_id,
            }),
            _ => Err(StoreError::Invalid(errors)),
        }
    }
}

/// A single constraint violation on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    /// Human readable form, e.g. `Title can't be blank`.
    pub fn full_message(&self) -> String {
        let mut chars = self.field.chars();
        let field = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{} {}", field.replace('_', " "), self.message)
    }
}

/// Field-level errors collected while validating a create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Messages recorded against `field`.
    pub fn on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.errors
            .iter()
            .filter(move |error| error.field == field)
            .map(|error| error.message)
    }

    pub fn full_messages(&self) -> Vec<String> {
        self.errors.iter().map(FieldError::full_message).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_messages().join(", "))
    }
}
