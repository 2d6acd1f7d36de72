use serde::{Deserialize, Deserializer};
use shelf_db::{Book, BookChanges};

/// Form fields accepted by the browser-facing create and update actions.
///
/// `_method` carries the intended verb for HTML forms, which can only POST.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookForm {
    #[serde(rename = "_method")]
    pub method: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<String>,
    pub category_id: Option<String>,
}

impl BookForm {
    pub fn changes(&self) -> BookChanges {
        BookChanges {
            title: self.title.clone(),
            author: self.author.clone(),
            price: self.price.clone(),
            category_id: self.category_id.clone(),
        }
    }
}

/// A JSON value that may arrive either as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Number(number) => number.to_string(),
            Scalar::Text(text) => text,
        }
    }
}

/// JSON body accepted by `POST /api/v1/books`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub price: Option<Scalar>,
    /// `null` clears the reference; absence leaves it untouched.
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<Scalar>>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BookPayload {
    pub fn into_changes(self) -> BookChanges {
        BookChanges {
            title: self.title,
            author: self.author,
            price: self.price.map(Scalar::into_text),
            category_id: self
                .category_id
                .map(|value| value.map(Scalar::into_text).unwrap_or_default()),
        }
    }
}

/// Values shown in the book form, either from a stored record or as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub title: String,
    pub author: String,
    pub price: String,
    pub category_id: String,
}

impl FormValues {
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

    /// Overlay submitted values so a rejected form comes back pre-filled.
    pub fn merge(mut self, changes: &BookChanges) -> Self {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(author) = &changes.author {
            self.author = author.clone();
        }
        if let Some(price) = &changes.price {
            self.price = price.clone();
        }
        if let Some(category_id) = &changes.category_id {
            self.category_id = category_id.clone();
        }
        self
    }
}

/// Query string accepted by listing and detail pages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub search: Option<String>,
    pub notice: Option<String>,
}

/// Transient success message carried on a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Created,
    Updated,
    Destroyed,
}

impl Notice {
    pub fn key(self) -> &'static str {
        match self {
            Notice::Created => "created",
            Notice::Updated => "updated",
            Notice::Destroyed => "destroyed",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Notice::Created => "Book was successfully created.",
            Notice::Updated => "Book was successfully updated.",
            Notice::Destroyed => "Book was successfully destroyed.",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "created" => Some(Notice::Created),
            "updated" => Some(Notice::Updated),
            "destroyed" => Some(Notice::Destroyed),
            _ => None,
        }
    }
}
