use thiserror::Error;

use crate::book::{BookId, ValidationErrors};

/// Errors surfaced by every `BookStore` backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("validation failed: {0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn book_not_found(id: BookId) -> Self {
        Self::NotFound { entity: "Book", id }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(anyhow::Error::new(err).context("sqlite query failed"))
    }
}
