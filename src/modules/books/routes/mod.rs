//! HTTP routes for the Books module.

use std::sync::Arc;

use axum::{
    response::Redirect,
    routing::get,
    Router,
};
use shelf_db::{Book, BookId, BookStore, StoreError};
use shelf_http::error::AppError;

use super::serializer::{serialize, Representation};

pub mod api;
pub mod web;

/// Shared handler state.
pub type Store = Arc<dyn BookStore>;

/// Browser-facing CRUD pages.
pub fn web(store: Store) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/books") }))
        .route("/books", get(web::index).post(web::create))
        .route("/books/new", get(web::new))
        .route(
            "/books/{id}",
            get(web::show)
                .patch(web::update)
                .put(web::update)
                .delete(web::destroy)
                .post(web::method_override),
        )
        .route("/books/{id}/edit", get(web::edit))
        .with_state(store)
}

/// JSON API, mounted under `/api/v1`.
pub fn api(store: Store) -> Router {
    Router::new()
        .route("/books", get(api::index).post(api::create))
        .route("/books/{id}", get(api::show))
        .with_state(store)
}

/// Ids that do not parse can never resolve, so they are reported as missing.
pub(crate) fn parse_id(raw: &str) -> Result<BookId, AppError> {
    raw.parse::<BookId>()
        .map_err(|_| AppError::not_found(format!("Book {} not found", raw)))
}

/// Representation of a single book with its category resolved.
pub(crate) async fn represent(store: &Store, book: &Book) -> Result<Representation, StoreError> {
    let category = match book.category_id {
        Some(id) => store.find_category(id).await?,
        None => None,
    };
    Ok(serialize(book, category.as_ref()))
}
