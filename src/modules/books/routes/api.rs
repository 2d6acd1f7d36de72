use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use shelf_http::error::AppError;

use super::{parse_id, represent, Store};
use crate::modules::books::{
    models::{BookPayload, PageParams},
    query::build_listing,
    serializer::{index_categories, serialize_many, Representation},
};

/// GET /api/v1/books
pub async fn index(
    State(store): State<Store>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Representation>>, AppError> {
    let predicate = build_listing(params.search.as_deref());
    let books = store.list(&predicate).await?;
    let categories = index_categories(store.categories().await?);
    Ok(Json(serialize_many(&books, &categories)))
}

/// GET /api/v1/books/{id}
pub async fn show(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Json<Representation>, AppError> {
    let book = store.find(parse_id(&id)?).await?;
    Ok(Json(represent(&store, &book).await?))
}

/// POST /api/v1/books
pub async fn create(
    State(store): State<Store>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let book = store.create(payload.into_changes()).await?;
    tracing::info!(book_id = book.id, "book created via api");

    let location = format!("/api/v1/books/{}", book.id);
    let representation = represent(&store, &book).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(representation),
    ))
}
