//! Browser-facing book pages: list, show, form states, and the mutations
//! that redirect back to them.

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use shelf_db::{BookChanges, BookId, StoreError};
use shelf_http::error::AppError;

use super::{parse_id, represent, Store};
use crate::modules::books::{
    models::{BookForm, FormValues, Notice, PageParams},
    query::build_listing,
    serializer::{index_categories, serialize_many},
    views,
};

/// Error rendered as an HTML page with the matching status.
#[derive(Debug)]
pub struct PageError(AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for PageError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        self.0.trace();
        let status = self.0.status();
        let page = views::error_page(status, &self.0.public_message());
        (status, Html(page)).into_response()
    }
}

fn notice(params: &PageParams) -> Option<&'static str> {
    params
        .notice
        .as_deref()
        .and_then(Notice::from_key)
        .map(Notice::message)
}

fn form_body(form: Result<Form<BookForm>, FormRejection>) -> Result<BookForm, PageError> {
    match form {
        Ok(Form(form)) => Ok(form),
        Err(rejection) => Err(AppError::bad_request(rejection.body_text()).into()),
    }
}

fn redirect_with(path: &str, notice: Notice) -> Response {
    Redirect::to(&format!("{}?notice={}", path, notice.key())).into_response()
}

/// GET /books
pub async fn index(
    State(store): State<Store>,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, PageError> {
    let predicate = build_listing(params.search.as_deref());
    let books = store.list(&predicate).await?;
    let categories = index_categories(store.categories().await?);

    let books = serialize_many(&books, &categories);
    Ok(Html(views::index(
        &books,
        params.search.as_deref(),
        notice(&params),
    )))
}

/// GET /books/{id}
pub async fn show(
    State(store): State<Store>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, PageError> {
    let book = store.find(parse_id(&id)?).await?;
    let representation = represent(&store, &book).await?;
    Ok(Html(views::show(&representation, notice(&params))))
}

/// GET /books/new
pub async fn new(State(store): State<Store>) -> Result<Html<String>, PageError> {
    let categories = store.categories().await?;
    Ok(Html(views::new_form(&FormValues::default(), None, &categories)))
}

/// GET /books/{id}/edit
pub async fn edit(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Html<String>, PageError> {
    let book = store.find(parse_id(&id)?).await?;
    let categories = store.categories().await?;
    Ok(Html(views::edit_form(
        book.id,
        &FormValues::from_book(&book),
        None,
        &categories,
    )))
}

/// POST /books
pub async fn create(
    State(store): State<Store>,
    form: Result<Form<BookForm>, FormRejection>,
) -> Result<Response, PageError> {
    let changes = form_body(form)?.changes();

    match store.create(changes.clone()).await {
        Ok(book) => {
            tracing::info!(book_id = book.id, "book created");
            Ok(redirect_with(&format!("/books/{}", book.id), Notice::Created))
        }
        Err(StoreError::Invalid(errors)) => {
            let values = FormValues::default().merge(&changes);
            let categories = store.categories().await?;
            let page = views::new_form(&values, Some(&errors), &categories);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// PATCH|PUT /books/{id}
pub async fn update(
    State(store): State<Store>,
    Path(id): Path<String>,
    form: Result<Form<BookForm>, FormRejection>,
) -> Result<Response, PageError> {
    let id = parse_id(&id)?;
    let form = form_body(form)?;
    update_book(&store, id, form.changes()).await
}

/// DELETE /books/{id}
pub async fn destroy(
    State(store): State<Store>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    destroy_book(&store, parse_id(&id)?).await
}

/// POST /books/{id} with `_method` set by an HTML form
pub async fn method_override(
    State(store): State<Store>,
    Path(id): Path<String>,
    form: Result<Form<BookForm>, FormRejection>,
) -> Result<Response, PageError> {
    let id = parse_id(&id)?;
    let form = form_body(form)?;
    let method = form.method.as_deref().map(str::to_ascii_lowercase);

    match method.as_deref() {
        Some("patch" | "put") => update_book(&store, id, form.changes()).await,
        Some("delete") => destroy_book(&store, id).await,
        other => Err(AppError::bad_request(format!(
            "unsupported _method '{}'",
            other.unwrap_or_default()
        ))
        .into()),
    }
}

async fn update_book(store: &Store, id: BookId, changes: BookChanges) -> Result<Response, PageError> {
    match store.update(id, changes.clone()).await {
        Ok(book) => {
            tracing::info!(book_id = book.id, "book updated");
            Ok(redirect_with(&format!("/books/{}", book.id), Notice::Updated))
        }
        Err(StoreError::Invalid(errors)) => {
            let current = store.find(id).await?;
            let values = FormValues::from_book(&current).merge(&changes);
            let categories = store.categories().await?;
            let page = views::edit_form(id, &values, Some(&errors), &categories);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn destroy_book(store: &Store, id: BookId) -> Result<Response, PageError> {
    store.delete(id).await?;
    tracing::info!(book_id = id, "book destroyed");
    Ok(redirect_with("/books", Notice::Destroyed))
}
