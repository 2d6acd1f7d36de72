//! Request helpers shared by the books route tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use shelf_db::{
    sqlite::CATALOG_SCHEMA, Backend, Book, BookChanges, Category, MemoryStore, SqliteStore,
};
use tower::ServiceExt;

use super::routes::Store;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

pub struct TestBody {
    content_type: &'static str,
    bytes: String,
}

pub fn form_body(fields: &[(&str, &str)]) -> TestBody {
    TestBody {
        content_type: "application/x-www-form-urlencoded",
        bytes: serde_urlencoded::to_string(fields).unwrap(),
    }
}

pub fn json_body(value: serde_json::Value) -> TestBody {
    TestBody {
        content_type: "application/json",
        bytes: value.to_string(),
    }
}

/// Every backend the route scenarios run against.
pub const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

/// Empty store with "Fiction" (1) and "Science" (2) categories.
pub async fn seeded_store(backend: Backend) -> Store {
    let store: Store = match backend {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::Sqlite => {
            let sqlite = SqliteStore::open_in_memory().unwrap();
            sqlite
                .migrate(vec![("books".to_string(), CATALOG_SCHEMA)])
                .await
                .unwrap();
            Arc::new(sqlite)
        }
    };
    for (id, name) in [(1, "Fiction"), (2, "Science")] {
        store
            .upsert_category(Category {
                id,
                name: name.to_string(),
            })
            .await
            .unwrap();
    }
    store
}

pub async fn create_book(store: &Store, title: &str, author: &str) -> Book {
    store
        .create(BookChanges {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            price: Some("100".to_string()),
            category_id: None,
        })
        .await
        .unwrap()
}

pub async fn send(router: &Router, method: Method, uri: &str, body: Option<TestBody>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, body.content_type)
            .body(Body::from(body.bytes)),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}
