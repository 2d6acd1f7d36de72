//! Book catalog: HTML pages under `/books` and a JSON API under `/api/v1/books`.

pub mod models;
pub mod query;
pub mod routes;
pub mod serializer;
pub mod views;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_kernel::{InitCtx, Migration, Module};

use routes::Store;

/// Books module backed by the configured store
pub struct BooksModule {
    store: Store,
}

impl BooksModule {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    /// Upsert the configured categories so forms can offer them.
    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for category in &ctx.settings.catalog.categories {
            self.store.upsert_category(category.clone()).await?;
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.db.backend(),
            categories = ctx.settings.catalog.categories.len(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::web(self.store.clone())
    }

    fn api_routes(&self) -> Router {
        routes::api(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book = json!({
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        });

        Some(json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "List books, newest first",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "search",
                            "in": "query",
                            "required": false,
                            "description": "Case-insensitive substring of title or author",
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": error("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookInput" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Created", "content": book.clone() },
                            "400": error("Malformed body or unknown field"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Fetch one book",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "integer", "format": "int64" }
                        }],
                        "responses": {
                            "200": { "description": "The book", "content": book },
                            "404": error("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "price": { "type": "number" },
                            "category_id": { "type": ["integer", "null"], "format": "int64" },
                            "created_at": { "type": "string", "format": "date-time" },
                            "updated_at": { "type": "string", "format": "date-time" },
                            "category_name": { "type": ["string", "null"] }
                        },
                        "required": [
                            "id", "title", "author", "price", "category_id",
                            "created_at", "updated_at", "category_name"
                        ]
                    },
                    "BookInput": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "price": { "type": ["number", "string"] },
                            "category_id": { "type": ["integer", "string", "null"] }
                        },
                        "required": ["title", "author", "price"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![shelf_db::sqlite::CATALOG_SCHEMA]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(store: Store) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(store))
}
