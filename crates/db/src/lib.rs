//! Storage for the shelf catalog: records, validation, listing predicates,
//! and the memory and SQLite `BookStore` backends.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

pub mod book;
pub mod error;
pub mod memory;
pub mod query;
pub mod sqlite;
pub mod store;

pub use book::{Book, BookChanges, BookId, Category, CategoryId, FieldError, ValidationErrors};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::Predicate;
pub use sqlite::SqliteStore;
pub use store::BookStore;

/// Migration definition contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Storage backend selected by configuration.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Memory,
}

/// Handle to the configured store.
#[derive(Clone)]
pub enum Database {
    Memory(Arc<MemoryStore>),
    Sqlite(Arc<SqliteStore>),
}

impl Database {
    /// Open the store for `backend`. `path` is ignored by the memory backend.
    pub fn connect(backend: Backend, path: &Path) -> anyhow::Result<Self> {
        let db = match backend {
            Backend::Memory => Self::in_memory(),
            Backend::Sqlite => Self::Sqlite(Arc::new(
                SqliteStore::open(path).context("failed to open sqlite store")?,
            )),
        };
        tracing::info!(target: "shelf-db", backend = ?backend, path = %path.display(), "database ready");
        Ok(db)
    }

    pub fn in_memory() -> Self {
        Self::Memory(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Memory(_) => Backend::Memory,
            Self::Sqlite(_) => Backend::Sqlite,
        }
    }

    pub fn store(&self) -> Arc<dyn BookStore> {
        match self {
            Self::Memory(store) => store.clone(),
            Self::Sqlite(store) => store.clone(),
        }
    }

    /// Apply pending migrations. The memory backend has no schema.
    pub async fn migrate(&self, migrations: Vec<(String, Migration)>) -> anyhow::Result<usize> {
        match self {
            Self::Memory(_) => {
                tracing::debug!(target: "shelf-db", "memory backend, skipping migrations");
                Ok(0)
            }
            Self::Sqlite(store) => store
                .migrate(migrations)
                .await
                .context("failed to apply migrations"),
        }
    }
}
