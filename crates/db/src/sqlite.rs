//! Embedded SQLite backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::book::{Attributes, Book, BookChanges, BookId, Category, CategoryId, Draft};
use crate::error::StoreError;
use crate::query::Predicate;
use crate::store::BookStore;
use crate::Migration;

const BOOK_COLUMNS: &str = "id, title, author, price, category_id, created_at, updated_at";

/// SQL function lower-casing with Unicode rules; the built-in `lower` and
/// `LIKE` only fold ASCII.
const FOLD_CASE: &str = "fold_case";

/// Schema for the catalog tables.
///
/// Timestamps are unix nanoseconds so that ordering is numeric.
/// `AUTOINCREMENT` keeps deleted ids from being handed out again.
pub const CATALOG_SCHEMA: Migration = Migration {
    id: "001_catalog",
    up: r#"
        CREATE TABLE IF NOT EXISTS categories (
            id   INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS books (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT    NOT NULL,
            author      TEXT    NOT NULL,
            price       REAL    NOT NULL,
            category_id INTEGER,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS books_listing_idx ON books (created_at DESC, id DESC);
        "#,
};

/// SQLite-backed `BookStore`. Every call runs on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database at {}", path.display()))?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .context("failed to enable WAL mode")?;
        tracing::debug!(target: "shelf-db", journal_mode = %mode, "sqlite opened");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.create_scalar_function(
            FOLD_CASE,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<String>(0)?.to_lowercase()),
        )
        .with_context(|| format!("failed to register {} function", FOLD_CASE))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend(anyhow!("sqlite connection lock poisoned")))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(anyhow::Error::new(e).context("sqlite task failed")))?
    }

    /// Apply migrations not yet recorded in `schema_migrations`.
    ///
    /// Returns how many were applied.
    pub async fn migrate(&self, migrations: Vec<(String, Migration)>) -> Result<usize, StoreError> {
        self.call(move |conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    module     TEXT    NOT NULL,
                    id         TEXT    NOT NULL,
                    applied_at INTEGER NOT NULL,
                    PRIMARY KEY (module, id)
                );",
            )?;

            let mut applied = 0;
            for (module, migration) in migrations {
                let tx = conn.transaction()?;
                let done: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM schema_migrations WHERE module = ?1 AND id = ?2",
                        params![module, migration.id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if done.is_some() {
                    continue;
                }

                tx.execute_batch(migration.up)?;
                tx.execute(
                    "INSERT INTO schema_migrations (module, id, applied_at) VALUES (?1, ?2, ?3)",
                    params![module, migration.id, to_nanos(OffsetDateTime::now_utc())?],
                )?;
                tx.commit()?;

                tracing::info!(target: "shelf-db", %module, migration = migration.id, "applied migration");
                applied += 1;
            }
            Ok(applied)
        })
        .await
    }
}

fn to_nanos(at: OffsetDateTime) -> Result<i64, StoreError> {
    i64::try_from(at.unix_timestamp_nanos())
        .map_err(|_| StoreError::Backend(anyhow!("timestamp {} does not fit in i64 nanoseconds", at)))
}

fn timestamp_at(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let nanos: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn book_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        price: row.get(3)?,
        category_id: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}

fn find_book(conn: &Connection, id: BookId) -> Result<Book, StoreError> {
    conn.query_row(
        &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
        params![id],
        book_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::book_not_found(id))
}

fn category_exists(conn: &Connection, id: CategoryId) -> Result<bool, StoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM categories WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

#[async_trait]
impl BookStore for SqliteStore {
    async fn create(&self, changes: BookChanges) -> Result<Book, StoreError> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let Attributes {
                title,
                author,
                price,
                category_id,
            } = Draft::default()
                .apply(changes)
                .validate(|id| category_exists(&tx, id))?;

            let now = OffsetDateTime::now_utc();
            tx.execute(
                "INSERT INTO books (title, author, price, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![title, author, price, category_id, to_nanos(now)?],
            )?;
            let id = tx.last_insert_rowid();
            let book = find_book(&tx, id)?;
            tx.commit()?;
            Ok(book)
        })
        .await
    }

    async fn find(&self, id: BookId) -> Result<Book, StoreError> {
        self.call(move |conn| find_book(conn, id)).await
    }

    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Book, StoreError> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let current = find_book(&tx, id)?;
            let Attributes {
                title,
                author,
                price,
                category_id,
            } = Draft::from_book(&current)
                .apply(changes)
                .validate(|category| category_exists(&tx, category))?;

            tx.execute(
                "UPDATE books
                 SET title = ?1, author = ?2, price = ?3, category_id = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    title,
                    author,
                    price,
                    category_id,
                    to_nanos(OffsetDateTime::now_utc())?,
                    id
                ],
            )?;
            let book = find_book(&tx, id)?;
            tx.commit()?;
            Ok(book)
        })
        .await
    }

    async fn delete(&self, id: BookId) -> Result<(), StoreError> {
        self.call(move |conn| {
            match conn.execute("DELETE FROM books WHERE id = ?1", params![id])? {
                0 => Err(StoreError::book_not_found(id)),
                _ => Ok(()),
            }
        })
        .await
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Book>, StoreError> {
        let pattern = predicate.like_pattern();
        self.call(move |conn| {
            let books = match pattern {
                Some(pattern) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {BOOK_COLUMNS} FROM books
                         WHERE {FOLD_CASE}(title) LIKE ?1 ESCAPE '\\'
                            OR {FOLD_CASE}(author) LIKE ?1 ESCAPE '\\'
                         ORDER BY created_at DESC, id DESC"
                    ))?;
                    let rows = stmt.query_map(params![pattern], book_from_row)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC, id DESC"
                    ))?;
                    let rows = stmt.query_map([], book_from_row)?;
                    rows.collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(books)
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.call(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name, id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        self.call(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name FROM categories WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    async fn upsert_category(&self, category: Category) -> Result<(), StoreError> {
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO categories (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![category.id, category.name],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .migrate(vec![("books".to_string(), CATALOG_SCHEMA)])
            .await
            .unwrap();
        store
    }

    fn attrs(title: &str, author: &str, price: &str) -> BookChanges {
        BookChanges {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            price: Some(price.to_string()),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        let migrations = vec![("books".to_string(), CATALOG_SCHEMA)];

        assert_eq!(store.migrate(migrations.clone()).await.unwrap(), 1);
        assert_eq!(store.migrate(migrations).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let store = store().await;
        let book = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();
        assert_eq!(store.find(book.id).await.unwrap(), book);

        let updated = store
            .update(
                book.id,
                BookChanges {
                    title: Some("Dune Messiah".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.price, 20.0);
        assert_eq!(updated.created_at, book.created_at);

        store.delete(book.id).await.unwrap();
        assert!(matches!(store.delete(book.id).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(store.find(book.id).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let store = store().await;
        let result = store.create(attrs("", "X", "5")).await;

        assert!(matches!(result, Err(StoreError::Invalid(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = store().await;
        let first = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();
        store.delete(first.id).await.unwrap();

        let second = store.create(attrs("Emma", "Austen", "8")).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = store().await;
        let go = store.create(attrs("Go Programming", "Donovan", "30")).await.unwrap();
        store.create(attrs("Dune", "Herbert", "20")).await.unwrap();
        let godel = store.create(attrs("Godel Escher Bach", "Hofstadter", "25")).await.unwrap();

        let ids: Vec<_> = store
            .list(&Predicate::ContainsTerm("go".to_string()))
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![godel.id, go.id]);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let store = store().await;
        let elan = store.create(attrs("Élan Vital", "Bergson", "12")).await.unwrap();
        let strasse = store.create(attrs("Die Straße", "ÖZDEMIR", "9")).await.unwrap();
        store.create(attrs("Dune", "Herbert", "20")).await.unwrap();

        let hits = store
            .list(&Predicate::ContainsTerm("élan".to_string()))
            .await
            .unwrap();
        assert_eq!(hits, vec![elan]);

        let hits = store
            .list(&Predicate::ContainsTerm("Özdemir".to_string()))
            .await
            .unwrap();
        assert_eq!(hits, vec![strasse]);
    }

    #[test]
    fn out_of_range_timestamps_are_rejected() {
        let far_future = time::macros::datetime!(9999-01-01 0:00 UTC);
        assert!(matches!(to_nanos(far_future), Err(StoreError::Backend(_))));

        let now = OffsetDateTime::now_utc();
        assert_eq!(
            i128::from(to_nanos(now).unwrap()),
            now.unix_timestamp_nanos()
        );
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let store = store().await;
        store.create(attrs("abc", "Nobody", "1")).await.unwrap();
        let literal = store.create(attrs("a_c", "Nobody", "1")).await.unwrap();
        let percent = store.create(attrs("100% Rust", "Nobody", "1")).await.unwrap();
        store.create(attrs("1000 Rust", "Nobody", "1")).await.unwrap();

        let underscore = store
            .list(&Predicate::ContainsTerm("a_c".to_string()))
            .await
            .unwrap();
        assert_eq!(underscore, vec![literal]);

        let percent_hits = store
            .list(&Predicate::ContainsTerm("100%".to_string()))
            .await
            .unwrap();
        assert_eq!(percent_hits, vec![percent]);
    }

    #[tokio::test]
    async fn category_references_follow_upserts() {
        let store = store().await;
        store
            .upsert_category(Category {
                id: 1,
                name: "Fiction".to_string(),
            })
            .await
            .unwrap();

        let mut changes = attrs("Dune", "Herbert", "20");
        changes.category_id = Some("1".to_string());
        let book = store.create(changes).await.unwrap();
        assert_eq!(book.category_id, Some(1));

        store
            .upsert_category(Category {
                id: 1,
                name: "Science Fiction".to_string(),
            })
            .await
            .unwrap();
        let category = store.find_category(1).await.unwrap().unwrap();
        assert_eq!(category.name, "Science Fiction");
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");

        let book = {
            let store = SqliteStore::open(&path).unwrap();
            store
                .migrate(vec![("books".to_string(), CATALOG_SCHEMA)])
                .await
                .unwrap();
            store.create(attrs("Dune", "Herbert", "20")).await.unwrap()
        };

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.find(book.id).await.unwrap(), book);
    }
}
