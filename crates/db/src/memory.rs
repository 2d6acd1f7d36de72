//! In-process store, used for tests and the `memory` backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::book::{Book, BookChanges, BookId, Category, CategoryId, Draft};
use crate::error::StoreError;
use crate::query::{listing_order, Predicate};
use crate::store::BookStore;

#[derive(Default)]
struct Tables {
    books: BTreeMap<BookId, Book>,
    categories: BTreeMap<CategoryId, Category>,
    last_id: BookId,
}

/// Books and categories held behind a single lock.
///
/// Writers take the lock for the whole validate-then-write step, so concurrent
/// updates of one book are applied one after the other.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn create(&self, changes: BookChanges) -> Result<Book, StoreError> {
        let mut tables = self.tables.write().await;
        let attrs = Draft::default()
            .apply(changes)
            .validate(|id| Ok(tables.categories.contains_key(&id)))?;

        // Ids are never handed out twice, even after deletes.
        tables.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let book = Book {
            id: tables.last_id,
            title: attrs.title,
            author: attrs.author,
            price: attrs.price,
            category_id: attrs.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn find(&self, id: BookId) -> Result<Book, StoreError> {
        self.tables
            .read()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::book_not_found(id))
    }

    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Book, StoreError> {
        let mut tables = self.tables.write().await;
        let current = tables
            .books
            .get(&id)
            .ok_or_else(|| StoreError::book_not_found(id))?;
        let attrs = Draft::from_book(current)
            .apply(changes)
            .validate(|category| Ok(tables.categories.contains_key(&category)))?;

        let book = Book {
            id,
            title: attrs.title,
            author: attrs.author,
            price: attrs.price,
            category_id: attrs.category_id,
            created_at: current.created_at,
            updated_at: OffsetDateTime::now_utc(),
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn delete(&self, id: BookId) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::book_not_found(id))
    }

    async fn list(&self, predicate: &Predicate) -> Result<Vec<Book>, StoreError> {
        let tables = self.tables.read().await;
        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|book| predicate.matches(book))
            .cloned()
            .collect();
        books.sort_by(listing_order);
        Ok(books)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.tables.read().await.books.len())
    }

    async fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn upsert_category(&self, category: Category) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .categories
            .insert(category.id, category);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(title: &str, author: &str, price: &str) -> BookChanges {
        BookChanges {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            price: Some(price.to_string()),
            category_id: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let first = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();
        let second = store.create(attrs("Emma", "Austen", "8")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let book = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();
        store.delete(book.id).await.unwrap();

        let next = store.create(attrs("Emma", "Austen", "8")).await.unwrap();
        assert_eq!(next.id, book.id + 1);
    }

    #[tokio::test]
    async fn invalid_create_persists_nothing() {
        let store = MemoryStore::new();
        let result = store.create(attrs("", "X", "5")).await;

        assert!(matches!(result, Err(StoreError::Invalid(ref e)) if e.on("title").count() == 1));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_update_keeps_stored_record() {
        let store = MemoryStore::new();
        let book = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();

        let result = store
            .update(
                book.id,
                BookChanges {
                    title: Some("Dune Messiah".to_string()),
                    price: Some("twenty".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(StoreError::Invalid(_))));
        assert_eq!(store.find(book.id).await.unwrap(), book);
    }

    #[tokio::test]
    async fn update_bumps_updated_at_only() {
        let store = MemoryStore::new();
        let book = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();

        let updated = store
            .update(
                book.id,
                BookChanges {
                    price: Some("25.5".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, 25.5);
        assert_eq!(updated.title, "Dune");
        assert_eq!(updated.created_at, book.created_at);
        assert!(updated.updated_at >= book.updated_at);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = MemoryStore::new();

        assert!(matches!(store.find(9).await, Err(StoreError::NotFound { id: 9, .. })));
        assert!(matches!(
            store.update(9, BookChanges::default()).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(store.delete(9).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let store = MemoryStore::new();
        let keep = store.create(attrs("Emma", "Austen", "8")).await.unwrap();
        let book = store.create(attrs("Dune", "Herbert", "20")).await.unwrap();

        store.delete(book.id).await.unwrap();
        assert!(matches!(store.delete(book.id).await, Err(StoreError::NotFound { .. })));

        let remaining = store.list(&Predicate::MatchAll).await.unwrap();
        assert_eq!(remaining, vec![keep]);
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = MemoryStore::new();
        let go = store.create(attrs("Go Programming", "Donovan", "30")).await.unwrap();
        store.create(attrs("Dune", "Herbert", "20")).await.unwrap();
        let godel = store.create(attrs("Godel Escher Bach", "Hofstadter", "25")).await.unwrap();

        let found = store
            .list(&Predicate::ContainsTerm("go".to_string()))
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![godel.id, go.id]);

        let all = store.list(&Predicate::MatchAll).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn categories_are_upserted_and_sorted() {
        let store = MemoryStore::new();
        store
            .upsert_category(Category { id: 2, name: "Science".to_string() })
            .await
            .unwrap();
        store
            .upsert_category(Category { id: 1, name: "Fiction".to_string() })
            .await
            .unwrap();
        store
            .upsert_category(Category { id: 2, name: "Nonfiction".to_string() })
            .await
            .unwrap();

        let names: Vec<_> = store
            .categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Fiction", "Nonfiction"]);
        assert_eq!(store.find_category(3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn category_reference_must_exist() {
        let store = MemoryStore::new();
        store
            .upsert_category(Category { id: 4, name: "Sci-Fi".to_string() })
            .await
            .unwrap();

        let mut changes = attrs("Dune", "Herbert", "20");
        changes.category_id = Some("5".to_string());
        assert!(matches!(store.create(changes.clone()).await, Err(StoreError::Invalid(_))));

        changes.category_id = Some("4".to_string());
        let book = store.create(changes).await.unwrap();
        assert_eq!(book.category_id, Some(4));
    }
}
