use async_trait::async_trait;

use crate::book::{Book, BookChanges, BookId, Category, CategoryId};
use crate::error::StoreError;
use crate::query::Predicate;

/// Durable collection of books plus the categories they may reference.
///
/// `create` and `update` validate the merged attribute set before writing;
/// a rejected change leaves the store untouched.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Validate and persist a new book, assigning a fresh id and timestamps.
    async fn create(&self, changes: BookChanges) -> Result<Book, StoreError>;

    async fn find(&self, id: BookId) -> Result<Book, StoreError>;

    /// Apply `changes` on top of the current record. Bumps `updated_at`.
    async fn update(&self, id: BookId, changes: BookChanges) -> Result<Book, StoreError>;

    /// Hard delete.
    async fn delete(&self, id: BookId) -> Result<(), StoreError>;

    /// Books matching `predicate`, newest first.
    async fn list(&self, predicate: &Predicate) -> Result<Vec<Book>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// All categories ordered by name.
    async fn categories(&self) -> Result<Vec<Category>, StoreError>;

    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Insert or rename a category by id.
    async fn upsert_category(&self, category: Category) -> Result<(), StoreError>;
}
