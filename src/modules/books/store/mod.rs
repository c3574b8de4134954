//! Persistence boundary for book records.
//!
//! Every read filters out soft-deleted rows; nothing is ever physically
//! removed. The duplicate check and the insert are separate calls, so two
//! concurrent adds of the same (title, author) pair can both succeed.

mod memory;
mod postgres;

pub use memory::InMemoryBookStore;
pub use postgres::PostgresBookStore;

use async_trait::async_trait;

use super::models::{Book, BookDraft};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// All records that are not soft-deleted, in id order
    async fn list_active(&self) -> Result<Vec<Book>, StoreError>;

    /// Active record with the given id
    async fn get_by_id(&self, id: i64) -> Result<Option<Book>, StoreError>;

    /// Persist a new record with zero views and return it with its assigned id
    async fn insert(&self, draft: &BookDraft) -> Result<Book, StoreError>;

    /// Overwrite every field of the active row with `book.id`; false if it is
    /// missing or already deleted, so a stale copy never revives a row
    async fn replace(&self, book: &Book) -> Result<bool, StoreError>;

    /// Flag an active record as deleted; false if it is missing or already deleted
    async fn soft_delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Exact, case-sensitive match on both fields among active records
    async fn exists_by_title_author(&self, title: &str, author: &str)
        -> Result<bool, StoreError>;

    /// Cheap round trip proving the backing storage answers
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
