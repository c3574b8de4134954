use std::sync::Arc;

use super::models::{Book, BookDraft};
use super::store::{BookStore, StoreError};

#[derive(thiserror::Error, Debug)]
pub enum BookError {
    #[error("A book with the same title and author already exists.")]
    Duplicate { title: String, author: String },

    #[error("Book ID mismatch.")]
    MismatchedId { path_id: i64, body_id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Business rules on top of a [`BookStore`]. Ordering, paging and scoring
/// belong to the HTTP handlers.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn BookStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list_all(&self) -> Result<Vec<Book>, BookError> {
        Ok(self.store.list_active().await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Book>, BookError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn add(&self, draft: &BookDraft) -> Result<Book, BookError> {
        if self
            .store
            .exists_by_title_author(&draft.title, &draft.author)
            .await?
        {
            tracing::debug!(title = %draft.title, author = %draft.author, "duplicate book rejected");
            return Err(BookError::Duplicate {
                title: draft.title.clone(),
                author: draft.author.clone(),
            });
        }

        let book = self.store.insert(draft).await?;
        tracing::info!(book_id = book.id, title = %book.title, "book added");
        Ok(book)
    }

    /// Replace the stored record. `Ok(false)` means no row had that id.
    pub async fn update(&self, id: i64, book: &Book) -> Result<bool, BookError> {
        if book.id != id {
            return Err(BookError::MismatchedId {
                path_id: id,
                body_id: book.id,
            });
        }

        let updated = self.store.replace(book).await?;
        tracing::debug!(book_id = id, updated, "book replaced");
        Ok(updated)
    }

    pub async fn ping(&self) -> Result<(), BookError> {
        Ok(self.store.ping().await?)
    }

    /// Soft-delete. `Ok(false)` means the id was unknown or already deleted.
    pub async fn delete(&self, id: i64) -> Result<bool, BookError> {
        let deleted = self.store.soft_delete(id).await?;
        if deleted {
            tracing::info!(book_id = id, "book soft-deleted");
        }
        Ok(deleted)
    }
}
