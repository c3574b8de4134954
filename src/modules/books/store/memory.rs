use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookDraft};

#[derive(Debug)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Book>,
}

/// Process-local store used for local runs and tests.
#[derive(Debug)]
pub struct InMemoryBookStore {
    table: RwLock<Table>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    /// Every row including soft-deleted ones.
    pub fn all_rows(&self) -> Vec<Book> {
        self.table.read().rows.values().cloned().collect()
    }
}

impl Default for InMemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn list_active(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self
            .table
            .read()
            .rows
            .values()
            .filter(|book| !book.is_deleted)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>, StoreError> {
        Ok(self
            .table
            .read()
            .rows
            .get(&id)
            .filter(|book| !book.is_deleted)
            .cloned())
    }

    async fn insert(&self, draft: &BookDraft) -> Result<Book, StoreError> {
        let mut table = self.table.write();
        let id = table.next_id;
        table.next_id += 1;

        let book = Book {
            id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            publication_year: draft.publication_year,
            views: 0,
            is_deleted: false,
        };
        table.rows.insert(id, book.clone());
        Ok(book)
    }

    async fn replace(&self, book: &Book) -> Result<bool, StoreError> {
        let mut table = self.table.write();
        match table.rows.get_mut(&book.id) {
            Some(row) if !row.is_deleted => {
                *row = book.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut table = self.table.write();
        match table.rows.get_mut(&id) {
            Some(row) if !row.is_deleted => {
                row.is_deleted = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn exists_by_title_author(&self, title: &str, author: &str) -> Result<bool, StoreError> {
        Ok(self
            .table
            .read()
            .rows
            .values()
            .any(|book| !book.is_deleted && book.title == title && book.author == author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, author: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            publication_year: 1999,
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryBookStore::new();
        let first = store.insert(&draft("A", "X")).await.unwrap();
        let second = store.insert(&draft("B", "X")).await.unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(first.views, 0);
        assert!(!first.is_deleted);
    }

    #[tokio::test]
    async fn soft_delete_hides_but_keeps_row() {
        let store = InMemoryBookStore::new();
        let book = store.insert(&draft("A", "X")).await.unwrap();

        assert!(store.soft_delete(book.id).await.unwrap());
        assert!(!store.soft_delete(book.id).await.unwrap());
        assert!(store.get_by_id(book.id).await.unwrap().is_none());
        assert!(store.list_active().await.unwrap().is_empty());
        assert_eq!(store.all_rows().len(), 1);
    }

    #[tokio::test]
    async fn soft_delete_of_unknown_id_is_false() {
        let store = InMemoryBookStore::new();
        assert!(!store.soft_delete(42).await.unwrap());
    }

    #[tokio::test]
    async fn exists_ignores_deleted_and_is_case_sensitive() {
        let store = InMemoryBookStore::new();
        let book = store.insert(&draft("Dune", "Frank Herbert")).await.unwrap();

        assert!(store.exists_by_title_author("Dune", "Frank Herbert").await.unwrap());
        assert!(!store.exists_by_title_author("dune", "Frank Herbert").await.unwrap());

        store.soft_delete(book.id).await.unwrap();
        assert!(!store.exists_by_title_author("Dune", "Frank Herbert").await.unwrap());
    }

    #[tokio::test]
    async fn replace_overwrites_existing_row_only() {
        let store = InMemoryBookStore::new();
        let mut book = store.insert(&draft("A", "X")).await.unwrap();
        book.title = "A, revised".to_string();
        book.views = 9;

        assert!(store.replace(&book).await.unwrap());
        assert_eq!(store.get_by_id(book.id).await.unwrap(), Some(book.clone()));

        book.id = 99;
        assert!(!store.replace(&book).await.unwrap());
    }

    #[tokio::test]
    async fn replace_never_revives_a_deleted_row() {
        let store = InMemoryBookStore::new();
        let mut stale = store.insert(&draft("Gone", "X")).await.unwrap();
        assert!(store.soft_delete(stale.id).await.unwrap());

        stale.views += 1;
        assert!(!store.replace(&stale).await.unwrap());
        assert!(store.get_by_id(stale.id).await.unwrap().is_none());
        assert!(store.all_rows()[0].is_deleted);
        assert_eq!(store.all_rows()[0].views, 0);
    }
}
