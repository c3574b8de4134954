use async_trait::async_trait;
use sqlx::PgPool;

use super::{BookStore, StoreError};
use crate::modules::books::models::{Book, BookDraft};

const BOOK_COLUMNS: &str = "id, title, author, publication_year, views, is_deleted";

/// Store backed by the `books` table.
#[derive(Debug, Clone)]
pub struct PostgresBookStore {
    pool: PgPool,
}

impl PostgresBookStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for PostgresBookStore {
    async fn list_active(&self) -> Result<Vec<Book>, StoreError> {
        let query = format!("SELECT {BOOK_COLUMNS} FROM books WHERE is_deleted = FALSE ORDER BY id");
        let books = sqlx::query_as::<_, Book>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let query =
            format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND is_deleted = FALSE");
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn insert(&self, draft: &BookDraft) -> Result<Book, StoreError> {
        let query = format!(
            "INSERT INTO books (title, author, publication_year) VALUES ($1, $2, $3) \
             RETURNING {BOOK_COLUMNS}"
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(&draft.title)
            .bind(&draft.author)
            .bind(draft.publication_year)
            .fetch_one(&self.pool)
            .await?;
        Ok(book)
    }

    async fn replace(&self, book: &Book) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE books \
             SET title = $2, author = $3, publication_year = $4, views = $5, is_deleted = $6 \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.publication_year)
        .bind(book.views)
        .bind(book.is_deleted)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: i64) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE books SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_title_author(&self, title: &str, author: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (\
                SELECT 1 FROM books WHERE title = $1 AND author = $2 AND is_deleted = FALSE\
             )",
        )
        .bind(title)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::BooksModule;
    use shelf_kernel::settings::DatabaseSettings;

    /// Runs only when `SHELF_TEST_DATABASE_URL` points at a disposable database.
    async fn store() -> Option<PostgresBookStore> {
        let url = std::env::var("SHELF_TEST_DATABASE_URL").ok()?;
        let settings = DatabaseSettings {
            url,
            ..DatabaseSettings::default()
        };
        let pool = shelf_db::connect(&settings).await.unwrap();
        let migrations: Vec<_> = BooksModule::schema()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        shelf_db::migrate(&pool, &migrations).await.unwrap();
        Some(PostgresBookStore::new(pool))
    }

    #[tokio::test]
    async fn round_trip_against_postgres() {
        let Some(store) = store().await else {
            return;
        };
        store.ping().await.unwrap();
        let unique = format!("pg-test-{}", std::process::id());
        let draft = BookDraft {
            title: unique.clone(),
            author: "Integration".to_string(),
            publication_year: 2001,
        };

        let mut book = store.insert(&draft).await.unwrap();
        assert_eq!(book.views, 0);
        assert!(store
            .exists_by_title_author(&unique, "Integration")
            .await
            .unwrap());

        book.views += 1;
        assert!(store.replace(&book).await.unwrap());
        assert_eq!(store.get_by_id(book.id).await.unwrap(), Some(book.clone()));

        assert!(store.soft_delete(book.id).await.unwrap());
        assert!(!store.soft_delete(book.id).await.unwrap());
        assert!(!store.replace(&book).await.unwrap());
        assert!(store.get_by_id(book.id).await.unwrap().is_none());
        assert!(!store
            .list_active()
            .await
            .unwrap()
            .iter()
            .any(|b| b.id == book.id));
    }
}
