use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::BookModel;
use crate::shared::AppError;

/// Trait for book storage.
///
/// Listings are ordered newest first (`created_at` descending, `id`
/// descending as tie-break) and optionally restricted to one owner.
#[async_trait]
pub trait BookRepository {
    async fn create_book(&self, book: &BookModel) -> Result<(), AppError>;
    async fn get_book(&self, book_id: &str) -> Result<Option<BookModel>, AppError>;
    async fn update_book(&self, book: &BookModel) -> Result<(), AppError>;
    async fn delete_book(&self, book_id: &str) -> Result<(), AppError>;
    async fn list_books(
        &self,
        owner_id: Option<&str>,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<BookModel>, AppError>;
    async fn count_books(&self, owner_id: Option<&str>) -> Result<u64, AppError>;
}

/// In-memory implementation of BookRepository for development and testing
pub struct InMemoryBookRepository {
    books: RwLock<HashMap<String, BookModel>>,
}

impl Default for InMemoryBookRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated books
    pub fn with_books(books: Vec<BookModel>) -> Self {
        let book_map = books
            .into_iter()
            .map(|book| (book.id.clone(), book))
            .collect();

        Self {
            books: RwLock::new(book_map),
        }
    }

    pub async fn book_count(&self) -> usize {
        self.books.read().await.len()
    }
}

fn owned_by(book: &BookModel, owner_id: Option<&str>) -> bool {
    owner_id.map_or(true, |owner| book.user_id == owner)
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    #[instrument(skip(self, book))]
    async fn create_book(&self, book: &BookModel) -> Result<(), AppError> {
        debug!(book_id = %book.id, user_id = %book.user_id, "Creating book in memory");

        let mut books = self.books.write().await;
        if books.contains_key(&book.id) {
            warn!(book_id = %book.id, "Book already exists in memory");
            return Err(AppError::DatabaseError("Book already exists".to_string()));
        }
        books.insert(book.id.clone(), book.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_book(&self, book_id: &str) -> Result<Option<BookModel>, AppError> {
        Ok(self.books.read().await.get(book_id).cloned())
    }

    #[instrument(skip(self, book))]
    async fn update_book(&self, book: &BookModel) -> Result<(), AppError> {
        let mut books = self.books.write().await;
        match books.get_mut(&book.id) {
            Some(existing) => {
                *existing = book.clone();
                debug!(book_id = %book.id, "Book updated in memory");
                Ok(())
            }
            None => {
                warn!(book_id = %book.id, "Book not found for update in memory");
                Err(AppError::NotFound("Book not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_book(&self, book_id: &str) -> Result<(), AppError> {
        if self.books.write().await.remove(book_id).is_none() {
            warn!(book_id = %book_id, "Book not found for deletion in memory");
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        debug!(book_id = %book_id, "Book deleted from memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_books(
        &self,
        owner_id: Option<&str>,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<BookModel>, AppError> {
        let books = self.books.read().await;

        let mut matching: Vec<&BookModel> = books
            .values()
            .filter(|book| owned_by(book, owner_id))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn count_books(&self, owner_id: Option<&str>) -> Result<u64, AppError> {
        let books = self.books.read().await;
        Ok(books.values().filter(|book| owned_by(book, owner_id)).count() as u64)
    }
}

/// PostgreSQL implementation of book repository
pub struct PostgresBookRepository {
    pool: PgPool,
}

impl PostgresBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> AppError {
    warn!(error = %e, "Book query failed");
    AppError::DatabaseError(e.to_string())
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    #[instrument(skip(self, book))]
    async fn create_book(&self, book: &BookModel) -> Result<(), AppError> {
        debug!(book_id = %book.id, user_id = %book.user_id, "Creating book in database");

        sqlx::query(
            "INSERT INTO books (id, title, caption, rating, image, user_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.caption)
        .bind(book.rating)
        .bind(&book.image)
        .bind(&book.user_id)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_book(&self, book_id: &str) -> Result<Option<BookModel>, AppError> {
        sqlx::query_as::<_, BookModel>(
            "SELECT id, title, caption, rating, image, user_id, created_at, updated_at FROM books WHERE id = $1"
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)
    }

    #[instrument(skip(self, book))]
    async fn update_book(&self, book: &BookModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE books SET title = $2, caption = $3, rating = $4, image = $5, updated_at = $6 WHERE id = $1"
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.caption)
        .bind(book.rating)
        .bind(&book.image)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            warn!(book_id = %book.id, "Book not found for update");
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_book(&self, book_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        if result.rows_affected() == 0 {
            warn!(book_id = %book_id, "Book not found for deletion");
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_books(
        &self,
        owner_id: Option<&str>,
        skip: u64,
        limit: u32,
    ) -> Result<Vec<BookModel>, AppError> {
        let offset = i64::try_from(skip).unwrap_or(i64::MAX);

        sqlx::query_as::<_, BookModel>(
            "SELECT id, title, caption, rating, image, user_id, created_at, updated_at FROM books \
             WHERE ($1::TEXT IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(owner_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)
    }

    #[instrument(skip(self))]
    async fn count_books(&self, owner_id: Option<&str>) -> Result<u64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE ($1::TEXT IS NULL OR user_id = $1)")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .map_err(database_error)?;

        Ok(count.max(0) as u64)
    }
}
