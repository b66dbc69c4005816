//! Repository layer for database operations
//!
//! Services talk to storage through three traits so the same workflow runs
//! against PostgreSQL ([`books`], [`borrowings`], [`users`]) or the
//! in-process [`memory::MemoryStore`].

pub mod books;
pub mod borrowings;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, CreateBook, UpdateBook},
        borrowing::{Borrowing, BorrowingDetails, BorrowingFilter, BorrowingSummary, NewBorrowing},
        user::{NewUser, User},
    },
};

/// Book records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Book>;

    async fn create(&self, book: &CreateBook) -> AppResult<Book>;

    async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book>;

    /// Delete a book together with its borrowings
    async fn delete(&self, id: i32) -> AppResult<()>;
}

/// Borrowing records and the two inventory-moving transitions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowingLedger: Send + Sync {
    async fn list(&self, filter: BorrowingFilter) -> AppResult<Vec<BorrowingSummary>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Borrowing>;

    async fn get_details(&self, id: i32) -> AppResult<BorrowingDetails>;

    /// Atomically take one copy out of inventory and record the borrowing.
    /// Fails with a validation error when no copy is left.
    async fn create(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing>;

    /// Atomically stamp the return date and put the copy back.
    /// Fails with a validation error when already returned.
    async fn mark_returned(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing>;
}

/// Changes applied to a user's own account
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// User accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;

    /// Case-insensitive lookup
    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool>;

    async fn create(&self, user: &NewUser) -> AppResult<User>;

    async fn update(&self, id: i32, changes: &ProfileChanges) -> AppResult<User>;
}

/// Main repository struct holding the stores
#[derive(Clone)]
pub struct Repository {
    /// Present when backed by PostgreSQL
    pub pool: Option<Pool<Postgres>>,
    pub books: Arc<dyn CatalogStore>,
    pub borrowings: Arc<dyn BorrowingLedger>,
    pub users: Arc<dyn UserStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            borrowings: Arc::new(borrowings::BorrowingsRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            pool: None,
            books: Arc::new(store.clone()),
            borrowings: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }

    /// Assemble a repository from individual stores
    pub fn from_parts(
        books: Arc<dyn CatalogStore>,
        borrowings: Arc<dyn BorrowingLedger>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            pool: None,
            books,
            borrowings,
            users,
        }
    }

    /// Check that storage answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(ref pool) = self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
