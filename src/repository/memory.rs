//! In-process store implementing every repository trait.
//!
//! One write lock guards the whole state, so each mutating call is a
//! single atomic unit: checks run before anything is changed.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        borrowing::{
            Borrowing, BorrowingDetails, BorrowingFilter, BorrowingSummary, NewBorrowing,
            ALREADY_RETURNED, INVENTORY_FULL, NO_BOOKS_LEFT,
        },
        user::{NewUser, User, UserShort},
    },
};

use super::{BorrowingLedger, CatalogStore, ProfileChanges, UserStore};

#[derive(Debug, Default)]
struct State {
    books: BTreeMap<i32, Book>,
    borrowings: BTreeMap<i32, Borrowing>,
    users: BTreeMap<i32, User>,
    last_book_id: i32,
    last_borrowing_id: i32,
    last_user_id: i32,
}

impl State {
    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn book_mut(&mut self, id: i32) -> AppResult<&mut Book> {
        self.books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn borrowing(&self, id: i32) -> AppResult<&Borrowing> {
        self.borrowings
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    fn user(&self, id: i32) -> AppResult<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != exclude_id)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.state.read().await.books.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.state.read().await.book(id).cloned()
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        state.last_book_id += 1;
        let created = Book {
            id: state.last_book_id,
            title: book.title.clone(),
            author: book.author.clone(),
            cover: book.cover,
            inventory: book.inventory,
            daily_fee: book.daily_fee,
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let book = state.book_mut(id)?;
        update.apply_to(book);
        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.book(id)?;
        state.books.remove(&id);
        state.borrowings.retain(|_, b| b.book_id != id);
        Ok(())
    }
}

#[async_trait]
impl BorrowingLedger for MemoryStore {
    async fn list(&self, filter: BorrowingFilter) -> AppResult<Vec<BorrowingSummary>> {
        let state = self.state.read().await;
        state
            .borrowings
            .values()
            .filter(|b| filter.matches(b))
            .map(|b| {
                Ok(BorrowingSummary {
                    id: b.id,
                    borrow_date: b.borrow_date,
                    expected_return_date: b.expected_return_date,
                    actual_return_date: b.actual_return_date,
                    book: state.book(b.book_id)?.title.clone(),
                    user: b.user_id,
                })
            })
            .collect()
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        self.state.read().await.borrowing(id).cloned()
    }

    async fn get_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        let state = self.state.read().await;
        let borrowing = state.borrowing(id)?;
        Ok(BorrowingDetails {
            id: borrowing.id,
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: borrowing.actual_return_date,
            book: state.book(borrowing.book_id)?.clone(),
            user: UserShort::from(state.user(borrowing.user_id)?),
        })
    }

    async fn create(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        let mut state = self.state.write().await;
        state.user(borrowing.user_id)?;
        if state.book(borrowing.book_id)?.inventory < 1 {
            return Err(AppError::Validation(NO_BOOKS_LEFT.to_string()));
        }

        state.book_mut(borrowing.book_id)?.inventory -= 1;
        state.last_borrowing_id += 1;
        let created = Borrowing {
            id: state.last_borrowing_id,
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: None,
            book_id: borrowing.book_id,
            user_id: borrowing.user_id,
        };
        state.borrowings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn mark_returned(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing> {
        let mut state = self.state.write().await;
        let current = state.borrowing(id)?.clone();
        if !current.is_active() {
            return Err(AppError::Validation(ALREADY_RETURNED.to_string()));
        }
        let book = state.book_mut(current.book_id)?;
        book.inventory = book
            .inventory
            .checked_add(1)
            .ok_or_else(|| AppError::Validation(INVENTORY_FULL.to_string()))?;
        let returned = Borrowing {
            actual_return_date: Some(returned_on),
            ..current
        };
        state.borrowings.insert(id, returned.clone());
        Ok(returned)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.state.read().await.user(id).cloned()
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        Ok(self.state.read().await.email_taken(email, exclude_id))
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        state.last_user_id += 1;
        let created = User {
            id: state.last_user_id,
            email: user.email.clone(),
            password: user.password_hash.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, changes: &ProfileChanges) -> AppResult<User> {
        let mut state = self.state.write().await;
        state.user(id)?;
        if let Some(ref email) = changes.email {
            if state.email_taken(email, Some(id)) {
                return Err(AppError::Conflict(
                    "A user with this email already exists".to_string(),
                ));
            }
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        if let Some(ref email) = changes.email {
            user.email = email.clone();
        }
        if let Some(ref hash) = changes.password_hash {
            user.password = hash.clone();
        }
        Ok(user.clone())
    }
}
