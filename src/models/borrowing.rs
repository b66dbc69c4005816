//! Borrowing model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::Book;
use super::user::UserShort;

/// Raised when a book has no copy left to lend
pub const NO_BOOKS_LEFT: &str = "No books left in inventory";

/// Raised on a second return of the same borrowing
pub const ALREADY_RETURNED: &str = "This borrowing has already been returned.";

/// Raised when a returned copy would overflow the inventory count
pub const INVENTORY_FULL: &str = "Inventory cannot hold another copy of this book";

/// Borrowing row from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    /// Unset while the book is still out
    pub actual_return_date: Option<NaiveDate>,
    pub book_id: i32,
    pub user_id: i32,
}

impl Borrowing {
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }
}

/// List representation: the book is reduced to its title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingSummary {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    /// Book title
    pub book: String,
    /// Borrower id
    pub user: i32,
}

/// Retrieve representation with the full book and borrower
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book: Book,
    pub user: UserShort,
}

/// Create borrowing request; the borrower is the caller
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    /// Book id
    pub book: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
}

/// Row to insert
#[derive(Debug, Clone)]
pub struct NewBorrowing {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
}

/// Raw list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    /// Filter by borrower id (staff only)
    pub user_id: Option<String>,
    /// "true" for active borrowings, "false" for returned ones
    pub is_active: Option<String>,
}

impl BorrowingQuery {
    /// Borrower id to filter on; empty or non-numeric means no filter
    pub fn user_filter(&self) -> Option<i32> {
        self.user_id.as_deref().and_then(|raw| raw.trim().parse().ok())
    }

    /// Case-insensitive "true"/"false"; anything else means no filter
    pub fn active_flag(&self) -> Option<bool> {
        match self.is_active.as_deref().map(str::to_lowercase).as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }
}

/// Resolved filter handed to the repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorrowingFilter {
    pub user_id: Option<i32>,
    pub is_active: Option<bool>,
}

impl BorrowingFilter {
    pub fn matches(&self, borrowing: &Borrowing) -> bool {
        self.user_id.map_or(true, |id| borrowing.user_id == id)
            && self.is_active.map_or(true, |active| borrowing.is_active() == active)
    }
}
