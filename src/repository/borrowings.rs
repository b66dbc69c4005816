//! Borrowings repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::{
            Borrowing, BorrowingDetails, BorrowingFilter, BorrowingSummary, NewBorrowing,
            ALREADY_RETURNED, INVENTORY_FULL, NO_BOOKS_LEFT,
        },
        user::UserShort,
    },
};

use super::BorrowingLedger;

const BORROWING_COLUMNS: &str =
    "id, borrow_date, expected_return_date, actual_return_date, book_id, user_id";

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Borrowing with id {} not found", id))
}

#[async_trait]
impl BorrowingLedger for BorrowingsRepository {
    /// List borrowings matching the filter, oldest first
    async fn list(&self, filter: BorrowingFilter) -> AppResult<Vec<BorrowingSummary>> {
        let borrowings = sqlx::query_as::<_, BorrowingSummary>(
            r#"
            SELECT b.id, b.borrow_date, b.expected_return_date, b.actual_return_date,
                   bk.title AS book, b.user_id AS "user"
            FROM borrowings b
            JOIN books bk ON bk.id = b.book_id
            WHERE ($1::INT IS NULL OR b.user_id = $1)
              AND ($2::BOOLEAN IS NULL OR (b.actual_return_date IS NULL) = $2)
            ORDER BY b.id
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(borrowings)
    }

    /// Get borrowing by ID
    async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(&format!(
            "SELECT {} FROM borrowings WHERE id = $1",
            BORROWING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    /// Get borrowing with its book and borrower
    async fn get_details(&self, id: i32) -> AppResult<BorrowingDetails> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.borrow_date, b.expected_return_date, b.actual_return_date,
                   bk.id AS book_id, bk.title, bk.author, bk.cover, bk.inventory, bk.daily_fee,
                   u.id AS user_id, u.email, u.is_staff
            FROM borrowings b
            JOIN books bk ON bk.id = b.book_id
            JOIN users u ON u.id = b.user_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))?;

        Ok(BorrowingDetails {
            id: row.try_get("id")?,
            borrow_date: row.try_get("borrow_date")?,
            expected_return_date: row.try_get("expected_return_date")?,
            actual_return_date: row.try_get("actual_return_date")?,
            book: Book {
                id: row.try_get("book_id")?,
                title: row.try_get("title")?,
                author: row.try_get("author")?,
                cover: row.try_get("cover")?,
                inventory: row.try_get("inventory")?,
                daily_fee: row.try_get("daily_fee")?,
            },
            user: UserShort {
                id: row.try_get("user_id")?,
                email: row.try_get("email")?,
                is_staff: row.try_get("is_staff")?,
            },
        })
    }

    /// Decrement inventory and insert the borrowing in one transaction
    async fn create(&self, borrowing: &NewBorrowing) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        // Row lock keeps concurrent borrows of the last copy serialized
        let inventory: i32 =
            sqlx::query_scalar("SELECT inventory FROM books WHERE id = $1 FOR UPDATE")
                .bind(borrowing.book_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Book with id {} not found", borrowing.book_id))
                })?;

        if inventory < 1 {
            return Err(AppError::Validation(NO_BOOKS_LEFT.to_string()));
        }

        sqlx::query("UPDATE books SET inventory = inventory - 1 WHERE id = $1")
            .bind(borrowing.book_id)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, Borrowing>(&format!(
            r#"
            INSERT INTO borrowings (borrow_date, expected_return_date, book_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BORROWING_COLUMNS
        ))
        .bind(borrowing.borrow_date)
        .bind(borrowing.expected_return_date)
        .bind(borrowing.book_id)
        .bind(borrowing.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Stamp the return date and increment inventory in one transaction
    async fn mark_returned(&self, id: i32, returned_on: NaiveDate) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Borrowing>(&format!(
            "SELECT {} FROM borrowings WHERE id = $1 FOR UPDATE",
            BORROWING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        if !current.is_active() {
            return Err(AppError::Validation(ALREADY_RETURNED.to_string()));
        }

        // The bound keeps a full inventory from overflowing INTEGER
        let restocked = sqlx::query(
            "UPDATE books SET inventory = inventory + 1 WHERE id = $1 AND inventory < $2",
        )
        .bind(current.book_id)
        .bind(i32::MAX)
        .execute(&mut *tx)
        .await?;

        if restocked.rows_affected() == 0 {
            return Err(AppError::Validation(INVENTORY_FULL.to_string()));
        }

        let returned = sqlx::query_as::<_, Borrowing>(&format!(
            "UPDATE borrowings SET actual_return_date = $2 WHERE id = $1 RETURNING {}",
            BORROWING_COLUMNS
        ))
        .bind(id)
        .bind(returned_on)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(returned)
    }
}
