//! Borrowing workflow service
//!
//! Borrowing takes one copy out of a book's inventory and returning puts it
//! back. Both transitions are delegated to a single atomic ledger call, so
//! inventory and borrowing rows never disagree.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{
        Borrowing, BorrowingDetails, BorrowingFilter, BorrowingQuery, BorrowingSummary,
        CreateBorrowing, NewBorrowing, ALREADY_RETURNED,
    },
    policy::{self, Actor, BorrowingScope, Operation, Principal},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
}

impl BorrowingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List borrowings visible to the actor.
    /// Non-staff callers only ever see their own rows; `user_id` is honoured for staff only.
    pub async fn list_borrowings(
        &self,
        actor: &Actor,
        query: &BorrowingQuery,
    ) -> AppResult<Vec<BorrowingSummary>> {
        let principal = policy::authorize_principal(actor, Operation::ListBorrowings)?;

        let user_id = match policy::borrowing_scope(&principal) {
            BorrowingScope::All => query.user_filter(),
            BorrowingScope::Owner(user_id) => Some(user_id),
        };
        let filter = BorrowingFilter {
            user_id,
            is_active: query.active_flag(),
        };

        self.repository.borrowings.list(filter).await
    }

    /// Get one borrowing with its book and borrower
    pub async fn get_borrowing(&self, actor: &Actor, id: i32) -> AppResult<BorrowingDetails> {
        let principal = policy::authorize_principal(actor, Operation::RetrieveBorrowing)?;
        self.visible_borrowing(&principal, id).await?;

        self.repository.borrowings.get_details(id).await
    }

    /// Borrow a book for the calling user
    pub async fn create_borrowing(
        &self,
        actor: &Actor,
        request: CreateBorrowing,
    ) -> AppResult<Borrowing> {
        let principal = policy::authorize_principal(actor, Operation::CreateBorrowing)?;

        if request.expected_return_date < request.borrow_date {
            return Err(AppError::Validation(
                "expected_return_date cannot be before borrow_date".to_string(),
            ));
        }

        let new = NewBorrowing {
            user_id: principal.user_id,
            book_id: request.book,
            borrow_date: request.borrow_date,
            expected_return_date: request.expected_return_date,
        };

        match self.repository.borrowings.create(&new).await {
            Ok(borrowing) => {
                tracing::info!(
                    borrowing_id = borrowing.id,
                    book_id = borrowing.book_id,
                    user_id = borrowing.user_id,
                    "Book borrowed"
                );
                Ok(borrowing)
            }
            Err(e) => {
                if let AppError::Validation(ref reason) = e {
                    tracing::warn!(book_id = new.book_id, user_id = new.user_id, %reason, "Borrow rejected");
                }
                Err(e)
            }
        }
    }

    /// Return a borrowed book; the return date is today (UTC)
    pub async fn return_borrowing(&self, actor: &Actor, id: i32) -> AppResult<Borrowing> {
        let principal = policy::authorize_principal(actor, Operation::ReturnBorrowing)?;
        let borrowing = self.visible_borrowing(&principal, id).await?;

        if !borrowing.is_active() {
            tracing::warn!(borrowing_id = id, "Borrowing already returned");
            return Err(AppError::Validation(ALREADY_RETURNED.to_string()));
        }

        match self
            .repository
            .borrowings
            .mark_returned(id, Utc::now().date_naive())
            .await
        {
            Ok(returned) => {
                tracing::info!(
                    borrowing_id = returned.id,
                    book_id = returned.book_id,
                    returned_by = principal.user_id,
                    "Book returned"
                );
                Ok(returned)
            }
            Err(e) => {
                if let AppError::Validation(ref reason) = e {
                    tracing::warn!(borrowing_id = id, %reason, "Return rejected");
                }
                Err(e)
            }
        }
    }

    /// Fetch a borrowing, hiding rows outside the principal's scope
    async fn visible_borrowing(&self, principal: &Principal, id: i32) -> AppResult<Borrowing> {
        let borrowing = self.repository.borrowings.get_by_id(id).await?;
        if !policy::borrowing_scope(principal).allows(borrowing.user_id) {
            return Err(AppError::NotFound(format!("Borrowing with id {} not found", id)));
        }
        Ok(borrowing)
    }
}
