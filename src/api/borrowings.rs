//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::borrowing::{
        Borrowing, BorrowingDetails, BorrowingQuery, BorrowingSummary, CreateBorrowing,
    },
    policy::Actor,
    AppState,
};

/// Return response with the updated borrowing
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Return status
    pub status: String,
    pub borrowing: Borrowing,
}

/// List borrowings
///
/// Regular users only see their own borrowings; `user_id` is applied for staff.
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Matching borrowings", body = Vec<BorrowingSummary>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingSummary>>> {
    let borrowings = state.services.borrowings.list_borrowings(&actor, &query).await?;
    Ok(Json(borrowings))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created", body = Borrowing),
        (status = 400, description = "No copy left or invalid dates", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    let borrowing = state.services.borrowings.create_borrowing(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Get borrowing by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing with book and borrower", body = BorrowingDetails),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrowing = state.services.borrowings.get_borrowing(&actor, id).await?;
    Ok(Json(borrowing))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_borrowing(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let borrowing = state.services.borrowings.return_borrowing(&actor, id).await?;

    Ok(Json(ReturnResponse {
        status: "Book returned!".to_string(),
        borrowing,
    }))
}
