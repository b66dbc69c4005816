//! User account and token endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{
        AccessToken, CreateUser, Credentials, RefreshRequest, TokenPair, UpdateProfile, User,
        VerifyRequest,
    },
    policy::Actor,
    AppState,
};

/// Empty object returned by token verification
#[derive(Serialize, ToSchema)]
pub struct Empty {}

/// Register a new account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid email or password", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    let created = state.services.users.register(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Obtain an access/refresh token pair
#[utoipa::path(
    post,
    path = "/users/token",
    tag = "users",
    request_body = Credentials,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Json<TokenPair>> {
    let pair = state.services.users.obtain_token(&credentials).await?;
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/users/token/refresh",
    tag = "users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid refresh token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> AppResult<Json<AccessToken>> {
    let token = state.services.users.refresh_token(&request.refresh).await?;
    Ok(Json(token))
}

/// Check that a token is valid
#[utoipa::path(
    post,
    path = "/users/token/verify",
    tag = "users",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Token is valid", body = Empty),
        (status = 401, description = "Token is invalid or expired", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_token(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> AppResult<Json<Empty>> {
    state.services.users.verify_token(&request.token)?;
    Ok(Json(Empty {}))
}

/// Get own profile
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<User>> {
    let user = state.services.users.me(&actor).await?;
    Ok(Json(user))
}

/// Replace own email and password
#[utoipa::path(
    put,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 200, description = "Profile replaced", body = User),
        (status = 400, description = "Invalid email or password", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn replace_me(
    State(state): State<AppState>,
    actor: Actor,
    Json(user): Json<CreateUser>,
) -> AppResult<Json<User>> {
    let user = state.services.users.replace_profile(&actor, user).await?;
    Ok(Json(user))
}

/// Update own email and/or password
#[utoipa::path(
    patch,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid email or password", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    actor: Actor,
    Json(update): Json<UpdateProfile>,
) -> AppResult<Json<User>> {
    let user = state.services.users.update_profile(&actor, update).await?;
    Ok(Json(user))
}
