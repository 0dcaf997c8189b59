use axum::{
    extract::State,
    routing::{delete, post},
    Router,
};
use tracing::{info, instrument};

use crate::{
    accounts::{dto::UserResponse, services::TokenPair},
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        jwt::AuthUser,
    },
    extract::ApiJson,
    response::{ApiResponse, ApiResult},
    state::AppState,
    store::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/delete-account", delete(delete_account))
}

fn auth_response(user: User, tokens: TokenPair) -> AuthResponse {
    AuthResponse {
        token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user_id: user.id,
        name: user.name,
        email: user.email,
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<UserResponse> {
    let user = state.accounts.register(payload).await?;
    Ok(ApiResponse::created(
        "User registered successfully",
        UserResponse::from(user),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let (user, tokens) = state.accounts.authenticate(payload).await?;
    Ok(ApiResponse::ok("Login successful", auth_response(user, tokens)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let (user, tokens) = state.accounts.refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::ok("Token refreshed", auth_response(user, tokens)))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<()> {
    state.accounts.delete_account(user_id, user_id).await?;
    info!(%user_id, "account closed by owner");
    Ok(ApiResponse::<()>::message("Account deleted successfully"))
}
