use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{ChangePasswordRequest, ProfileUpdateRequest, UserResponse};
use crate::{
    auth::jwt::AuthUser,
    extract::{ApiJson, ApiPath},
    recipes::dto::RecipeResponse,
    response::{ApiResponse, ApiResult},
    reviews::dto::ReviewResponse,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/change-password", put(change_password))
        .route("/users/recipes", get(my_recipes))
        .route("/users/reviews", get(my_reviews))
        .route("/users/:id", get(get_user).delete(delete_user))
        .route("/users/:id/recipes", get(user_recipes))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<UserResponse> {
    let user = state.accounts.find_by_id(user_id).await?;
    Ok(ApiResponse::ok("Profile retrieved successfully", user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ProfileUpdateRequest>,
) -> ApiResult<UserResponse> {
    let user = state.accounts.update_profile(user_id, payload).await?;
    Ok(ApiResponse::ok("Profile updated successfully", user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<()> {
    state.accounts.change_password(user_id, payload).await?;
    Ok(ApiResponse::<()>::message("Password changed successfully"))
}

#[instrument(skip(state))]
pub async fn my_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<RecipeResponse>> {
    let recipes = state.recipes.list_by_owner(user_id).await?;
    Ok(ApiResponse::ok("Recipes retrieved successfully", recipes))
}

#[instrument(skip(state))]
pub async fn my_reviews(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<ReviewResponse>> {
    let reviews = state.reviews.list_by_author(user_id).await?;
    Ok(ApiResponse::ok(
        "Reviews retrieved successfully",
        reviews.into_iter().map(ReviewResponse::from).collect(),
    ))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<UserResponse> {
    let user = state.accounts.find_by_id(id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user.into()))
}

#[instrument(skip(state))]
pub async fn user_recipes(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<RecipeResponse>> {
    let user = state.accounts.find_by_id(id).await?;
    let recipes = state.recipes.list_by_owner(user.id).await?;
    Ok(ApiResponse::ok("Recipes retrieved successfully", recipes))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state.accounts.delete_account(user_id, id).await?;
    Ok(ApiResponse::<()>::message("User deleted successfully"))
}
