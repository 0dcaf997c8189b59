use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{ReviewRequest, ReviewResponse};
use crate::{
    auth::jwt::AuthUser,
    extract::{ApiJson, ApiPath},
    response::{ApiResponse, ApiResult},
    state::AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:id/reviews", get(list_reviews).post(create_review))
        .route(
            "/recipes/:id/reviews/:review_id",
            put(update_review).delete(delete_review),
        )
}

#[instrument(skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    ApiPath(recipe_id): ApiPath<Uuid>,
) -> ApiResult<Vec<ReviewResponse>> {
    let reviews = state.reviews.list_by_recipe(recipe_id).await?;
    Ok(ApiResponse::ok(
        "Reviews retrieved successfully",
        reviews.into_iter().map(ReviewResponse::from).collect(),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(recipe_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ReviewRequest>,
) -> ApiResult<ReviewResponse> {
    let review = state.reviews.create(recipe_id, user_id, payload).await?;
    Ok(ApiResponse::created("Review created successfully", review.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath((recipe_id, review_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(payload): ApiJson<ReviewRequest>,
) -> ApiResult<ReviewResponse> {
    let review = state
        .reviews
        .update(recipe_id, review_id, user_id, payload)
        .await?;
    Ok(ApiResponse::ok("Review updated successfully", review.into()))
}

#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath((recipe_id, review_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state.reviews.delete(recipe_id, review_id, user_id).await?;
    Ok(ApiResponse::<()>::message("Review deleted successfully"))
}
