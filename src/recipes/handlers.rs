use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::get,
    Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    dto::{ListParams, PageResponse, RecipeRequest, RecipeResponse, SearchParams},
    images::ImageUpload,
};
use crate::{
    auth::jwt::AuthUser,
    error::AppError,
    extract::{ApiPath, ApiQuery},
    response::{ApiResponse, ApiResult},
    state::AppState,
};

pub fn recipe_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/search", get(search_recipes))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Recipe fields from either a JSON `recipe` part or individual text
/// parts, plus an optional `image` part. Empty image parts count as absent.
async fn read_recipe_form(
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(RecipeRequest, Option<ImageUpload>), AppError> {
    let mut mp = mp?;
    let mut req = RecipeRequest::default();
    let mut image = None;

    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "recipe" => {
                let raw = field.bytes().await?;
                req = serde_json::from_slice(&raw).map_err(|e| {
                    AppError::validation("recipe", format!("Invalid recipe payload: {e}"))
                })?;
            }
            "title" => req.title = Some(field.text().await?),
            "description" => req.description = Some(field.text().await?),
            "ingredients" => req.ingredients = Some(field.text().await?),
            "steps" => req.steps = Some(field.text().await?),
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await?;
                if !body.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        body,
                    });
                }
            }
            other => debug!(field = other, "ignoring multipart field"),
        }
    }
    Ok((req, image))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<PageResponse<RecipeResponse>> {
    let page = state.recipes.list(&params).await?;
    Ok(ApiResponse::ok("Recipes retrieved successfully", page.into()))
}

#[instrument(skip(state))]
pub async fn search_recipes(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<PageResponse<RecipeResponse>> {
    let (keyword, list) = params.into_parts();
    let page = state.recipes.search(&keyword, &list).await?;
    Ok(ApiResponse::ok("Search results", page.into()))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<RecipeResponse> {
    let recipe = state.recipes.get_by_id(id).await?;
    Ok(ApiResponse::ok("Recipe retrieved successfully", recipe))
}

#[instrument(skip(state, mp))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<RecipeResponse> {
    let (req, image) = read_recipe_form(mp).await?;
    let recipe = state.recipes.create(user_id, req, image).await?;
    Ok(ApiResponse::created("Recipe created successfully", recipe))
}

#[instrument(skip(state, mp))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    mp: Result<Multipart, MultipartRejection>,
) -> ApiResult<RecipeResponse> {
    let (req, image) = read_recipe_form(mp).await?;
    let recipe = state.recipes.update(id, user_id, req, image).await?;
    Ok(ApiResponse::ok("Recipe updated successfully", recipe))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    state.recipes.delete(id, user_id).await?;
    Ok(ApiResponse::<()>::message("Recipe deleted successfully"))
}
