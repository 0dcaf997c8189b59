use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod images;
pub mod rating;
pub mod services;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    handlers::recipe_routes(max_upload_bytes)
}
