use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::Review;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            recipe_id: review.recipe_id,
            user_id: review.user_id,
            user_name: review.user_name,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
        }
    }
}
