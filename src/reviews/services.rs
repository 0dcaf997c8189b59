use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::ReviewRequest;
use crate::{
    error::{AppError, StoreError},
    policy,
    store::{ContentStore, NewReview, Review},
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

const ALREADY_REVIEWED: &str = "You have already reviewed this recipe";

fn checked_rating(rating: Option<i32>) -> Result<i32, AppError> {
    match rating {
        None => Err(AppError::validation("rating", "Rating is required")),
        Some(r) if !(MIN_RATING..=MAX_RATING).contains(&r) => Err(AppError::validation(
            "rating",
            format!("Rating must be between {MIN_RATING} and {MAX_RATING}"),
        )),
        Some(r) => Ok(r),
    }
}

fn recipe_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Recipe not found with id: {id}"))
}

fn review_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Review not found with id: {id}"))
}

/// One rating per user per recipe, editable only by its author.
#[derive(Clone)]
pub struct ReviewService {
    content: Arc<dyn ContentStore>,
}

impl ReviewService {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    async fn ensure_recipe(&self, recipe_id: Uuid) -> Result<(), AppError> {
        match self.content.find_recipe(recipe_id).await? {
            Some(_) => Ok(()),
            None => Err(recipe_not_found(recipe_id)),
        }
    }

    /// The review addressed as `/recipes/{recipe_id}/reviews/{review_id}`.
    async fn find_on_recipe(&self, recipe_id: Uuid, review_id: Uuid) -> Result<Review, AppError> {
        self.content
            .find_review(review_id)
            .await?
            .filter(|r| r.recipe_id == recipe_id)
            .ok_or_else(|| review_not_found(review_id))
    }

    pub async fn list_by_recipe(&self, recipe_id: Uuid) -> Result<Vec<Review>, AppError> {
        self.ensure_recipe(recipe_id).await?;
        Ok(self.content.list_reviews_by_recipe(recipe_id).await?)
    }

    pub async fn list_by_author(&self, user_id: Uuid) -> Result<Vec<Review>, AppError> {
        Ok(self.content.list_reviews_by_author(user_id).await?)
    }

    #[instrument(skip(self, req))]
    pub async fn create(
        &self,
        recipe_id: Uuid,
        author: Uuid,
        req: ReviewRequest,
    ) -> Result<Review, AppError> {
        let rating = checked_rating(req.rating)?;
        self.ensure_recipe(recipe_id).await?;

        if self.content.review_exists(author, recipe_id).await? {
            warn!(%recipe_id, user_id = %author, "duplicate review");
            return Err(AppError::Conflict(ALREADY_REVIEWED.into()));
        }

        let review = self
            .content
            .insert_review(NewReview {
                recipe_id,
                user_id: author,
                rating,
                comment: req.comment,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AppError::Conflict(ALREADY_REVIEWED.into()),
                StoreError::ForeignKeyViolation(_) => recipe_not_found(recipe_id),
                other => other.into(),
            })?;

        info!(review_id = %review.id, %recipe_id, user_id = %author, rating, "review created");
        Ok(review)
    }

    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        recipe_id: Uuid,
        review_id: Uuid,
        acting: Uuid,
        req: ReviewRequest,
    ) -> Result<Review, AppError> {
        let current = self.find_on_recipe(recipe_id, review_id).await?;
        policy::ensure_owner(acting, &current, "You can only update your own reviews")?;
        let rating = checked_rating(req.rating)?;

        let review = self
            .content
            .update_review(review_id, rating, req.comment)
            .await?;
        info!(%review_id, user_id = %acting, rating, "review updated");
        Ok(review)
    }

    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        recipe_id: Uuid,
        review_id: Uuid,
        acting: Uuid,
    ) -> Result<(), AppError> {
        let current = self.find_on_recipe(recipe_id, review_id).await?;
        policy::ensure_owner(acting, &current, "You can only delete your own reviews")?;

        if !self.content.delete_review(review_id).await? {
            return Err(review_not_found(review_id));
        }
        info!(%review_id, user_id = %acting, "review deleted");
        Ok(())
    }
}
