//! Persistence seams. Services only see these traits; the Postgres and
//! in-memory backends both implement the credential and content sides on
//! one value so account deletion can cascade into recipes and reviews.

use axum::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;

pub mod memory;
pub mod models;
pub mod paging;
pub mod postgres;

pub use models::{NewRecipe, NewReview, NewUser, Recipe, RecipeChanges, RecipeFields, Review, User};
pub use paging::{Page, PageRequest, SortDirection, SortField};

/// Filter + ordering for recipe listings.
#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    /// Case-sensitive substring matched against title, description or ingredients.
    pub keyword: Option<String>,
    pub page: PageRequest,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn exists_by_email(&self, email: &str) -> StoreResult<bool>;
    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> StoreResult<User>;
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;
    /// Removes the user together with owned recipes and all reviews on or by them.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert_recipe(&self, new: NewRecipe) -> StoreResult<Recipe>;
    async fn find_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>>;
    async fn update_recipe(&self, id: Uuid, changes: RecipeChanges) -> StoreResult<Recipe>;
    /// Removes the recipe and its reviews.
    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<Page<Recipe>>;
    async fn list_recipes_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>>;
    /// `(recipe_id, rating)` for every review on any of `recipe_ids`.
    async fn ratings_for(&self, recipe_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, i32)>>;

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review>;
    async fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>>;
    async fn review_exists(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<bool>;
    async fn list_reviews_by_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<Review>>;
    async fn list_reviews_by_author(&self, user_id: Uuid) -> StoreResult<Vec<Review>>;
    async fn update_review(
        &self,
        id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> StoreResult<Review>;
    async fn delete_review(&self, id: Uuid) -> StoreResult<bool>;
}
