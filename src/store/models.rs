use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::policy::Owned;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String, // unique, compared case-sensitively
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub created_at: OffsetDateTime,
}

/// Recipe record, with the owner's display name joined in on read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub steps: String,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Review record, with the author's display name joined in on read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Owned for Recipe {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for Review {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// The four required text fields of a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFields {
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub steps: String,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub fields: RecipeFields,
    pub image_url: Option<String>,
}

/// Full replacement of a recipe's mutable columns.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub fields: RecipeFields,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}
