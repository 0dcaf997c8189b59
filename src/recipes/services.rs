use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ListParams, RecipeRequest, RecipeResponse},
    images::{discard_image, store_image, ImageUpload},
    rating::{summarize_by_recipe, RatingSummary},
};
use crate::{
    error::AppError,
    policy,
    storage::StorageClient,
    store::{
        ContentStore, NewRecipe, Page, PageRequest, Recipe, RecipeChanges, RecipeFields,
        RecipeQuery,
    },
    validation::FieldErrors,
};

/// Recipe lifecycle plus the rating aggregate attached on every read.
#[derive(Clone)]
pub struct RecipeService {
    content: Arc<dyn ContentStore>,
    storage: Arc<dyn StorageClient>,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Recipe not found with id: {id}"))
}

fn page_request(params: &ListParams) -> Result<PageRequest, AppError> {
    PageRequest::new(params.page, params.size, &params.sort_by, &params.direction)
}

impl RecipeRequest {
    /// All four text fields, each required to be non-blank. Values are kept as sent.
    pub fn validate(self) -> Result<RecipeFields, AppError> {
        let mut errors = FieldErrors::new();
        errors.require_text("title", self.title.as_deref(), "Title is required");
        errors.require_text("description", self.description.as_deref(), "Description is required");
        errors.require_text("ingredients", self.ingredients.as_deref(), "Ingredients are required");
        errors.require_text("steps", self.steps.as_deref(), "Steps are required");
        errors.into_result()?;
        Ok(RecipeFields {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            ingredients: self.ingredients.unwrap_or_default(),
            steps: self.steps.unwrap_or_default(),
        })
    }
}

impl RecipeService {
    pub fn new(content: Arc<dyn ContentStore>, storage: Arc<dyn StorageClient>) -> Self {
        Self { content, storage }
    }

    async fn present_all(&self, recipes: Vec<Recipe>) -> Result<Vec<RecipeResponse>, AppError> {
        let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
        let ratings = summarize_by_recipe(&self.content.ratings_for(&ids).await?);
        Ok(recipes
            .into_iter()
            .map(|r| {
                let rating = ratings.get(&r.id).copied().unwrap_or_default();
                RecipeResponse::new(r, rating)
            })
            .collect())
    }

    async fn present(&self, recipe: Recipe) -> Result<RecipeResponse, AppError> {
        let rows = self.content.ratings_for(&[recipe.id]).await?;
        let rating = RatingSummary::from_ratings(rows.into_iter().map(|(_, r)| r));
        Ok(RecipeResponse::new(recipe, rating))
    }

    async fn present_page(&self, page: Page<Recipe>) -> Result<Page<RecipeResponse>, AppError> {
        let Page {
            items,
            page,
            size,
            total,
        } = page;
        let items = self.present_all(items).await?;
        Ok(Page {
            items,
            page,
            size,
            total,
        })
    }

    #[instrument(skip(self))]
    pub async fn list(&self, params: &ListParams) -> Result<Page<RecipeResponse>, AppError> {
        let query = RecipeQuery {
            keyword: None,
            page: page_request(params)?,
        };
        let page = self.content.list_recipes(&query).await?;
        self.present_page(page).await
    }

    /// Case-sensitive substring match on title, description or ingredients.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        keyword: &str,
        params: &ListParams,
    ) -> Result<Page<RecipeResponse>, AppError> {
        let query = RecipeQuery {
            keyword: (!keyword.is_empty()).then(|| keyword.to_string()),
            page: page_request(params)?,
        };
        let page = self.content.list_recipes(&query).await?;
        self.present_page(page).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<RecipeResponse, AppError> {
        let recipe = self.content.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
        self.present(recipe).await
    }

    pub async fn list_by_owner(&self, user_id: Uuid) -> Result<Vec<RecipeResponse>, AppError> {
        let recipes = self.content.list_recipes_by_owner(user_id).await?;
        self.present_all(recipes).await
    }

    #[instrument(skip(self, req, image))]
    pub async fn create(
        &self,
        owner: Uuid,
        req: RecipeRequest,
        image: Option<ImageUpload>,
    ) -> Result<RecipeResponse, AppError> {
        let fields = req.validate()?;
        let image_url = match image {
            Some(image) => Some(store_image(self.storage.as_ref(), image).await?),
            None => None,
        };

        let inserted = self
            .content
            .insert_recipe(NewRecipe {
                user_id: owner,
                fields,
                image_url: image_url.clone(),
            })
            .await;
        let recipe = match inserted {
            Ok(recipe) => recipe,
            Err(e) => {
                if let Some(reference) = &image_url {
                    discard_image(self.storage.as_ref(), reference).await;
                }
                return Err(e.into());
            }
        };

        info!(recipe_id = %recipe.id, user_id = %owner, "recipe created");
        Ok(RecipeResponse::new(recipe, RatingSummary::default()))
    }

    /// Replaces the text fields and, when `image` is given, the stored image.
    #[instrument(skip(self, req, image))]
    pub async fn update(
        &self,
        id: Uuid,
        acting: Uuid,
        req: RecipeRequest,
        image: Option<ImageUpload>,
    ) -> Result<RecipeResponse, AppError> {
        let fields = req.validate()?;
        let current = self.content.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
        policy::ensure_owner(acting, &current, "You can only update your own recipes")?;

        let new_image = match image {
            Some(image) => Some(store_image(self.storage.as_ref(), image).await?),
            None => None,
        };
        let changes = RecipeChanges {
            fields,
            image_url: new_image.clone().or_else(|| current.image_url.clone()),
        };

        let recipe = match self.content.update_recipe(id, changes).await {
            Ok(recipe) => recipe,
            Err(e) => {
                if let Some(reference) = &new_image {
                    discard_image(self.storage.as_ref(), reference).await;
                }
                return Err(e.into());
            }
        };
        if new_image.is_some() {
            if let Some(old) = &current.image_url {
                discard_image(self.storage.as_ref(), old).await;
            }
        }

        info!(recipe_id = %id, user_id = %acting, "recipe updated");
        self.present(recipe).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, acting: Uuid) -> Result<(), AppError> {
        let recipe = self.content.find_recipe(id).await?.ok_or_else(|| not_found(id))?;
        policy::ensure_owner(acting, &recipe, "You can only delete your own recipes")?;

        if !self.content.delete_recipe(id).await? {
            return Err(not_found(id));
        }
        if let Some(reference) = &recipe.image_url {
            discard_image(self.storage.as_ref(), reference).await;
        }
        info!(recipe_id = %id, user_id = %acting, "recipe deleted");
        Ok(())
    }
}
