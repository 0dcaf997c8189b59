use std::{cmp::Ordering, collections::HashMap};

use axum::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ContentStore, CredentialStore, NewRecipe, NewReview, NewUser, Page, Recipe, RecipeChanges,
    RecipeQuery, Review, SortDirection, SortField, User,
};
use crate::error::{StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    recipes: HashMap<Uuid, Recipe>,
    reviews: HashMap<Uuid, Review>,
}

impl Tables {
    fn user_name(&self, id: Uuid) -> StoreResult<String> {
        self.users
            .get(&id)
            .map(|u| u.name.clone())
            .ok_or_else(|| StoreError::ForeignKeyViolation("user_id".into()))
    }

    /// Display names are joined on read in Postgres; mirror that here.
    fn with_names(&self, mut recipe: Recipe) -> Recipe {
        if let Some(user) = self.users.get(&recipe.user_id) {
            recipe.user_name = user.name.clone();
        }
        recipe
    }

    fn review_with_name(&self, mut review: Review) -> Review {
        if let Some(user) = self.users.get(&review.user_id) {
            review.user_name = user.name.clone();
        }
        review
    }

    fn delete_recipe_cascade(&mut self, id: Uuid) -> bool {
        let existed = self.recipes.remove(&id).is_some();
        self.reviews.retain(|_, r| r.recipe_id != id);
        existed
    }
}

/// Process-local store with the same uniqueness and cascade rules as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_keyword(recipe: &Recipe, keyword: Option<&str>) -> bool {
    match keyword {
        None => true,
        Some(k) => {
            recipe.title.contains(k)
                || recipe.description.contains(k)
                || recipe.ingredients.contains(k)
        }
    }
}

fn compare(a: &Recipe, b: &Recipe, field: SortField, direction: SortDirection) -> Ordering {
    let primary = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Title => a.title.cmp(&b.title),
        SortField::Id => Ordering::Equal,
    };
    let ordering = primary.then_with(|| a.id.cmp(&b.id));
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (OffsetDateTime, Uuid)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.users.values().any(|u| u.email == email))
    }

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.id != id && u.email == email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let user = t.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.name = name.to_string();
        user.email = email.to_string();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let user = t.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<Uuid> = t
            .recipes
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.id)
            .collect();
        for recipe_id in owned {
            t.delete_recipe_cascade(recipe_id);
        }
        t.reviews.retain(|_, r| r.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn insert_recipe(&self, new: NewRecipe) -> StoreResult<Recipe> {
        let mut t = self.tables.write().await;
        let user_name = t.user_name(new.user_id)?;
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            user_name,
            title: new.fields.title,
            description: new.fields.description,
            ingredients: new.fields.ingredients,
            steps: new.fields.steps,
            image_url: new.image_url,
            created_at: OffsetDateTime::now_utc(),
        };
        t.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn find_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        let t = self.tables.read().await;
        Ok(t.recipes.get(&id).cloned().map(|r| t.with_names(r)))
    }

    async fn update_recipe(&self, id: Uuid, changes: RecipeChanges) -> StoreResult<Recipe> {
        let mut t = self.tables.write().await;
        let recipe = t.recipes.get_mut(&id).ok_or(StoreError::NotFound)?;
        recipe.title = changes.fields.title;
        recipe.description = changes.fields.description;
        recipe.ingredients = changes.fields.ingredients;
        recipe.steps = changes.fields.steps;
        recipe.image_url = changes.image_url;
        let updated = recipe.clone();
        Ok(t.with_names(updated))
    }

    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.delete_recipe_cascade(id))
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<Page<Recipe>> {
        let t = self.tables.read().await;
        let req = query.page;
        let mut matching: Vec<Recipe> = t
            .recipes
            .values()
            .filter(|r| matches_keyword(r, query.keyword.as_deref()))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare(a, b, req.sort, req.direction));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(req.offset() as usize)
            .take(req.size as usize)
            .map(|r| t.with_names(r))
            .collect();
        Ok(Page {
            items,
            page: req.page,
            size: req.size,
            total,
        })
    }

    async fn list_recipes_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Recipe> = t
            .recipes
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .map(|r| t.with_names(r))
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn ratings_for(&self, recipe_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, i32)>> {
        let t = self.tables.read().await;
        Ok(t.reviews
            .values()
            .filter(|r| recipe_ids.contains(&r.recipe_id))
            .map(|r| (r.recipe_id, r.rating))
            .collect())
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let mut t = self.tables.write().await;
        if !t.recipes.contains_key(&new.recipe_id) {
            return Err(StoreError::ForeignKeyViolation("recipe_id".into()));
        }
        let user_name = t.user_name(new.user_id)?;
        if t
            .reviews
            .values()
            .any(|r| r.user_id == new.user_id && r.recipe_id == new.recipe_id)
        {
            return Err(StoreError::UniqueViolation("reviews_user_recipe_key".into()));
        }
        let review = Review {
            id: Uuid::new_v4(),
            recipe_id: new.recipe_id,
            user_id: new.user_id,
            user_name,
            rating: new.rating,
            comment: new.comment,
            created_at: OffsetDateTime::now_utc(),
        };
        t.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        let t = self.tables.read().await;
        Ok(t.reviews.get(&id).cloned().map(|r| t.review_with_name(r)))
    }

    async fn review_exists(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t
            .reviews
            .values()
            .any(|r| r.user_id == user_id && r.recipe_id == recipe_id))
    }

    async fn list_reviews_by_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<Review>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Review> = t
            .reviews
            .values()
            .filter(|r| r.recipe_id == recipe_id)
            .cloned()
            .map(|r| t.review_with_name(r))
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn list_reviews_by_author(&self, user_id: Uuid) -> StoreResult<Vec<Review>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Review> = t
            .reviews
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .map(|r| t.review_with_name(r))
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(rows)
    }

    async fn update_review(
        &self,
        id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> StoreResult<Review> {
        let mut t = self.tables.write().await;
        let review = t.reviews.get_mut(&id).ok_or(StoreError::NotFound)?;
        review.rating = rating;
        review.comment = comment;
        let updated = review.clone();
        Ok(t.review_with_name(updated))
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.reviews.remove(&id).is_some())
    }
}
