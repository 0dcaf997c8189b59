use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    ContentStore, CredentialStore, NewRecipe, NewReview, NewUser, Page, Recipe, RecipeChanges,
    RecipeQuery, Review, User,
};
use crate::error::StoreResult;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";

const RECIPE_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS user_name, r.title, r.description,
           r.ingredients, r.steps, r.image_url, r.created_at
      FROM recipes r
      JOIN users u ON u.id = r.user_id
"#;

const REVIEW_SELECT: &str = r#"
    SELECT v.id, v.recipe_id, v.user_id, u.name AS user_name, v.rating,
           v.comment, v.created_at
      FROM reviews v
      JOIN users u ON u.id = v.user_id
"#;

const KEYWORD_FILTER: &str = r#"
    ($1::text IS NULL
     OR strpos(r.title, $1) > 0
     OR strpos(r.description, $1) > 0
     OR strpos(r.ingredients, $1) > 0)
"#;

/// Postgres-backed store. Cascades are enforced by foreign keys.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn update_profile(&self, id: Uuid, name: &str, email: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET name = $2, email = $3
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn insert_recipe(&self, new: NewRecipe) -> StoreResult<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            WITH inserted AS (
                INSERT INTO recipes (id, user_id, title, description, ingredients, steps, image_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT r.id, r.user_id, u.name AS user_name, r.title, r.description,
                   r.ingredients, r.steps, r.image_url, r.created_at
              FROM inserted r
              JOIN users u ON u.id = r.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.fields.title)
        .bind(&new.fields.description)
        .bind(&new.fields.ingredients)
        .bind(&new.fields.steps)
        .bind(&new.image_url)
        .fetch_one(&self.db)
        .await?;
        Ok(recipe)
    }

    async fn find_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!("{RECIPE_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(recipe)
    }

    async fn update_recipe(&self, id: Uuid, changes: RecipeChanges) -> StoreResult<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            WITH updated AS (
                UPDATE recipes
                   SET title = $2, description = $3, ingredients = $4, steps = $5, image_url = $6
                 WHERE id = $1
                RETURNING *
            )
            SELECT r.id, r.user_id, u.name AS user_name, r.title, r.description,
                   r.ingredients, r.steps, r.image_url, r.created_at
              FROM updated r
              JOIN users u ON u.id = r.user_id
            "#,
        )
        .bind(id)
        .bind(&changes.fields.title)
        .bind(&changes.fields.description)
        .bind(&changes.fields.ingredients)
        .bind(&changes.fields.steps)
        .bind(&changes.image_url)
        .fetch_one(&self.db)
        .await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<Page<Recipe>> {
        let req = query.page;
        let dir = req.direction.sql();
        let sql = format!(
            "{RECIPE_SELECT} WHERE {KEYWORD_FILTER} \
             ORDER BY r.{col} {dir}, r.id {dir} LIMIT $2 OFFSET $3",
            col = req.sort.column(),
        );

        // Count and slice from one snapshot so totals match the rows.
        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM recipes r WHERE {KEYWORD_FILTER}"
        ))
        .bind(query.keyword.as_deref())
        .fetch_one(&mut *tx)
        .await?;
        let items = sqlx::query_as::<_, Recipe>(&sql)
            .bind(query.keyword.as_deref())
            .bind(req.size)
            .bind(req.offset())
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Page {
            items,
            page: req.page,
            size: req.size,
            total,
        })
    }

    async fn list_recipes_by_owner(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(&format!(
            "{RECIPE_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn ratings_for(&self, recipe_ids: &[Uuid]) -> StoreResult<Vec<(Uuid, i32)>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, (Uuid, i32)>(
            "SELECT recipe_id, rating FROM reviews WHERE recipe_id = ANY($1)",
        )
        .bind(recipe_ids.to_vec())
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (id, recipe_id, user_id, rating, comment)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT v.id, v.recipe_id, v.user_id, u.name AS user_name, v.rating,
                   v.comment, v.created_at
              FROM inserted v
              JOIN users u ON u.id = v.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.recipe_id)
        .bind(new.user_id)
        .bind(new.rating)
        .bind(&new.comment)
        .fetch_one(&self.db)
        .await?;
        Ok(review)
    }

    async fn find_review(&self, id: Uuid) -> StoreResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!("{REVIEW_SELECT} WHERE v.id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(review)
    }

    async fn review_exists(&self, user_id: Uuid, recipe_id: Uuid) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND recipe_id = $2)",
        )
        .bind(user_id)
        .bind(recipe_id)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn list_reviews_by_recipe(&self, recipe_id: Uuid) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE v.recipe_id = $1 ORDER BY v.created_at DESC, v.id DESC"
        ))
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_reviews_by_author(&self, user_id: Uuid) -> StoreResult<Vec<Review>> {
        let rows = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE v.user_id = $1 ORDER BY v.created_at DESC, v.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_review(
        &self,
        id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> StoreResult<Review> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            WITH updated AS (
                UPDATE reviews SET rating = $2, comment = $3
                 WHERE id = $1
                RETURNING *
            )
            SELECT v.id, v.recipe_id, v.user_id, u.name AS user_name, v.rating,
                   v.comment, v.created_at
              FROM updated v
              JOIN users u ON u.id = v.user_id
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.db)
        .await?;
        Ok(review)
    }

    async fn delete_review(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
