use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::rating::RatingSummary;
use crate::store::{paging::DEFAULT_PAGE_SIZE, Page, Recipe};

/// Text fields of a recipe as sent by the client; blanks are rejected by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub steps: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub ingredients: String,
    pub steps: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub user_id: Uuid,
    pub user_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub average_rating: f64,
    pub review_count: i64,
}

impl RecipeResponse {
    pub fn new(recipe: Recipe, rating: RatingSummary) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            ingredients: recipe.ingredients,
            steps: recipe.steps,
            image_url: recipe.image_url,
            user_id: recipe.user_id,
            user_name: recipe.user_name,
            created_at: recipe.created_at,
            average_rating: rating.average,
            review_count: rating.count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub last: bool,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        let last = page.is_last();
        Self {
            content: page.items,
            page: page.page,
            size: page.size,
            total_elements: page.total,
            total_pages,
            last,
        }
    }
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_by() -> String {
    "createdAt".into()
}

fn default_direction() -> String {
    "desc".into()
}

/// `?page=&size=&sortBy=&direction=` with the listing defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_size(),
            sort_by: default_sort_by(),
            direction: default_direction(),
        }
    }
}

// Spelled out rather than flattened: urlencoded numbers do not survive `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub keyword: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

impl SearchParams {
    pub fn into_parts(self) -> (String, ListParams) {
        let list = ListParams {
            page: self.page,
            size: self.size,
            sort_by: self.sort_by,
            direction: self.direction,
        };
        (self.keyword, list)
    }
}
