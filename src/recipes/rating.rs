use std::collections::HashMap;

use uuid::Uuid;

/// Average rating and review count of one recipe, computed on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: i64,
}

impl RatingSummary {
    /// Mean of `ratings`, or `0.0` when there are none.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0i64, 0i64), |(sum, count), r| (sum + i64::from(r), count + 1));
        if count == 0 {
            return Self::default();
        }
        Self {
            average: sum as f64 / count as f64,
            count,
        }
    }
}

/// Groups `(recipe_id, rating)` rows into one summary per recipe.
pub fn summarize_by_recipe(rows: &[(Uuid, i32)]) -> HashMap<Uuid, RatingSummary> {
    let mut grouped: HashMap<Uuid, Vec<i32>> = HashMap::new();
    for (recipe_id, rating) in rows {
        grouped.entry(*recipe_id).or_default().push(*rating);
    }
    grouped
        .into_iter()
        .map(|(id, ratings)| (id, RatingSummary::from_ratings(ratings)))
        .collect()
}
