use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// Number of slots in the persisted nutrition sequence
pub const NUTRITION_SLOTS: usize = 7;

/// Nutrition facts for one recipe
///
/// Persisted and serialized as a fixed 7-element sequence:
/// calories, total fat, sugar, sodium, protein, saturated fat, carbohydrates
/// (all but calories in percent of daily value).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 7]", into = "[f64; 7]")]
pub struct Nutrition {
    pub calories: f64,
    pub total_fat_pdv: f64,
    pub sugar_pdv: f64,
    pub sodium_pdv: f64,
    pub protein_pdv: f64,
    pub saturated_fat_pdv: f64,
    pub carbohydrates_pdv: f64,
}

impl From<[f64; NUTRITION_SLOTS]> for Nutrition {
    fn from(v: [f64; NUTRITION_SLOTS]) -> Self {
        Self {
            calories: v[0],
            total_fat_pdv: v[1],
            sugar_pdv: v[2],
            sodium_pdv: v[3],
            protein_pdv: v[4],
            saturated_fat_pdv: v[5],
            carbohydrates_pdv: v[6],
        }
    }
}

impl From<Nutrition> for [f64; NUTRITION_SLOTS] {
    fn from(n: Nutrition) -> Self {
        [
            n.calories,
            n.total_fat_pdv,
            n.sugar_pdv,
            n.sodium_pdv,
            n.protein_pdv,
            n.saturated_fat_pdv,
            n.carbohydrates_pdv,
        ]
    }
}

impl TryFrom<&[f32]> for Nutrition {
    type Error = AppError;

    fn try_from(values: &[f32]) -> AppResult<Self> {
        let slots: [f32; NUTRITION_SLOTS] = values.try_into().map_err(|_| {
            AppError::Internal(format!(
                "Nutrition must have {} slots, found {}",
                NUTRITION_SLOTS,
                values.len()
            ))
        })?;
        Ok(Nutrition::from(slots.map(f64::from)))
    }
}

/// A recipe from the ingested dataset, optionally annotated with the
/// requesting user's rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub minutes: i32,
    pub nutrition: Nutrition,
    pub steps: Vec<String>,
    pub description: String,
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<i32>,
}

/// Paging for ingredient search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeSearchOptions {
    pub limit: i64,
    pub skip: i64,
}

impl Default for RecipeSearchOptions {
    fn default() -> Self {
        Self { limit: 50, skip: 0 }
    }
}

impl RecipeSearchOptions {
    pub fn validate(&self) -> AppResult<()> {
        if self.limit < 0 || self.skip < 0 {
            return Err(AppError::Validation(
                "limit and skip must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of ingredient search results
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub recipes: Vec<Recipe>,
    /// Size of this page, not a total match count
    pub total: usize,
    pub query: String,
    /// True when the page came back full; more results may exist
    pub has_more: bool,
}

impl SearchResult {
    pub fn new(recipes: Vec<Recipe>, query: String, limit: i64) -> Self {
        let total = recipes.len();
        Self {
            // An empty page asked for with limit=0 never reports more results
            has_more: limit > 0 && total as i64 == limit,
            total,
            query,
            recipes,
        }
    }
}

/// Rating aggregate for a single recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStats {
    pub recipe: Recipe,
    pub average_rating: Option<f64>,
    pub rating_count: i64,
    pub rating_distribution: BTreeMap<i32, i64>,
}
