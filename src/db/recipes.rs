use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{Nutrition, Recipe, RecipeSearchOptions},
};

/// Read access to the recipe corpus
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeStore: Send + Sync {
    /// Full-text search over ingredient lists, best match first
    async fn search_by_ingredients(
        &self,
        query: &str,
        options: RecipeSearchOptions,
    ) -> AppResult<Vec<Recipe>>;

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Recipe>>;

    /// Returns the recipes for `ids` in the order of `ids`, skipping unknown ids
    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Recipe>>;
}

/// Ranking function applied to full-text matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceScoring {
    /// Frequency of matching lexemes
    #[default]
    TsRank,
    /// Cover density, favours ingredients that appear close together
    TsRankCd,
}

impl RelevanceScoring {
    fn function(self) -> &'static str {
        match self {
            RelevanceScoring::TsRank => "ts_rank",
            RelevanceScoring::TsRankCd => "ts_rank_cd",
        }
    }

    /// Builds the search statement for this scoring function
    pub fn search_sql(self) -> String {
        format!(
            "SELECT r.id, r.name, r.minutes, r.nutrition, r.steps, r.description, r.ingredients \
             FROM recipes r, plainto_tsquery('english', $1) AS q \
             WHERE r.ingredients_tsv @@ q \
             ORDER BY {}(r.ingredients_tsv, q) DESC \
             LIMIT $2 OFFSET $3",
            self.function()
        )
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: i64,
    name: String,
    minutes: i32,
    nutrition: Vec<f32>,
    steps: Vec<String>,
    description: Option<String>,
    ingredients: Vec<String>,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = AppError;

    fn try_from(row: RecipeRow) -> AppResult<Self> {
        Ok(Recipe {
            nutrition: Nutrition::try_from(row.nutrition.as_slice())?,
            id: row.id,
            name: row.name,
            minutes: row.minutes,
            steps: row.steps,
            description: row.description.unwrap_or_default(),
            ingredients: row.ingredients,
            user_rating: None,
        })
    }
}

const RECIPE_COLUMNS: &str = "id, name, minutes, nutrition, steps, description, ingredients";

/// Postgres-backed recipe store
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: PgPool,
    scoring: RelevanceScoring,
}

impl PgRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scoring: RelevanceScoring::default(),
        }
    }

    pub fn with_scoring(mut self, scoring: RelevanceScoring) -> Self {
        self.scoring = scoring;
        self
    }
}

#[async_trait::async_trait]
impl RecipeStore for PgRecipeStore {
    async fn search_by_ingredients(
        &self,
        query: &str,
        options: RecipeSearchOptions,
    ) -> AppResult<Vec<Recipe>> {
        let rows: Vec<RecipeRow> = sqlx::query_as(&self.scoring.search_sql())
            .bind(query)
            .bind(options.limit)
            .bind(options.skip)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Recipe::try_from).collect()
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Recipe>> {
        let row: Option<RecipeRow> =
            sqlx::query_as(&format!("SELECT {} FROM recipes WHERE id = $1", RECIPE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Recipe::try_from).transpose()
    }

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<RecipeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM recipes WHERE id = ANY($1)",
            RECIPE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            let recipe = Recipe::try_from(row)?;
            by_id.insert(recipe.id, recipe);
        }

        Ok(order_by_ids(ids, by_id))
    }
}

/// Arranges `found` in the order of `ids`; ids without a record are dropped.
/// A repeated id yields the recipe at its first position only.
pub(crate) fn order_by_ids(ids: &[i64], mut found: HashMap<i64, Recipe>) -> Vec<Recipe> {
    ids.iter().filter_map(|id| found.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: i64) -> Recipe {
        Recipe {
            id,
            name: format!("recipe {}", id),
            minutes: 10,
            nutrition: Nutrition::default(),
            steps: Vec::new(),
            description: String::new(),
            ingredients: vec!["salt".to_string()],
            user_rating: None,
        }
    }

    #[test]
    fn test_order_by_ids_preserves_request_order() {
        let found: HashMap<i64, Recipe> = [10, 20, 30].into_iter().map(|id| (id, recipe(id))).collect();
        let ordered = order_by_ids(&[30, 10, 20], found);
        let ids: Vec<i64> = ordered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_order_by_ids_drops_missing() {
        let found: HashMap<i64, Recipe> = [(10, recipe(10))].into_iter().collect();
        let ordered = order_by_ids(&[10, 999_999], found);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, 10);
    }

    #[test]
    fn test_search_sql_uses_scoring_function() {
        let sql = RelevanceScoring::TsRankCd.search_sql();
        assert!(sql.contains("ORDER BY ts_rank_cd(r.ingredients_tsv, q) DESC"));
        assert!(sql.contains("LIMIT $2 OFFSET $3"));
        assert!(RelevanceScoring::TsRank.search_sql().contains("ORDER BY ts_rank("));
    }

    #[test]
    fn test_row_with_bad_nutrition_is_rejected() {
        let row = RecipeRow {
            id: 1,
            name: "broken".to_string(),
            minutes: 1,
            nutrition: vec![1.0, 2.0],
            steps: Vec::new(),
            description: None,
            ingredients: Vec::new(),
        };
        assert!(Recipe::try_from(row).is_err());
    }
}
