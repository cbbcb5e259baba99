use std::sync::Arc;

use crate::{
    db::VectorStore,
    error::{AppError, AppResult},
    models::{Recipe, RecipeCandidate, ScoredRecipe},
    services::recipes::{upstream, RecipeService},
};

pub const DEFAULT_RECOMMENDATION_LIMIT: i64 = 20;
pub const MAX_RECOMMENDATION_LIMIT: i64 = 100;

/// Generates personalized recipe recommendations
///
/// Candidates are the `limit` recipe vectors nearest to the user's vector.
/// That set is then presented by predicted rating, so the nearest neighbour
/// is not necessarily first.
pub struct RecommendationService {
    vectors: Arc<dyn VectorStore>,
    recipes: Arc<RecipeService>,
}

impl RecommendationService {
    pub fn new(vectors: Arc<dyn VectorStore>, recipes: Arc<RecipeService>) -> Self {
        Self { vectors, recipes }
    }

    pub async fn get_recommendations_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> AppResult<Vec<Recipe>> {
        validate_limit(limit)?;

        let Some(user) = self
            .vectors
            .find_user_vector(user_id)
            .await
            .map_err(|e| upstream("find_user_vector", e))?
        else {
            tracing::debug!(user_id, "No trained vector for user");
            return Ok(Vec::new());
        };

        let global_mean = self
            .vectors
            .latest_global_mean()
            .await
            .map_err(|e| upstream("latest_global_mean", e))?
            .ok_or_else(|| {
                AppError::Config("Recommendation model has not been trained".to_string())
            })?;

        let candidates = self
            .vectors
            .nearest_recipes(user_id, limit)
            .await
            .map_err(|e| upstream("nearest_recipes", e))?;

        let ranked = rank_candidates(global_mean, user.bias, &candidates);
        let ids: Vec<i64> = ranked.iter().map(|s| s.recipe_id).collect();

        let recipes = self
            .recipes
            .get_recipes_by_ids_with_ratings(&ids, Some(user_id))
            .await?;

        tracing::info!(
            user_id,
            candidates = candidates.len(),
            returned = recipes.len(),
            "Recommendations generated"
        );

        Ok(recipes)
    }
}

fn validate_limit(limit: i64) -> AppResult<()> {
    if !(1..=MAX_RECOMMENDATION_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_RECOMMENDATION_LIMIT
        )));
    }
    Ok(())
}

/// Scores the distance-ordered candidates and re-sorts them by predicted
/// rating, highest first. Equal predictions keep their distance order.
pub fn rank_candidates(
    global_mean: f64,
    user_bias: f64,
    candidates: &[RecipeCandidate],
) -> Vec<ScoredRecipe> {
    let mut scored: Vec<ScoredRecipe> = candidates
        .iter()
        .map(|c| ScoredRecipe::predict(global_mean, user_bias, c))
        .collect();

    scored.sort_by(|a, b| b.predicted_rating.total_cmp(&a.predicted_rating));
    scored
}
