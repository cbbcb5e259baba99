use std::sync::Arc;

use crate::{
    db::{RatingStore, RecipeStore},
    error::{AppError, AppResult},
    models::{
        RateOutcome, RatingEvent, RatingStats, RatingValue, Recipe, RecipeSearchOptions,
        RecipeStats, SearchResult,
    },
    services::events::EventDispatcher,
};

/// Search and rating orchestration over the recipe and rating stores
///
/// Cross-entity joins (recipes with the caller's ratings) happen here, by id.
pub struct RecipeService {
    recipes: Arc<dyn RecipeStore>,
    ratings: Arc<dyn RatingStore>,
    events: EventDispatcher,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeStore>,
        ratings: Arc<dyn RatingStore>,
        events: EventDispatcher,
    ) -> Self {
        Self {
            recipes,
            ratings,
            events,
        }
    }

    /// Ingredient search, annotated with the caller's ratings when known
    pub async fn search_recipes_with_ratings(
        &self,
        query: &str,
        user_id: Option<i64>,
        options: RecipeSearchOptions,
    ) -> AppResult<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation("Search query is required".to_string()));
        }
        options.validate()?;

        let recipes = self
            .recipes
            .search_by_ingredients(query, options)
            .await
            .map_err(|e| upstream("search_by_ingredients", e))?;

        let recipes = match user_id {
            Some(user_id) => self.attach_user_ratings(recipes, user_id).await?,
            None => recipes,
        };

        tracing::info!(
            query = %query,
            results = recipes.len(),
            authenticated = user_id.is_some(),
            "Recipe search completed"
        );

        Ok(SearchResult::new(recipes, query.to_string(), options.limit))
    }

    pub async fn get_recipe_with_rating(&self, id: i64, user_id: Option<i64>) -> AppResult<Recipe> {
        let mut recipe = self
            .recipes
            .find_by_id(id)
            .await
            .map_err(|e| upstream("find_by_id", e))?
            .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))?;

        if let Some(user_id) = user_id {
            recipe.user_rating = self
                .ratings
                .user_rating_for_recipe(user_id, id)
                .await
                .map_err(|e| upstream("user_rating_for_recipe", e))?;
        }

        Ok(recipe)
    }

    /// Hydrates `ids` in the given order; ids without a stored recipe are dropped
    pub async fn get_recipes_by_ids_with_ratings(
        &self,
        ids: &[i64],
        user_id: Option<i64>,
    ) -> AppResult<Vec<Recipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let recipes = self
            .recipes
            .find_by_ids(ids)
            .await
            .map_err(|e| upstream("find_by_ids", e))?;

        match user_id {
            Some(user_id) => self.attach_user_ratings(recipes, user_id).await,
            None => Ok(recipes),
        }
    }

    /// Every recipe the user has rated, with their rating attached
    pub async fn get_user_rated_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>> {
        let ratings = self
            .ratings
            .user_ratings(user_id)
            .await
            .map_err(|e| upstream("user_ratings", e))?;

        if ratings.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<i64> = ratings.keys().copied().collect();
        ids.sort_unstable();

        let mut recipes = self
            .recipes
            .find_by_ids(&ids)
            .await
            .map_err(|e| upstream("find_by_ids", e))?;

        for recipe in &mut recipes {
            recipe.user_rating = ratings.get(&recipe.id).copied();
        }

        Ok(recipes)
    }

    /// Stores the caller's rating, then notifies the retraining consumer
    pub async fn rate_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
        rating: i64,
    ) -> AppResult<RateOutcome> {
        let rating = RatingValue::new(rating)?;

        let exists = self
            .recipes
            .find_by_id(recipe_id)
            .await
            .map_err(|e| upstream("find_by_id", e))?
            .is_some();
        if !exists {
            return Err(AppError::NotFound("Recipe not found".to_string()));
        }

        let upserted = self
            .ratings
            .upsert(user_id, recipe_id, rating)
            .await
            .map_err(|e| upstream("upsert_rating", e))?;

        tracing::info!(user_id, recipe_id, rating = rating.get(), upserted, "Rating stored");

        // The rating is persisted; the event is only a retraining hint
        self.events
            .dispatch(RatingEvent::new(user_id, recipe_id, rating));

        Ok(RateOutcome {
            upserted,
            rating: rating.get(),
        })
    }

    pub async fn remove_rating(&self, user_id: i64, recipe_id: i64) -> AppResult<bool> {
        let removed = self
            .ratings
            .delete(user_id, recipe_id)
            .await
            .map_err(|e| upstream("delete_rating", e))?;

        tracing::info!(user_id, recipe_id, removed, "Rating removal processed");

        Ok(removed)
    }

    /// Rating aggregate for a recipe, `None` when the recipe does not exist
    pub async fn get_recipe_stats(&self, recipe_id: i64) -> AppResult<Option<RecipeStats>> {
        let Some(recipe) = self
            .recipes
            .find_by_id(recipe_id)
            .await
            .map_err(|e| upstream("find_by_id", e))?
        else {
            return Ok(None);
        };

        let distribution = self
            .ratings
            .rating_distribution(recipe_id)
            .await
            .map_err(|e| upstream("rating_distribution", e))?;
        let stats = RatingStats::from_distribution(distribution);

        Ok(Some(RecipeStats {
            recipe,
            average_rating: stats.average,
            rating_count: stats.count,
            rating_distribution: stats.distribution,
        }))
    }

    async fn attach_user_ratings(
        &self,
        mut recipes: Vec<Recipe>,
        user_id: i64,
    ) -> AppResult<Vec<Recipe>> {
        let ratings = self
            .ratings
            .user_ratings(user_id)
            .await
            .map_err(|e| upstream("user_ratings", e))?;

        for recipe in &mut recipes {
            recipe.user_rating = ratings.get(&recipe.id).copied();
        }

        Ok(recipes)
    }
}

/// Logs a store failure with the operation name only and re-raises it as
/// an upstream error. Typed domain errors pass through unchanged.
pub(crate) fn upstream(operation: &'static str, err: AppError) -> AppError {
    match err {
        AppError::Database(_) | AppError::Cache(_) | AppError::Internal(_) => {
            tracing::error!(operation, error = %err, "Store operation failed");
            AppError::upstream(500, format!("{} failed", operation))
        }
        other => other,
    }
}
