use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::{AuthUser, MaybeAuthUser, RequestId},
    models::{
        RateOutcome, RatingValue, Recipe, RecipeSearchOptions, RecipeStats, RecipeSummary,
        SearchResult,
    },
    services::recommendations::DEFAULT_RECOMMENDATION_LIMIT,
};

use super::AppState;

pub const MAX_BATCH_IDS: usize = 100;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl SearchParams {
    fn options(&self) -> RecipeSearchOptions {
        let defaults = RecipeSearchOptions::default();
        RecipeSearchOptions {
            limit: self.limit.unwrap_or(defaults.limit),
            skip: self.skip.unwrap_or(defaults.skip),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub ids: Vec<i64>,
}

impl BatchRequest {
    fn validate(&self) -> AppResult<()> {
        if self.ids.len() > MAX_BATCH_IDS {
            return Err(AppError::Validation(format!(
                "At most {} ids may be requested at once",
                MAX_BATCH_IDS
            )));
        }
        Ok(())
    }
}

/// Rating arrives untyped so `4.5` and `"4"` are rejected with a domain
/// message instead of a deserializer error
#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: Value,
}

#[derive(Debug, Serialize)]
pub struct RemoveRatingResponse {
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalSearchParams {
    #[serde(default)]
    pub ingredients: String,
}

// Handlers

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Ingredient search, personalized when the caller is signed in
pub async fn search_recipes(
    State(state): State<AppState>,
    request_id: RequestId,
    caller: MaybeAuthUser,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> AppResult<Json<SearchResult>> {
    let Query(params) = params?;

    tracing::debug!(%request_id, query = %params.q, "Searching recipes");

    let result = state
        .recipes
        .search_recipes_with_ratings(&params.q, caller.user_id(), params.options())
        .await?;

    Ok(Json(result))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Recipe>> {
    let Path(id) = id?;
    let recipe = state.recipes.get_recipe_with_rating(id, caller.user_id()).await?;
    Ok(Json(recipe))
}

/// Hydrates a list of ids, keeping the request order
pub async fn get_recipes_batch(
    State(state): State<AppState>,
    caller: MaybeAuthUser,
    body: Result<Json<BatchRequest>, JsonRejection>,
) -> AppResult<Json<Vec<Recipe>>> {
    let Json(body) = body?;
    body.validate()?;

    let recipes = state
        .recipes
        .get_recipes_by_ids_with_ratings(&body.ids, caller.user_id())
        .await?;

    Ok(Json(recipes))
}

pub async fn get_recipe_stats(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<RecipeStats>> {
    let Path(id) = id?;

    state
        .recipes
        .get_recipe_stats(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

pub async fn rate_recipe(
    State(state): State<AppState>,
    request_id: RequestId,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<RateRequest>, JsonRejection>,
) -> AppResult<Json<RateOutcome>> {
    let Path(recipe_id) = id?;
    let Json(body) = body?;
    let rating = RatingValue::from_json(&body.rating)?;

    tracing::debug!(%request_id, user_id = user.id, recipe_id, "Rating recipe");

    let outcome = state
        .recipes
        .rate_recipe(user.id, recipe_id, i64::from(rating.get()))
        .await?;

    Ok(Json(outcome))
}

pub async fn remove_rating(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<RemoveRatingResponse>> {
    let Path(recipe_id) = id?;
    let removed = state.recipes.remove_rating(user.id, recipe_id).await?;
    Ok(Json(RemoveRatingResponse { removed }))
}

/// Recipes the caller has rated
pub async fn my_ratings(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Recipe>>> {
    let recipes = state.recipes.get_user_rated_recipes(user.id).await?;
    Ok(Json(recipes))
}

pub async fn recommendations(
    State(state): State<AppState>,
    request_id: RequestId,
    AuthUser(user): AuthUser,
    params: Result<Query<RecommendationParams>, QueryRejection>,
) -> AppResult<Json<Vec<Recipe>>> {
    let Query(params) = params?;
    let limit = params.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);

    tracing::debug!(%request_id, user_id = user.id, limit, "Generating recommendations");

    let recipes = state
        .recommendations
        .get_recommendations_for_user(user.id, limit)
        .await?;

    Ok(Json(recipes))
}

/// Provider fallback search by ingredient list
pub async fn external_search(
    State(state): State<AppState>,
    request_id: RequestId,
    params: Result<Query<ExternalSearchParams>, QueryRejection>,
) -> AppResult<Json<Vec<RecipeSummary>>> {
    let Query(params) = params?;

    tracing::debug!(%request_id, "Searching external provider");

    let summaries = state.external_search.search(&params.ingredients).await?;
    Ok(Json(summaries))
}
