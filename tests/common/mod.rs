#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::http::{header::AUTHORIZATION, HeaderValue};
use axum_test::{TestRequest, TestServer};

use pantry_api::{
    api::{create_router, AppState},
    db::{Cache, CacheBackend, CacheWriterHandle, RatingStore, RecipeStore, VectorStore},
    error::{AppError, AppResult},
    models::{
        DistanceMetric, IngredientMatch, IngredientSet, Nutrition, ProviderRecipe, RatingEvent,
        RatingValue, Recipe, RecipeCandidate, RecipeSearchOptions, UserIdentity, UserVector,
    },
    services::{
        EventDispatcher, ExternalSearchService, IdentityVerifier, JwtIdentityService,
        QuotaGuard, RatingEventPublisher, RecipeProvider, RecipeService, RecommendationService,
    },
};

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn recipe(id: i64, ingredients: &[&str]) -> Recipe {
    Recipe {
        id,
        name: format!("recipe {}", id),
        minutes: 25,
        nutrition: Nutrition::from([250.0, 10.0, 5.0, 12.0, 20.0, 8.0, 9.0]),
        steps: vec!["prepare".to_string(), "cook".to_string()],
        description: format!("description of {}", id),
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        user_rating: None,
    }
}

/// Recipes kept in id order; search matches every query word against the
/// ingredient list, in insertion order
#[derive(Default)]
pub struct MemoryRecipeStore {
    recipes: Vec<Recipe>,
}

impl MemoryRecipeStore {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }
}

#[async_trait::async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn search_by_ingredients(
        &self,
        query: &str,
        options: RecipeSearchOptions,
    ) -> AppResult<Vec<Recipe>> {
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

        Ok(self
            .recipes
            .iter()
            .filter(|r| {
                words
                    .iter()
                    .all(|w| r.ingredients.iter().any(|i| i.to_lowercase().contains(w)))
            })
            .skip(options.skip as usize)
            .take(options.limit as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Recipe>> {
        Ok(self.recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Recipe>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.recipes.iter().find(|r| r.id == *id).cloned())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryRatingStore {
    ratings: Mutex<HashMap<(i64, i64), i32>>,
}

#[async_trait::async_trait]
impl RatingStore for MemoryRatingStore {
    async fn upsert(&self, user_id: i64, recipe_id: i64, rating: RatingValue) -> AppResult<bool> {
        let previous = self
            .ratings
            .lock()
            .unwrap()
            .insert((user_id, recipe_id), rating.get());
        Ok(previous.is_none())
    }

    async fn delete(&self, user_id: i64, recipe_id: i64) -> AppResult<bool> {
        Ok(self
            .ratings
            .lock()
            .unwrap()
            .remove(&(user_id, recipe_id))
            .is_some())
    }

    async fn user_ratings(&self, user_id: i64) -> AppResult<HashMap<i64, i32>> {
        Ok(self
            .ratings
            .lock()
            .unwrap()
            .iter()
            .filter(|((u, _), _)| *u == user_id)
            .map(|((_, r), rating)| (*r, *rating))
            .collect())
    }

    async fn user_rating_for_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> AppResult<Option<i32>> {
        Ok(self.ratings.lock().unwrap().get(&(user_id, recipe_id)).copied())
    }

    async fn rating_distribution(&self, recipe_id: i64) -> AppResult<BTreeMap<i32, i64>> {
        let mut distribution = BTreeMap::new();
        for ((_, r), rating) in self.ratings.lock().unwrap().iter() {
            if *r == recipe_id {
                *distribution.entry(*rating).or_insert(0) += 1;
            }
        }
        Ok(distribution)
    }
}

/// Distance as pgvector computes it for the metric's operator
pub fn vector_distance(metric: DistanceMetric, a: &[f32], b: &[f32]) -> AppResult<f64> {
    if a.len() != b.len() {
        return Err(AppError::Validation(format!(
            "Vector dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let pairs = a.iter().zip(b).map(|(x, y)| (f64::from(*x), f64::from(*y)));

    match metric {
        DistanceMetric::Euclidean => Ok(pairs.map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()),
        DistanceMetric::Cosine => {
            let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
            for (x, y) in pairs {
                dot += x * y;
                norm_a += x * x;
                norm_b += y * y;
            }
            if norm_a == 0.0 || norm_b == 0.0 {
                // pgvector yields NaN; rank last
                return Ok(f64::MAX);
            }
            Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
        }
    }
}

/// Brute-force nearest neighbours over in-memory vectors
#[derive(Default)]
pub struct MemoryVectorStore {
    pub metric: DistanceMetric,
    pub users: HashMap<i64, UserVector>,
    pub global_mean: Option<f64>,
    /// (recipe id, bias, vector)
    pub recipes: Vec<(i64, f64, Vec<f32>)>,
}

#[async_trait::async_trait]
impl VectorStore for MemoryVectorStore {
    async fn find_user_vector(&self, user_id: i64) -> AppResult<Option<UserVector>> {
        Ok(self.users.get(&user_id).cloned())
    }

    async fn latest_global_mean(&self) -> AppResult<Option<f64>> {
        Ok(self.global_mean)
    }

    async fn nearest_recipes(&self, user_id: i64, limit: i64) -> AppResult<Vec<RecipeCandidate>> {
        let Some(user) = self.users.get(&user_id) else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::with_capacity(self.recipes.len());
        for (recipe_id, bias, vector) in &self.recipes {
            candidates.push(RecipeCandidate {
                recipe_id: *recipe_id,
                bias: *bias,
                distance: vector_distance(self.metric, vector, &user.vector)?,
            });
        }
        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        candidates.truncate(limit as usize);

        Ok(candidates)
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<RatingEvent>>,
}

#[async_trait::async_trait]
impl RatingEventPublisher for RecordingPublisher {
    async fn publish(&self, event: &RatingEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Provider double that counts calls per endpoint
#[derive(Default)]
pub struct StubProvider {
    pub matches: Vec<IngredientMatch>,
    pub search_calls: AtomicUsize,
    pub bulk_calls: AtomicUsize,
}

impl StubProvider {
    pub fn with_ids(ids: &[i64]) -> Self {
        Self {
            matches: ids
                .iter()
                .map(|id| IngredientMatch {
                    id: Some(*id),
                    title: Some(format!("stub {}", id)),
                    image: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.search_calls.load(Ordering::SeqCst),
            self.bulk_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait::async_trait]
impl RecipeProvider for StubProvider {
    async fn find_by_ingredients(
        &self,
        _ingredients: &IngredientSet,
    ) -> AppResult<Vec<IngredientMatch>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matches.clone())
    }

    async fn information_bulk(&self, ids: &[i64]) -> AppResult<Vec<ProviderRecipe>> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let body: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "title": format!("stub {}", id),
                    "image": null,
                    "readyInMinutes": 30,
                    "servings": 4,
                    "sourceUrl": "https://example.com/recipe",
                    "pricePerServing": 99.5,
                    "vegan": true
                })
            })
            .collect();
        serde_json::from_value(serde_json::Value::Array(body))
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Quota that refuses every call
pub struct ExhaustedQuota;

#[async_trait::async_trait]
impl QuotaGuard for ExhaustedQuota {
    async fn acquire(&self) -> AppResult<()> {
        Err(AppError::Config("Daily API request limit reached".to_string()))
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: tokio::sync::Mutex<HashMap<String, String>>,
}

#[async_trait::async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set_ex(&self, key: &str, value: String, _ttl: u64) -> AppResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub publisher: Arc<RecordingPublisher>,
    pub identity: Arc<JwtIdentityService>,
    pub cache_handle: CacheWriterHandle,
}

impl TestApp {
    /// Bearer token for a user with the given id
    pub fn token_for(&self, user_id: i64) -> String {
        let user = UserIdentity {
            id: user_id,
            email: format!("user{}@example.com", user_id),
            name: format!("User {}", user_id),
        };
        self.identity.issue(&user).unwrap()
    }
}

pub struct TestAppBuilder {
    recipes: Vec<Recipe>,
    vectors: MemoryVectorStore,
    provider: Arc<dyn RecipeProvider>,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            recipes: Vec::new(),
            vectors: MemoryVectorStore::default(),
            provider: Arc::new(StubProvider::default()),
        }
    }
}

impl TestAppBuilder {
    pub fn recipes(mut self, recipes: Vec<Recipe>) -> Self {
        self.recipes = recipes;
        self
    }

    pub fn vectors(mut self, vectors: MemoryVectorStore) -> Self {
        self.vectors = vectors;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn RecipeProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn build(self) -> TestApp {
        let publisher = Arc::new(RecordingPublisher::default());
        let identity = Arc::new(JwtIdentityService::new(TEST_SECRET));

        let recipes = Arc::new(RecipeService::new(
            Arc::new(MemoryRecipeStore::new(self.recipes)),
            Arc::new(MemoryRatingStore::default()),
            EventDispatcher::new(publisher.clone()),
        ));
        let recommendations = Arc::new(RecommendationService::new(
            Arc::new(self.vectors),
            recipes.clone(),
        ));

        let (cache, cache_handle) = Cache::new(Arc::new(MemoryBackend::default()));
        let external_search = Arc::new(ExternalSearchService::new(self.provider, cache, 3600));

        let state = AppState::new(recipes, recommendations, external_search, identity.clone());
        let server = TestServer::new(create_router(state)).unwrap();

        TestApp {
            server,
            publisher,
            identity,
            cache_handle,
        }
    }
}

pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}
