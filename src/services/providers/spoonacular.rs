/// Spoonacular provider, reached through RapidAPI
///
/// API Flow:
/// 1. Candidates: /recipes/findByIngredients?ingredients=a,b&number=100
/// 2. Details: /recipes/informationBulk?ids=1,2,3
use reqwest::{Client as HttpClient, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};

use crate::{
    error::{AppError, AppResult},
    models::{IngredientMatch, IngredientSet, ProviderRecipe},
    services::{providers::RecipeProvider, quota::QuotaGuard},
};

/// Upper bound on candidates requested per ingredient search
const MAX_CANDIDATES: u32 = 100;

#[derive(Clone)]
pub struct SpoonacularProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    api_host: String,
    quota: Arc<dyn QuotaGuard>,
}

impl SpoonacularProvider {
    pub fn new(
        api_key: Option<String>,
        api_url: String,
        api_host: String,
        timeout: Duration,
        quota: Arc<dyn QuotaGuard>,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_host,
            quota,
        })
    }

    pub fn search_url(&self, ingredients: &IngredientSet) -> AppResult<Url> {
        self.endpoint(
            "recipes/findByIngredients",
            &[
                ("ingredients", ingredients.to_string()),
                ("number", MAX_CANDIDATES.to_string()),
            ],
        )
    }

    pub fn bulk_url(&self, ids: &[i64]) -> AppResult<Url> {
        if ids.is_empty() {
            return Err(AppError::Validation(
                "Missing or empty required parameter: ids".to_string(),
            ));
        }

        let joined: Vec<String> = ids.iter().map(i64::to_string).collect();
        self.endpoint("recipes/informationBulk", &[("ids", joined.join(","))])
    }

    /// Query values are percent-encoded
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> AppResult<Url> {
        Url::parse_with_params(&format!("{}/{}", self.api_url, path), params)
            .map_err(|e| AppError::Config(format!("Invalid recipe provider URL: {}", e)))
    }

    fn api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Config("Recipe provider API key is not configured".to_string()))
    }

    /// Authenticated GET. The key check and the quota both run before any
    /// network traffic.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let api_key = self.api_key()?;
        self.quota.acquire().await?;

        let request = self.authorize(self.http_client.get(url), api_key);
        let response = request.send().await?;
        let response = Self::check_status(response).await?;

        Ok(response.json().await?)
    }

    fn authorize(&self, request: RequestBuilder, api_key: &str) -> RequestBuilder {
        request
            .header("x-rapidapi-key", api_key)
            .header("x-rapidapi-host", &self.api_host)
    }

    /// Non-2xx responses surface with the provider's status and body
    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "Recipe provider returned an error");
        Err(AppError::upstream(status.as_u16(), body))
    }
}

#[async_trait::async_trait]
impl RecipeProvider for SpoonacularProvider {
    async fn find_by_ingredients(
        &self,
        ingredients: &IngredientSet,
    ) -> AppResult<Vec<IngredientMatch>> {
        let url = self.search_url(ingredients)?;
        let matches: Vec<IngredientMatch> = self.get_json(url).await?;

        tracing::info!(
            ingredients = %ingredients,
            candidates = matches.len(),
            "Provider ingredient search completed"
        );

        Ok(matches)
    }

    async fn information_bulk(&self, ids: &[i64]) -> AppResult<Vec<ProviderRecipe>> {
        let url = self.bulk_url(ids)?;
        let recipes: Vec<ProviderRecipe> = self.get_json(url).await?;

        tracing::info!(requested = ids.len(), returned = recipes.len(), "Provider bulk lookup completed");

        Ok(recipes)
    }

    fn name(&self) -> &'static str {
        "spoonacular"
    }
}
