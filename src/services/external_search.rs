use std::{collections::HashMap, sync::Arc};

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::{IngredientSet, RecipeSummary},
    services::providers::{extract_recipe_ids, RecipeProvider},
};

/// Fallback search against the external recipe provider
///
/// Both provider calls are cached: the ingredient set resolves to ids, and
/// each id has its own summary entry, so overlapping searches only pay for
/// the recipes nobody has fetched yet.
#[derive(Clone)]
pub struct ExternalSearchService {
    provider: Arc<dyn RecipeProvider>,
    cache: Cache,
    ttl: u64,
}

impl ExternalSearchService {
    pub fn new(provider: Arc<dyn RecipeProvider>, cache: Cache, ttl: u64) -> Self {
        Self {
            provider,
            cache,
            ttl,
        }
    }

    /// Recipe summaries for a comma-separated ingredient list, in candidate order
    pub async fn search(&self, raw_ingredients: &str) -> AppResult<Vec<RecipeSummary>> {
        let ingredients = IngredientSet::parse(raw_ingredients)?;
        let key = CacheKey::IngredientSearch(ingredients.clone());

        let ids: AppResult<Vec<i64>> = cached!(self.cache, key, self.ttl, async {
            let matches = self.provider.find_by_ingredients(&ingredients).await?;
            extract_recipe_ids(&matches)
        });
        let ids = ids?;

        let summaries = self.hydrate(&ids).await?;

        tracing::info!(
            provider = self.provider.name(),
            ingredients = %ingredients,
            results = summaries.len(),
            "External recipe search completed"
        );

        Ok(summaries)
    }

    /// Summaries for `ids` in order. Only ids missing from the cache reach
    /// the provider, in a single bulk call.
    async fn hydrate(&self, ids: &[i64]) -> AppResult<Vec<RecipeSummary>> {
        let mut found: HashMap<i64, RecipeSummary> = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self
                .cache
                .get_from_cache::<RecipeSummary>(&CacheKey::ProviderRecipe(*id))
                .await?
            {
                Some(summary) => {
                    found.insert(*id, summary);
                }
                None => missing.push(*id),
            }
        }

        tracing::debug!(
            cached = found.len(),
            missing = missing.len(),
            "Resolved provider recipes from cache"
        );

        if !missing.is_empty() {
            let fetched = self.provider.information_bulk(&missing).await?;
            for recipe in fetched {
                let summary = RecipeSummary::from(recipe);
                self.cache
                    .set_in_background(&CacheKey::ProviderRecipe(summary.id), &summary, self.ttl);
                found.insert(summary.id, summary);
            }
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }
}
