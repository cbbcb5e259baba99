/// External recipe provider abstraction
///
/// The fallback search runs in two calls: ingredients resolve to candidate
/// ids, then the ids are hydrated in one bulk request. Each call is a paid
/// request and goes through the daily quota.
use crate::{
    error::{AppError, AppResult},
    models::{IngredientMatch, IngredientSet, ProviderRecipe},
};

pub mod spoonacular;

pub use spoonacular::SpoonacularProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeProvider: Send + Sync {
    /// Candidate recipes that use the given ingredients
    async fn find_by_ingredients(&self, ingredients: &IngredientSet)
        -> AppResult<Vec<IngredientMatch>>;

    /// Full records for `ids`, in whatever order the provider returns them
    async fn information_bulk(&self, ids: &[i64]) -> AppResult<Vec<ProviderRecipe>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Positive ids from a candidate list, in order, without duplicates
pub fn extract_recipe_ids(matches: &[IngredientMatch]) -> AppResult<Vec<i64>> {
    let mut ids: Vec<i64> = Vec::with_capacity(matches.len());
    for id in matches.iter().filter_map(|m| m.id).filter(|id| *id > 0) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(AppError::NotFound(
            "No recipes found for the provided ingredients".to_string(),
        ));
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: Option<i64>) -> IngredientMatch {
        IngredientMatch {
            id,
            title: None,
            image: None,
        }
    }

    #[test]
    fn test_extract_skips_missing_and_non_positive_ids() {
        let matches = vec![
            candidate(Some(7)),
            candidate(None),
            candidate(Some(0)),
            candidate(Some(-3)),
            candidate(Some(2)),
            candidate(Some(7)),
        ];
        assert_eq!(extract_recipe_ids(&matches).unwrap(), vec![7, 2]);
    }

    #[test]
    fn test_extract_without_usable_ids_is_not_found() {
        let err = extract_recipe_ids(&[candidate(None), candidate(Some(0))]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(extract_recipe_ids(&[]), Err(AppError::NotFound(_))));
    }
}
