use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display};

use crate::error::{AppError, AppResult};

/// A normalized, order-independent set of ingredient names
///
/// `"Tomato,Cheese"` and `" cheese , tomato,TOMATO"` produce the same set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngredientSet(BTreeSet<String>);

impl IngredientSet {
    /// Parses a comma-separated ingredient list
    pub fn parse(raw: &str) -> AppResult<Self> {
        let set: BTreeSet<String> = raw
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if set.is_empty() {
            return Err(AppError::Validation(
                "Missing required parameter: ingredients".to_string(),
            ));
        }
        Ok(Self(set))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for IngredientSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{}", joined.join(","))
    }
}

/// Candidate stub returned by `/recipes/findByIngredients`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMatch {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Detailed record returned by `/recipes/informationBulk`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecipe {
    pub id: i64,
    #[serde(default)]
    pub image: Option<String>,
    pub title: String,
    #[serde(default)]
    pub ready_in_minutes: Option<i32>,
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Provider-specific fields that never leave this service
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The fields of a provider recipe exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: i64,
    pub image: Option<String>,
    pub title: String,
    pub ready_in_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub source_url: Option<String>,
}

impl From<ProviderRecipe> for RecipeSummary {
    fn from(recipe: ProviderRecipe) -> Self {
        Self {
            id: recipe.id,
            image: recipe.image,
            title: recipe.title,
            ready_in_minutes: recipe.ready_in_minutes,
            servings: recipe.servings,
            source_url: recipe.source_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_set_ignores_case_order_and_duplicates() {
        let a = IngredientSet::parse("Tomato,Cheese").unwrap();
        let b = IngredientSet::parse(" cheese , tomato,TOMATO").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "cheese,tomato");
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_ingredient_set_rejects_blank_input() {
        assert!(IngredientSet::parse("").is_err());
        assert!(IngredientSet::parse(" , ,").is_err());
    }

    #[test]
    fn test_summary_drops_provider_fields() {
        let json = r#"{
            "id": 716429,
            "title": "Pasta with Garlic, Scallions, Cauliflower & Breadcrumbs",
            "image": "https://img.spoonacular.com/recipes/716429-556x370.jpg",
            "readyInMinutes": 45,
            "servings": 2,
            "sourceUrl": "http://fullbellysisters.blogspot.com/2012/06/pasta.html",
            "pricePerServing": 163.15,
            "cuisines": [],
            "vegan": false
        }"#;

        let recipe: ProviderRecipe = serde_json::from_str(json).unwrap();
        assert!(recipe.extra.contains_key("pricePerServing"));

        let summary = serde_json::to_value(RecipeSummary::from(recipe)).unwrap();
        let keys: BTreeSet<&str> = summary
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            BTreeSet::from(["id", "image", "title", "readyInMinutes", "servings", "sourceUrl"])
        );
        assert_eq!(summary["readyInMinutes"], 45);
    }
}
