use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Distance operator used to compare latent vectors. Smaller is more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

impl DistanceMetric {
    /// pgvector operator for this metric
    pub fn operator(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "<=>",
            DistanceMetric::Euclidean => "<->",
        }
    }
}

/// A user's trained latent vector and bias
#[derive(Debug, Clone, PartialEq)]
pub struct UserVector {
    pub user_id: i64,
    pub vector: Vec<f32>,
    pub bias: f64,
    pub updated_at: DateTime<Utc>,
}

/// A recipe selected by vector proximity to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecipeCandidate {
    pub recipe_id: i64,
    pub bias: f64,
    pub distance: f64,
}

/// A candidate with its predicted rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredRecipe {
    pub recipe_id: i64,
    pub distance: f64,
    pub predicted_rating: f64,
}

impl ScoredRecipe {
    /// `global mean + user bias + recipe bias + (1 - distance)`
    pub fn predict(global_mean: f64, user_bias: f64, candidate: &RecipeCandidate) -> Self {
        Self {
            recipe_id: candidate.recipe_id,
            distance: candidate.distance,
            predicted_rating: global_mean + user_bias + candidate.bias + (1.0 - candidate.distance),
        }
    }
}
