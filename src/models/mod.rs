pub mod provider;
pub mod rating;
pub mod recipe;
pub mod recommendation;
pub mod user;

pub use provider::{IngredientMatch, IngredientSet, ProviderRecipe, RecipeSummary};
pub use rating::{RateOutcome, RatingEvent, RatingStats, RatingValue};
pub use recipe::{Nutrition, Recipe, RecipeSearchOptions, RecipeStats, SearchResult};
pub use recommendation::{DistanceMetric, RecipeCandidate, ScoredRecipe, UserVector};
pub use user::UserIdentity;
