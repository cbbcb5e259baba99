use std::sync::Arc;

use crate::services::{
    ExternalSearchService, IdentityVerifier, RecipeService, RecommendationService,
};

/// Shared application state
///
/// Every field is constructed once at startup; clones share the same services.
#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<RecipeService>,
    pub recommendations: Arc<RecommendationService>,
    pub external_search: Arc<ExternalSearchService>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(
        recipes: Arc<RecipeService>,
        recommendations: Arc<RecommendationService>,
        external_search: Arc<ExternalSearchService>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            recipes,
            recommendations,
            external_search,
            identity,
        }
    }
}
