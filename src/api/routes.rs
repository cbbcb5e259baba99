use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            // Top to bottom is outermost to innermost: the request id is
            // assigned before the trace span is opened
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Recipes
        .route("/recipes/search", get(handlers::search_recipes))
        .route("/recipes/batch", post(handlers::get_recipes_batch))
        .route("/recipes/:id", get(handlers::get_recipe))
        .route("/recipes/:id/stats", get(handlers::get_recipe_stats))
        // Ratings
        .route(
            "/recipes/:id/rating",
            put(handlers::rate_recipe).delete(handlers::remove_rating),
        )
        .route("/me/ratings", get(handlers::my_ratings))
        // Recommendations
        .route("/recommendations", get(handlers::recommendations))
        // Provider fallback
        .route("/external/search", get(handlers::external_search))
}
