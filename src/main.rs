use std::{sync::Arc, time::Duration};

use tracing_subscriber::EnvFilter;

use pantry_api::{
    api::{create_router, AppState},
    config::Config,
    db::{
        create_pool, create_redis_client, Cache, PgRatingStore, PgRecipeStore, PgVectorStore,
        RedisBackend,
    },
    services::{
        DailyQuotaGuard, EventDispatcher, ExternalSearchService, JwtIdentityService,
        RecipeService, RecommendationService, RedisRatingPublisher, RedisUsageCounter,
        SpoonacularProvider,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pantry_api=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let redis_client = create_redis_client(&config.redis_url)?;
    tracing::info!("Connected to Postgres and Redis");

    let (cache, cache_handle) = Cache::new(Arc::new(RedisBackend::new(redis_client.clone())));

    // Stores
    let recipe_store = Arc::new(PgRecipeStore::new(pool.clone()).with_scoring(config.search_scoring));
    let rating_store = Arc::new(PgRatingStore::new(pool.clone()));
    let vector_store = Arc::new(PgVectorStore::new(
        pool,
        config.vector_distance,
        config.vector_dimension,
    ));

    // Services
    let events = EventDispatcher::new(Arc::new(RedisRatingPublisher::new(
        redis_client.clone(),
        config.rating_events_channel.clone(),
    )));
    let recipes = Arc::new(RecipeService::new(recipe_store, rating_store, events));
    let recommendations = Arc::new(RecommendationService::new(vector_store, recipes.clone()));

    let quota = Arc::new(DailyQuotaGuard::new(
        Arc::new(RedisUsageCounter::new(redis_client)),
        i64::from(config.daily_api_limit),
    ));
    let provider = SpoonacularProvider::new(
        config.spoonacular_api_key.clone(),
        config.spoonacular_api_url.clone(),
        config.spoonacular_api_host.clone(),
        Duration::from_secs(config.provider_timeout_secs),
        quota,
    )?;
    if config.spoonacular_api_key.is_none() {
        tracing::warn!("SPOONACULAR_API_KEY not set, external search is disabled");
    }
    let external_search = Arc::new(ExternalSearchService::new(
        Arc::new(provider),
        cache,
        config.search_cache_ttl_secs,
    ));

    let identity = Arc::new(JwtIdentityService::new(&config.jwt_secret));

    let state = AppState::new(recipes, recommendations, external_search, identity);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
