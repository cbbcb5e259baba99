use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

/// Connects the shared Postgres pool used by every store.
/// Acquiring a connection is bounded so a saturated pool fails fast.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(Into::into)
}
