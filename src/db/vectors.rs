use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{DistanceMetric, RecipeCandidate, UserVector},
};

/// Read access to the trained latent-factor model
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// The user's vector, or `None` when training has not seen this user yet
    async fn find_user_vector(&self, user_id: i64) -> AppResult<Option<UserVector>>;

    /// Global mean of the most recently completed training run
    async fn latest_global_mean(&self) -> AppResult<Option<f64>>;

    /// The `limit` recipe vectors nearest to the user's vector, nearest first
    async fn nearest_recipes(&self, user_id: i64, limit: i64) -> AppResult<Vec<RecipeCandidate>>;
}

/// Builder for the nearest-neighbour candidate statement
///
/// The user's vector is joined in SQL, so one round trip selects the
/// candidates and carries every term the predicted rating needs.
#[derive(Debug, Clone, Copy)]
pub struct RankingQuery {
    metric: DistanceMetric,
}

impl RankingQuery {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }

    pub fn sql(&self) -> String {
        format!(
            "SELECT r.recipe_id, r.bias, (r.vector {op} u.vector)::float8 AS distance \
             FROM recipe_vectors r \
             CROSS JOIN (SELECT vector FROM user_vectors WHERE user_id = $1) u \
             ORDER BY r.vector {op} u.vector ASC \
             LIMIT $2",
            op = self.metric.operator()
        )
    }
}

#[derive(Debug, FromRow)]
struct UserVectorRow {
    user_id: i64,
    vector: Vec<f32>,
    bias: f64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    recipe_id: i64,
    bias: f64,
    distance: f64,
}

/// pgvector-backed store for user/recipe vectors and training metadata
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    ranking: RankingQuery,
    dimension: usize,
}

impl PgVectorStore {
    pub fn new(pool: PgPool, metric: DistanceMetric, dimension: usize) -> Self {
        Self {
            pool,
            ranking: RankingQuery::new(metric),
            dimension,
        }
    }
}

/// A stored vector of another dimension was written by a different model
fn check_dimension(vector: &[f32], expected: usize) -> AppResult<()> {
    if vector.len() != expected {
        return Err(AppError::Config(format!(
            "Stored vector has dimension {}, expected {}",
            vector.len(),
            expected
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl VectorStore for PgVectorStore {
    async fn find_user_vector(&self, user_id: i64) -> AppResult<Option<UserVector>> {
        let row: Option<UserVectorRow> = sqlx::query_as(
            "SELECT user_id, vector::real[] AS vector, bias, updated_at \
             FROM user_vectors WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        check_dimension(&row.vector, self.dimension)?;

        Ok(Some(UserVector {
            user_id: row.user_id,
            vector: row.vector,
            bias: row.bias,
            updated_at: row.updated_at,
        }))
    }

    async fn latest_global_mean(&self) -> AppResult<Option<f64>> {
        // completion_time, not id: backfilled runs can be inserted out of order
        let row: Option<(f64,)> = sqlx::query_as(
            "SELECT global_mean FROM svd_metadata ORDER BY completion_time DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(mean,)| mean))
    }

    async fn nearest_recipes(&self, user_id: i64, limit: i64) -> AppResult<Vec<RecipeCandidate>> {
        let rows: Vec<CandidateRow> = sqlx::query_as(&self.ranking.sql())
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| RecipeCandidate {
                recipe_id: r.recipe_id,
                bias: r.bias,
                distance: r.distance,
            })
            .collect())
    }
}
