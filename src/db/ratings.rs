use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};

use crate::{error::AppResult, models::RatingValue};

/// Storage for user ratings, keyed by (user, recipe)
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingStore: Send + Sync {
    /// Inserts or overwrites the rating atomically. Returns true when the
    /// (user, recipe) pair had no rating before.
    async fn upsert(&self, user_id: i64, recipe_id: i64, rating: RatingValue) -> AppResult<bool>;

    /// Returns true when a rating was removed
    async fn delete(&self, user_id: i64, recipe_id: i64) -> AppResult<bool>;

    /// All ratings of one user as recipe id -> rating
    async fn user_ratings(&self, user_id: i64) -> AppResult<HashMap<i64, i32>>;

    async fn user_rating_for_recipe(&self, user_id: i64, recipe_id: i64)
        -> AppResult<Option<i32>>;

    /// Histogram of rating value -> count for one recipe
    async fn rating_distribution(&self, recipe_id: i64) -> AppResult<BTreeMap<i32, i64>>;
}

/// Postgres-backed rating store
#[derive(Clone)]
pub struct PgRatingStore {
    pool: PgPool,
}

impl PgRatingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RatingStore for PgRatingStore {
    async fn upsert(&self, user_id: i64, recipe_id: i64, rating: RatingValue) -> AppResult<bool> {
        // xmax is zero only for a freshly inserted tuple
        let (inserted,): (bool,) = sqlx::query_as(
            r#"
            INSERT INTO ratings (user_id, recipe_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, recipe_id)
            DO UPDATE SET rating = EXCLUDED.rating, updated_at = now()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(user_id)
        .bind(recipe_id)
        .bind(rating.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn delete(&self, user_id: i64, recipe_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM ratings WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_ratings(&self, user_id: i64) -> AppResult<HashMap<i64, i32>> {
        let rows: Vec<(i64, i32)> =
            sqlx::query_as("SELECT recipe_id, rating FROM ratings WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    async fn user_rating_for_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> AppResult<Option<i32>> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT rating FROM ratings WHERE user_id = $1 AND recipe_id = $2")
                .bind(user_id)
                .bind(recipe_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(rating,)| rating))
    }

    async fn rating_distribution(&self, recipe_id: i64) -> AppResult<BTreeMap<i32, i64>> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            "SELECT rating, COUNT(*) FROM ratings WHERE recipe_id = $1 GROUP BY rating",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}
