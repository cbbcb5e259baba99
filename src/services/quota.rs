use chrono::{NaiveDate, Utc};
use redis::Client;
use std::sync::Arc;

use crate::error::{AppError, AppResult};

/// Counter keys outlive their day so late requests near midnight still see them
const QUOTA_KEY_TTL: i64 = 172_800; // 2 days

/// Admission control for paid provider calls
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait QuotaGuard: Send + Sync {
    /// Consumes one unit of today's allowance, or fails without consuming
    async fn acquire(&self) -> AppResult<()>;
}

/// Shared per-key request counter
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UsageCounter: Send + Sync {
    /// Increments `key` and returns the new value
    async fn incr(&self, key: &str) -> AppResult<i64>;

    async fn decr(&self, key: &str) -> AppResult<()>;
}

/// Redis counter shared by every instance
#[derive(Clone)]
pub struct RedisUsageCounter {
    redis_client: Client,
}

impl RedisUsageCounter {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

#[async_trait::async_trait]
impl UsageCounter for RedisUsageCounter {
    async fn incr(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, QUOTA_KEY_TTL)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count)
    }

    async fn decr(&self, key: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: i64 = redis::cmd("DECR").arg(key).query_async(&mut conn).await?;
        Ok(())
    }
}

/// Caps provider calls per UTC day
#[derive(Clone)]
pub struct DailyQuotaGuard {
    counter: Arc<dyn UsageCounter>,
    daily_limit: i64,
}

impl DailyQuotaGuard {
    pub fn new(counter: Arc<dyn UsageCounter>, daily_limit: i64) -> Self {
        Self {
            counter,
            daily_limit,
        }
    }
}

#[async_trait::async_trait]
impl QuotaGuard for DailyQuotaGuard {
    async fn acquire(&self) -> AppResult<()> {
        let key = quota_key(Utc::now().date_naive());

        // Increment first and compare after, so concurrent callers cannot both
        // observe the last free slot
        let count = self.counter.incr(&key).await?;

        if exceeds_limit(count, self.daily_limit) {
            self.counter.decr(&key).await?;
            tracing::warn!(count, limit = self.daily_limit, "Daily provider quota exhausted");
            return Err(AppError::Config("Daily API request limit reached".to_string()));
        }

        tracing::debug!(count, limit = self.daily_limit, "Provider quota acquired");
        Ok(())
    }
}

/// Counter key for one UTC day
pub fn quota_key(day: NaiveDate) -> String {
    format!("api_usage:daily:{}", day.format("%Y-%m-%d"))
}

fn exceeds_limit(count: i64, limit: i64) -> bool {
    count > limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Mock counter backed by a real integer
    fn counting(value: Arc<AtomicI64>, decrements: usize) -> MockUsageCounter {
        let mut counter = MockUsageCounter::new();
        let incr_value = value.clone();
        counter
            .expect_incr()
            .returning(move |_| Ok(incr_value.fetch_add(1, Ordering::SeqCst) + 1));
        counter
            .expect_decr()
            .times(decrements)
            .returning(move |_| {
                value.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        counter
    }

    #[test]
    fn test_quota_key_is_per_utc_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(quota_key(day), "api_usage:daily:2024-03-09");
    }

    #[test]
    fn test_limit_allows_exactly_daily_limit_calls() {
        assert!(!exceeds_limit(1, 50));
        assert!(!exceeds_limit(50, 50));
        assert!(exceeds_limit(51, 50));
    }

    #[tokio::test]
    async fn test_acquire_allows_limit_then_refuses() {
        let value = Arc::new(AtomicI64::new(0));
        let guard = DailyQuotaGuard::new(Arc::new(counting(value.clone(), 1)), 3);

        for _ in 0..3 {
            assert!(guard.acquire().await.is_ok());
        }

        match guard.acquire().await {
            Err(AppError::Config(msg)) => assert_eq!(msg, "Daily API request limit reached"),
            other => panic!("expected quota error, got {:?}", other),
        }

        // The refused call is rolled back
        assert_eq!(value.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_acquire_uses_todays_key() {
        let today = quota_key(Utc::now().date_naive());

        let mut counter = MockUsageCounter::new();
        counter
            .expect_incr()
            .withf(move |key| key == today)
            .times(1)
            .returning(|_| Ok(1));
        counter.expect_decr().never();

        let guard = DailyQuotaGuard::new(Arc::new(counter), 10);
        assert!(guard.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_limit_rejects_everything() {
        let value = Arc::new(AtomicI64::new(0));
        let guard = DailyQuotaGuard::new(Arc::new(counting(value.clone(), 2)), 0);

        assert!(matches!(guard.acquire().await, Err(AppError::Config(_))));
        assert!(matches!(guard.acquire().await, Err(AppError::Config(_))));
        assert_eq!(value.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_counter_failure_propagates() {
        let mut counter = MockUsageCounter::new();
        counter
            .expect_incr()
            .returning(|_| Err(AppError::Internal("redis down".to_string())));
        counter.expect_decr().never();

        let guard = DailyQuotaGuard::new(Arc::new(counter), 10);
        assert!(matches!(guard.acquire().await, Err(AppError::Internal(_))));
    }
}
