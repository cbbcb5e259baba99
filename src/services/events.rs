use redis::{AsyncCommands, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::{error::AppResult, models::RatingEvent};

/// Channel to the asynchronous model-retraining consumer
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RatingEventPublisher: Send + Sync {
    async fn publish(&self, event: &RatingEvent) -> AppResult<()>;
}

/// Publishes rating events on a Redis pub/sub channel
#[derive(Clone)]
pub struct RedisRatingPublisher {
    redis_client: Client,
    channel: String,
}

impl RedisRatingPublisher {
    pub fn new(redis_client: Client, channel: String) -> Self {
        Self {
            redis_client,
            channel,
        }
    }
}

#[async_trait::async_trait]
impl RatingEventPublisher for RedisRatingPublisher {
    async fn publish(&self, event: &RatingEvent) -> AppResult<()> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let receivers: i64 = conn.publish(&self.channel, payload).await?;

        tracing::debug!(
            channel = %self.channel,
            receivers,
            user_id = event.user_id,
            recipe_id = event.recipe_id,
            "Published rating event"
        );

        Ok(())
    }
}

/// Fire-and-forget wrapper around a [`RatingEventPublisher`]
///
/// Each event is published on a detached task. Failures are logged and
/// dropped; they never reach the caller that stored the rating.
#[derive(Clone)]
pub struct EventDispatcher {
    publisher: Arc<dyn RatingEventPublisher>,
}

impl EventDispatcher {
    pub fn new(publisher: Arc<dyn RatingEventPublisher>) -> Self {
        Self { publisher }
    }

    /// Spawns the publish. Call only after the rating has been persisted.
    pub fn dispatch(&self, event: RatingEvent) -> JoinHandle<()> {
        let publisher = self.publisher.clone();

        tokio::spawn(async move {
            if let Err(e) = publisher.publish(&event).await {
                tracing::warn!(
                    error = %e,
                    user_id = event.user_id,
                    recipe_id = event.recipe_id,
                    "Failed to publish rating event"
                );
            }
        })
    }
}
