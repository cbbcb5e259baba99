use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::AppResult;
use crate::models::IngredientSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Normalized ingredient set -> provider recipe ids
    IngredientSearch(IngredientSet),
    /// Provider recipe id -> filtered recipe summary
    ProviderRecipe(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::IngredientSearch(set) => write!(f, "ingredients:{}", set),
            CacheKey::ProviderRecipe(id) => write!(f, "provider:recipe:{}", id),
        }
    }
}

/// Opens the Redis client shared by the cache, the quota counter and the
/// rating event publisher. No connection is made until first use.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Client::open(redis_url).map_err(Into::into)
}

/// Raw key/value storage behind [`Cache`]
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl: u64) -> AppResult<()>;
}

/// Redis-backed cache storage
#[derive(Clone)]
pub struct RedisBackend {
    client: Client,
}

impl RedisBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: u64) -> AppResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl).await?;
        Ok(())
    }
}

/// One queued `SET .. EX`
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// JSON-encoded values over a [`CacheBackend`], with writes queued to a
/// background task
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Owner of the background writer; dropping it without calling
/// [`shutdown`](Self::shutdown) abandons queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Stops the writer once everything already queued has reached the
    /// backend.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Stopping cache writer");
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Spawns the writer task on the current runtime. Must be called from
    /// within a tokio context.
    pub fn new(backend: Arc<dyn CacheBackend>) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer_backend = backend.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(writer_backend, write_rx, shutdown_rx).await;
        });

        let cache = Self { backend, write_tx };
        let handle = CacheWriterHandle { shutdown_tx, task };

        (cache, handle)
    }

    /// On shutdown the channel is closed to new writes and everything already
    /// queued is flushed before exiting.
    async fn cache_writer_task(
        backend: Arc<dyn CacheBackend>,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer running");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = backend.set_ex(&msg.key, msg.value, msg.ttl).await {
                        tracing::error!(error = %e, key = %msg.key, "Failed to write cache entry");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;

                    while let Some(msg) = write_rx.recv().await {
                        match backend.set_ex(&msg.key, msg.value, msg.ttl).await {
                            Ok(()) => flushed += 1,
                            Err(e) => tracing::error!(error = %e, "Failed to flush cache write during shutdown"),
                        }
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// A stored value that no longer deserializes is treated as a miss so a schema
    /// change never wedges a key until its TTL runs out.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let cached = self.backend.get(&key.to_string()).await?;

        match cached {
            Some(json) => match serde_json::from_str(&json) {
                Ok(data) => Ok(Some(data)),
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// The value is serialized here and handed to the background writer; this
    /// returns before the write reaches the backend.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Skipping cache write for unserializable value");
                return;
            }
        };

        let queued = self.write_tx.send(CacheWriteMessage {
            key: key.to_string(),
            value,
            ttl,
        });
        if queued.is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}
