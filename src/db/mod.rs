pub mod postgres;
pub mod ratings;
pub mod recipes;
pub mod redis;
pub mod vectors;

pub use postgres::create_pool;
pub use ratings::{PgRatingStore, RatingStore};
pub use recipes::{PgRecipeStore, RecipeStore, RelevanceScoring};
pub use redis::create_redis_client;
pub use redis::{Cache, CacheBackend, CacheKey, CacheWriterHandle, RedisBackend};
pub use vectors::{PgVectorStore, RankingQuery, VectorStore};
