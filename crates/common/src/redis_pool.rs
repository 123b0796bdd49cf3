use std::sync::Arc;

use redis::Client;
use redis::aio::ConnectionManager;

use crate::store::{KeyValueStore, MemoryStore, RedisStore};

/// Create a Redis connection manager for async operations.
pub async fn create_redis_pool(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}

/// Build the durable store: Redis when a URL is configured, memory otherwise.
pub async fn create_store(
    redis_url: Option<&str>,
    prefix: &str,
) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match redis_url {
        Some(url) => {
            let manager = create_redis_pool(url).await?;
            Ok(Arc::new(RedisStore::new(manager, prefix)))
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory store (state is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
