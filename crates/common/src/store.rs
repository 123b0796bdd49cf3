//! Durable key-value store shared by the wallet, session and profile layers.
//!
//! Every key has exactly one writer. Values are strings; structured records
//! are stored as JSON through [`load_json`] / [`save_json`]. The store is an
//! advisory cache: callers rebuild authoritative state from live providers.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// Last real wallet connection (`ConnectionMarker` JSON). Written by the connection manager.
pub const WALLET_CONNECTION_KEY: &str = "wallet_connection";

/// Demo mode flag (`"true"`). Written by the connection manager.
pub const DEMO_MODE_KEY: &str = "demo_mode";

/// Active session (`SessionRecord` JSON). Written by the session tracker.
pub const SESSION_KEY: &str = "quai_session";

/// Dashboard user (`UserProfile` JSON). Written by the profile gate.
pub const PROFILE_KEY: &str = "quai-analytics-user";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and deserialize a JSON value.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value.
pub async fn save_json<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Redis-backed store. Keys are namespaced with a configurable prefix.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut redis = self.redis.clone();
        let value: Option<String> = redis.get(self.key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        redis.set::<_, _, ()>(self.key(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        redis.del::<_, ()>(self.key(key)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionMarker;
    use crate::types::WalletKind;

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(DEMO_MODE_KEY).await.unwrap(), None);

        store.set(DEMO_MODE_KEY, "true").await.unwrap();
        assert_eq!(
            store.get(DEMO_MODE_KEY).await.unwrap().as_deref(),
            Some("true")
        );

        store.remove(DEMO_MODE_KEY).await.unwrap();
        store.remove(DEMO_MODE_KEY).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        let marker = ConnectionMarker {
            wallet_type: WalletKind::MetaMask,
            address: "0xabc".to_string(),
        };
        save_json(&store, WALLET_CONNECTION_KEY, &marker)
            .await
            .unwrap();

        let loaded: Option<ConnectionMarker> = load_json(&store, WALLET_CONNECTION_KEY)
            .await
            .unwrap();
        assert_eq!(loaded, Some(marker));
    }

    #[tokio::test]
    async fn test_load_json_rejects_corrupt_value() {
        let store = MemoryStore::new();
        store.set(SESSION_KEY, "{not json").await.unwrap();

        let result: Result<Option<ConnectionMarker>, _> = load_json(&store, SESSION_KEY).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
