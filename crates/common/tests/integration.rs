//! Integration tests for the Redis-backed store.
//!
//! Requires a running Redis with `REDIS_URL` set. Run with:
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p quaiscope-common --test integration -- --ignored --nocapture
//! ```

use quaiscope_common::redis_pool::create_redis_pool;
use quaiscope_common::store::{KeyValueStore, RedisStore, SESSION_KEY, load_json, save_json};
use quaiscope_common::types::{SessionRecord, WalletKind};

async fn store() -> RedisStore {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set");
    let manager = create_redis_pool(&url).await.unwrap();
    RedisStore::new(manager, "quaiscope-test:")
}

#[tokio::test]
#[ignore]
async fn test_redis_store_roundtrip_and_remove() {
    let store = store().await;
    let now = chrono::Utc::now();
    let record = SessionRecord {
        address: "0x00a3e45aa16163F2663015b6695894D918866d19".to_string(),
        provider_kind: WalletKind::Pelagus,
        connected_at: now,
        last_activity_at: now,
    };

    save_json(&store, SESSION_KEY, &record).await.unwrap();
    let loaded: Option<SessionRecord> = load_json(&store, SESSION_KEY).await.unwrap();
    assert_eq!(loaded, Some(record));

    store.remove(SESSION_KEY).await.unwrap();
    assert_eq!(store.get(SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn test_redis_store_prefixes_keys() {
    let store = store().await;
    store.set("demo_mode", "true").await.unwrap();

    let url = std::env::var("REDIS_URL").unwrap();
    let raw = RedisStore::new(create_redis_pool(&url).await.unwrap(), "");
    assert_eq!(
        raw.get("quaiscope-test:demo_mode").await.unwrap().as_deref(),
        Some("true")
    );

    store.remove("demo_mode").await.unwrap();
}
