// storage/src/kv.rs
//! Checkpoint store contract plus the in-memory engine used by tests
//! and single-process deployments.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use models::errors::BookingResult;
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;

/// Durable key/value backend the booking services checkpoint into.
///
/// Values are JSON documents. A missing key is not an error: services
/// treat it as a cold start and fall back to their seed data.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug + 'static {
    async fn get(&self, key: &str) -> BookingResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> BookingResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: TokioMutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            entries: TokioMutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> BookingResult<Option<Value>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> BookingResult<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn should_round_trip_values() {
        let store = MemoryStore::new();
        store
            .set("providers", json!({"md-cortes": {"price": 6500}}))
            .await
            .unwrap();
        let value = store.get("providers").await.unwrap();
        assert_eq!(value, Some(json!({"md-cortes": {"price": 6500}})));
    }

    #[tokio::test]
    async fn should_return_none_for_missing_keys() {
        let store = MemoryStore::new();
        assert_eq!(store.get("never-written").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_overwrite_existing_keys() {
        let store = MemoryStore::new();
        store.set("counter", json!(1)).await.unwrap();
        store.set("counter", json!(2)).await.unwrap();
        assert_eq!(store.get("counter").await.unwrap(), Some(json!(2)));
    }
}
