// storage/src/file_store.rs
//! File-backed checkpoint store. Each key becomes one JSON document
//! under the store's root directory.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;
use models::errors::BookingResult;
use serde_json::Value;

use crate::kv::KeyValueStore;

#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Opens the store, creating the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> BookingResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(JsonFileStore { root })
    }

    /// Keys may carry namespace separators; everything outside a safe
    /// character set is flattened before the key becomes a file name.
    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", file))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> BookingResult<Option<Value>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Value) -> BookingResult<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec_pretty(&value)?;
        tokio::fs::write(&path, &bytes).await?;
        debug!("checkpointed {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("booking-store-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn should_persist_values_across_reopen() {
        let dir = scratch_dir();
        {
            let store = JsonFileStore::open(&dir).unwrap();
            store
                .set("ledger/appointments", json!({"next_id": 4}))
                .await
                .unwrap();
        }
        let reopened = JsonFileStore::open(&dir).unwrap();
        let value = reopened.get("ledger/appointments").await.unwrap();
        assert_eq!(value, Some(json!({"next_id": 4})));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_return_none_before_first_checkpoint() {
        let dir = scratch_dir();
        let store = JsonFileStore::open(&dir).unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn should_flatten_namespaced_keys_into_file_names() {
        let dir = scratch_dir();
        let store = JsonFileStore::open(&dir).unwrap();
        store.set("a/b c", json!(true)).await.unwrap();
        assert!(dir.join("a_b_c.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
