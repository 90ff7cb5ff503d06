//! In-process implementation of KeyValueStore.

use async_trait::async_trait;
use classkit_core::Result;
use classkit_core::ports::KeyValueStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Device state kept in memory. Used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_or_insert(&self, key: &str, value: &str) -> Result<String> {
        let mut values = self.values.write().await;
        Ok(values
            .entry(key.to_string())
            .or_insert_with(|| value.to_string())
            .clone())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_insert_keeps_first_value() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get_or_insert("device_id", "first").await.unwrap(), "first");
        assert_eq!(store.get_or_insert("device_id", "second").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_ok() {
        let store = MemoryKeyValueStore::new();
        store.remove("license_info").await.unwrap();
        assert!(store.get("license_info").await.unwrap().is_none());
    }
}
