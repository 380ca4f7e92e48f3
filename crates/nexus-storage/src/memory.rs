//! In-memory state provider.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::error::StorageResult;
use crate::provider::StateProvider;

/// Dictionary-backed state provider for tests and development.
///
/// Values are cloned on save and on load, so callers can never mutate
/// stored state through a reference they hold. Everything is lost on
/// process exit.
#[derive(Debug, Default)]
pub struct MemoryStateProvider {
    data: Mutex<HashMap<String, Value>>,
}

impl MemoryStateProvider {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.lock().expect("lock poisoned").len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all stored state. Test-cleanup helper.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear_all(&self) {
        let mut data = self.data.lock().expect("lock poisoned");
        let count = data.len();
        data.clear();
        debug!(removed = count, "Cleared all in-memory state");
    }
}

#[async_trait]
impl StateProvider for MemoryStateProvider {
    async fn save(&self, key: &str, data: &Value) -> StorageResult<()> {
        self.data
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), data.clone());
        debug!(key, "Saved state");
        Ok(())
    }

    async fn load(&self, key: &str) -> StorageResult<Option<Value>> {
        let value = self.data.lock().expect("lock poisoned").get(key).cloned();
        debug!(key, found = value.is_some(), "Loaded state");
        Ok(value)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().expect("lock poisoned").contains_key(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.data.lock().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let data = self.data.lock().expect("lock poisoned");
        let mut keys: Vec<String> = match prefix {
            Some(p) => data.keys().filter(|k| k.starts_with(p)).cloned().collect(),
            None => data.keys().cloned().collect(),
        };
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let provider = MemoryStateProvider::new();
        let data = json!({"session_id": "123", "messages": []});

        provider.save("session:123", &data).await.unwrap();
        let loaded = provider.load("session:123").await.unwrap();
        assert_eq!(loaded, Some(data));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let provider = MemoryStateProvider::new();
        assert_eq!(provider.load("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stored_value_isolated_from_caller() {
        let provider = MemoryStateProvider::new();
        let mut data = json!({"count": 1});
        provider.save("key", &data).await.unwrap();

        // Mutate the caller's copy after saving
        data["count"] = json!(2);

        let loaded = provider.load("key").await.unwrap().unwrap();
        assert_eq!(loaded["count"], 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let provider = MemoryStateProvider::new();
        provider.save("key", &json!(1)).await.unwrap();
        provider.delete("key").await.unwrap();
        provider.delete("key").await.unwrap();
        assert!(!provider.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_keys_with_prefix() {
        let provider = MemoryStateProvider::new();
        provider.save("session:b", &json!(1)).await.unwrap();
        provider.save("session:a", &json!(1)).await.unwrap();
        provider.save("config:x", &json!(1)).await.unwrap();

        let keys = provider.list_keys(Some("session:")).await.unwrap();
        assert_eq!(keys, vec!["session:a", "session:b"]);

        let all = provider.list_keys(None).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
