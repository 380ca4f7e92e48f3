//! State provider trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;

/// Pluggable persistence backend for state snapshots.
///
/// Providers store JSON values under string keys. `load` of a missing
/// key is `Ok(None)`, not an error; `delete` of a missing key is a
/// no-op. Corrupt stored data is an error on load — the caller decides
/// whether to fall back to fresh state.
#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Save state data under a key.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the write fails; partial writes must
    /// never be visible to readers.
    async fn save(&self, key: &str, data: &Value) -> StorageResult<()>;

    /// Load state data by key. `Ok(None)` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Corrupt`] when stored data cannot
    /// be decoded, and an I/O error when the read fails.
    async fn load(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Whether state exists for a key.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend cannot be queried.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete state by key. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the delete fails for a reason other
    /// than absence.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all keys, optionally filtered by prefix, alphabetically
    /// sorted.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend cannot be enumerated.
    async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>>;
}
