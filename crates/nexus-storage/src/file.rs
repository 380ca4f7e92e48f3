//! File-based state provider.
//!
//! One JSON file per key under a base directory. Key sanitization maps
//! `:` to `__` and `/` to `_`; writes go to a `.json.tmp` sibling and
//! are renamed into place so readers never observe a partial file.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{StorageError, StorageResult};
use crate::provider::StateProvider;

/// JSON-file-per-key state provider.
#[derive(Debug, Clone)]
pub struct FileStateProvider {
    base_dir: PathBuf,
}

impl FileStateProvider {
    /// Create a provider rooted at `base_dir`.
    ///
    /// A leading `~` expands to the user's home directory. The
    /// directory is created if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let base_dir = expand_tilde(base_dir.as_ref());
        std::fs::create_dir_all(&base_dir)?;
        info!(base_dir = %base_dir.display(), "File state provider initialized");
        Ok(Self { base_dir })
    }

    /// The directory state files live in.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The file path a key maps to. Exposed for tests and debugging.
    #[must_use]
    pub fn file_path(&self, key: &str) -> PathBuf {
        let safe_name = key.replace(':', "__").replace('/', "_");
        self.base_dir.join(format!("{safe_name}.json"))
    }

    fn key_from_path(path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        Some(stem.replace("__", ":"))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    if let Some(rest) = text.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

#[async_trait]
impl StateProvider for FileStateProvider {
    async fn save(&self, key: &str, data: &Value) -> StorageResult<()> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("json.tmp");

        let serialized = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        // Atomic write: temp file first, then rename into place
        let write_result = tokio::fs::write(&tmp_path, serialized.as_bytes()).await;
        if let Err(e) = write_result {
            error!(key, error = %e, "Failed to write state file");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            error!(key, error = %e, "Failed to rename state file into place");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(key, path = %path.display(), "Saved state file");
        Ok(())
    }

    async fn load(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.file_path(key);

        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "State file not found");
                return Ok(None);
            },
            Err(e) => {
                error!(key, error = %e, "Failed to read state file");
                return Err(e.into());
            },
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Loaded state file");
                Ok(Some(value))
            },
            Err(e) => {
                error!(key, path = %path.display(), error = %e, "Corrupt JSON in state file");
                Err(StorageError::Corrupt(format!("{key}: {e}")))
            },
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.file_path(key).exists())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.file_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Deleted state file");
                Ok(())
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "Delete of missing state file (no-op)");
                Ok(())
            },
            Err(e) => {
                error!(key, error = %e, "Failed to delete state file");
                Err(e.into())
            },
        }
    }

    async fn list_keys(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            // .json files only, and never in-flight .tmp files
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(key) = Self::key_from_path(&path) {
                if prefix.map_or(true, |p| key.starts_with(p)) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        debug!(prefix = ?prefix, count = keys.len(), "Listed state keys");
        Ok(keys)
    }
}
