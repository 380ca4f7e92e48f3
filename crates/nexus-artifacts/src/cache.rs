//! Artifact cache with deep-copy isolation and change detection.

use nexus_core::ArtifactCollection;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Per-server cache of artifact collections.
///
/// Values are cloned both on insert and on read, so callers can never
/// mutate the cached state through a returned collection. Structural
/// inequality against the cached value is what `has_changed` reports.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    inner: RwLock<HashMap<String, ArtifactCollection>>,
}

impl ArtifactCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve cached artifacts for a server.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get(&self, server_name: &str) -> Option<ArtifactCollection> {
        self.inner
            .read()
            .expect("lock poisoned")
            .get(server_name)
            .cloned()
    }

    /// Store artifacts for a server.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set(&self, server_name: impl Into<String>, artifacts: ArtifactCollection) {
        let server_name = server_name.into();
        debug!(server = %server_name, count = artifacts.len(), "Caching artifacts");
        self.inner
            .write()
            .expect("lock poisoned")
            .insert(server_name, artifacts);
    }

    /// Whether the given artifacts differ from the cached value.
    ///
    /// Returns `true` when no value is cached or when the cached value
    /// is structurally unequal to `artifacts`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn has_changed(&self, server_name: &str, artifacts: &ArtifactCollection) -> bool {
        match self.inner.read().expect("lock poisoned").get(server_name) {
            None => true,
            Some(cached) => cached != artifacts,
        }
    }

    /// Clear the cache for one server, or for all servers.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self, server_name: Option<&str>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        match server_name {
            Some(name) => {
                inner.remove(name);
            },
            None => inner.clear(),
        }
    }

    /// Number of servers with cached artifacts.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").len()
    }

    /// Whether the cache is empty.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").is_empty()
    }
}
