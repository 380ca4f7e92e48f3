//! High-level facade over the artifact repository and cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use nexus_core::ArtifactCollection;
use nexus_events::{EventBus, EventMetadata, NexusEvent};
use nexus_mcp::{ConnectionManager, PromptDefinition};
use tracing::{debug, info};

use crate::cache::ArtifactCache;
use crate::repository::ArtifactRepository;
use crate::types::{Prompt, Resource, Tool};

/// Facade coordinating artifact fetches, caching, and change events.
///
/// Holds a read-only view of the fleet through the repository; all
/// cache mutation is confined here. Every refresh publishes an
/// `ArtifactsFetched` event carrying the change-detection verdict.
pub struct ArtifactManager {
    repository: ArtifactRepository,
    cache: ArtifactCache,
    event_bus: EventBus,
}

impl std::fmt::Debug for ArtifactManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactManager")
            .field("cached_servers", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ArtifactManager {
    /// Create a manager over the fleet.
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>, event_bus: EventBus) -> Self {
        Self {
            repository: ArtifactRepository::new(manager),
            cache: ArtifactCache::new(),
            event_bus,
        }
    }

    /// The underlying repository.
    #[must_use]
    pub fn repository(&self) -> &ArtifactRepository {
        &self.repository
    }

    // ------------------------------------------------------------------
    // Aggregated views
    // ------------------------------------------------------------------

    /// Resource URIs grouped by server.
    pub async fn resources_by_server(&self) -> HashMap<String, Vec<String>> {
        let resources = self.repository.resources_by_server().await;
        info!(
            server_count = resources.len(),
            resource_count = resources.values().map(Vec::len).sum::<usize>(),
            "Retrieved resources"
        );
        resources
    }

    /// Flattened list of all resource URIs.
    pub async fn resource_list(&self) -> Vec<String> {
        self.repository.resource_list().await
    }

    /// Resources from all connected servers.
    pub async fn resources(&self) -> Vec<Resource> {
        self.repository.resources().await
    }

    /// Prompts from all connected servers.
    pub async fn prompts(&self) -> Vec<Prompt> {
        self.repository.prompts().await
    }

    /// Tools from all connected servers.
    pub async fn tools(&self) -> Vec<Tool> {
        self.repository.tools().await
    }

    /// Names of all prompt commands.
    pub async fn command_names(&self) -> Vec<String> {
        self.repository.command_names().await
    }

    /// Locate a prompt across all servers. First match wins.
    pub async fn find_prompt(&self, prompt_name: &str) -> Option<(PromptDefinition, String)> {
        self.repository.find_prompt(prompt_name).await
    }

    // ------------------------------------------------------------------
    // Cache access
    // ------------------------------------------------------------------

    /// Cached artifacts for a server.
    #[must_use]
    pub fn cached_artifacts(&self, server_name: &str) -> Option<ArtifactCollection> {
        self.cache.get(server_name)
    }

    /// Whether artifacts differ from the cached value.
    #[must_use]
    pub fn have_artifacts_changed(
        &self,
        server_name: &str,
        artifacts: &ArtifactCollection,
    ) -> bool {
        self.cache.has_changed(server_name, artifacts)
    }

    /// Clear the cache for one server or all servers.
    pub fn clear_artifacts_cache(&self, server_name: Option<&str>) {
        self.cache.clear(server_name);
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Fetch artifacts for one server, cache them, and publish the
    /// `ArtifactsFetched` event with the change verdict.
    pub async fn refresh_server_artifacts(
        &self,
        server_name: &str,
        retry_on_empty: bool,
        timeout: Option<Duration>,
    ) -> ArtifactCollection {
        let artifacts = self
            .repository
            .server_artifacts(server_name, retry_on_empty, timeout)
            .await;

        let changed = self.cache.has_changed(server_name, &artifacts);
        self.cache.set(server_name, artifacts.clone());

        debug!(server = %server_name, changed, "Artifacts refreshed");
        self.event_bus.publish(NexusEvent::ArtifactsFetched {
            metadata: EventMetadata::new("artifact_manager"),
            server_name: server_name.to_string(),
            artifacts: artifacts.clone(),
            changed,
        });

        artifacts
    }

    /// Fetch artifacts for all servers under an aggregate deadline.
    pub async fn all_servers_artifacts(
        &self,
        timeout: Option<Duration>,
    ) -> HashMap<String, ArtifactCollection> {
        self.repository.all_servers_artifacts(timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_mcp::McpServersConfig;

    fn make_manager() -> (ArtifactManager, EventBus) {
        let bus = EventBus::new();
        let fleet = Arc::new(ConnectionManager::new(
            McpServersConfig::default(),
            bus.clone(),
        ));
        (ArtifactManager::new(fleet, bus.clone()), bus)
    }

    #[tokio::test]
    async fn test_refresh_publishes_event_with_change_verdict() {
        let (manager, bus) = make_manager();
        let mut receiver = bus.subscribe();

        // First refresh: nothing cached, so even an empty fetch counts
        // as a change.
        manager.refresh_server_artifacts("docs", false, None).await;
        let event = receiver.try_recv().expect("event expected");
        match &*event {
            NexusEvent::ArtifactsFetched {
                server_name,
                changed,
                ..
            } => {
                assert_eq!(server_name, "docs");
                assert!(*changed);
            },
            _ => panic!("unexpected event"),
        }

        // Second refresh returns the same (empty) collection: unchanged.
        manager.refresh_server_artifacts("docs", false, None).await;
        let event = receiver.try_recv().expect("event expected");
        match &*event {
            NexusEvent::ArtifactsFetched { changed, .. } => assert!(!*changed),
            _ => panic!("unexpected event"),
        }
    }

    #[tokio::test]
    async fn test_cache_roundtrip_through_manager() {
        let (manager, _bus) = make_manager();
        assert!(manager.cached_artifacts("docs").is_none());

        manager.refresh_server_artifacts("docs", false, None).await;
        assert!(manager.cached_artifacts("docs").is_some());

        manager.clear_artifacts_cache(Some("docs"));
        assert!(manager.cached_artifacts("docs").is_none());
    }
}
