//! Repository for fetching artifacts from the MCP fleet.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nexus_core::{ArtifactCollection, ArtifactRecord};
use nexus_mcp::{ConnectionManager, NexusClient, PromptDefinition};
use tracing::{debug, warn};

use crate::types::{ArtifactSource, Prompt, Resource, Tool};

/// Retry policy for artifact listings.
///
/// Freshly connected serverless upstreams occasionally answer a listing
/// with an empty result before they are fully warm; retrying a couple of
/// times with a small delay papers over that window.
#[derive(Debug, Clone)]
pub struct FetchRetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for FetchRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Fetches tools, prompts, and resources from connected clients.
pub struct ArtifactRepository {
    manager: Arc<ConnectionManager>,
    retry_policy: FetchRetryPolicy,
}

impl std::fmt::Debug for ArtifactRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactRepository")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl ArtifactRepository {
    /// Create a repository over the fleet.
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            retry_policy: FetchRetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: FetchRetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Connected clients only.
    async fn connected_clients(&self) -> HashMap<String, NexusClient> {
        self.manager
            .clients()
            .await
            .into_iter()
            .filter(|(_, client)| client.is_connected())
            .collect()
    }

    /// Resource URIs grouped by server.
    pub async fn resources_by_server(&self) -> HashMap<String, Vec<String>> {
        let mut result = HashMap::new();
        for (server_name, client) in self.connected_clients().await {
            debug!(server = %server_name, "Listing resources");
            let uris = client
                .list_resources()
                .await
                .into_iter()
                .map(|r| r.uri)
                .collect();
            result.insert(server_name, uris);
        }
        result
    }

    /// Flattened list of all resource URIs.
    pub async fn resource_list(&self) -> Vec<String> {
        self.resources_by_server()
            .await
            .into_values()
            .flatten()
            .collect()
    }

    /// Resources from all connected servers, as domain values.
    pub async fn resources(&self) -> Vec<Resource> {
        let mut resources = Vec::new();
        for (server_name, client) in self.connected_clients().await {
            for def in client.list_resources().await {
                resources.push(Resource {
                    uri: def.uri,
                    name: def.name,
                    description: def.description,
                    mime_type: def.mime_type,
                    source_id: server_name.clone(),
                });
            }
        }
        resources
    }

    /// Prompts from all connected servers, as domain values.
    pub async fn prompts(&self) -> Vec<Prompt> {
        let mut prompts = Vec::new();
        for (server_name, client) in self.connected_clients().await {
            for def in client.list_prompts().await {
                prompts.push(Prompt {
                    name: def.name,
                    description: def.description,
                    source_id: server_name.clone(),
                    arguments: def.arguments,
                });
            }
        }
        prompts
    }

    /// Tools from all connected servers, as domain values.
    pub async fn tools(&self) -> Vec<Tool> {
        let mut tools = Vec::new();
        for (server_name, client) in self.connected_clients().await {
            for def in client.list_tools().await {
                tools.push(Tool {
                    name: def.name,
                    description: def.description,
                    source: ArtifactSource::Mcp,
                    source_id: server_name.clone(),
                    enabled: true,
                    input_schema: Some(def.input_schema),
                });
            }
        }
        tools
    }

    /// Names of all prompt commands across servers.
    pub async fn command_names(&self) -> Vec<String> {
        self.prompts().await.into_iter().map(|p| p.name).collect()
    }

    /// Locate a prompt across all servers. First match wins.
    pub async fn find_prompt(&self, prompt_name: &str) -> Option<(PromptDefinition, String)> {
        for (server_name, client) in self.connected_clients().await {
            for prompt in client.list_prompts().await {
                if prompt.name == prompt_name {
                    debug!(prompt = prompt_name, server = %server_name, "Found prompt");
                    return Some((prompt, server_name));
                }
            }
        }
        warn!(prompt = prompt_name, "Prompt not found in any MCP server");
        None
    }

    /// Fetch all artifact categories for one server.
    ///
    /// The three listings run under a single deadline when `timeout` is
    /// set; on timeout the collection fetched so far is discarded and an
    /// empty collection is returned rather than an error. Unknown and
    /// disconnected servers also yield an empty collection.
    pub async fn server_artifacts(
        &self,
        server_name: &str,
        retry_on_empty: bool,
        timeout: Option<Duration>,
    ) -> ArtifactCollection {
        let Some(client) = self.manager.client(server_name).await else {
            warn!(server = %server_name, "Server not found when fetching artifacts");
            return ArtifactCollection::new();
        };

        if !client.is_connected() {
            debug!(server = %server_name, "Server not connected, skipping artifact fetch");
            return ArtifactCollection::new();
        }

        let fetch = self.fetch_collection(&client, server_name, retry_on_empty);

        match timeout {
            Some(deadline) => match tokio::time::timeout(deadline, fetch).await {
                Ok(collection) => collection,
                Err(_) => {
                    warn!(server = %server_name, "Timeout fetching artifacts");
                    ArtifactCollection::new()
                },
            },
            None => fetch.await,
        }
    }

    /// Fetch artifacts for every configured server.
    ///
    /// Servers are fetched sequentially; on aggregate timeout every
    /// server maps to an empty collection.
    pub async fn all_servers_artifacts(
        &self,
        timeout: Option<Duration>,
    ) -> HashMap<String, ArtifactCollection> {
        let server_names: Vec<String> = self.manager.clients().await.into_keys().collect();

        let fetch_all = async {
            let mut results = HashMap::new();
            for name in &server_names {
                let artifacts = self.server_artifacts(name, false, None).await;
                results.insert(name.clone(), artifacts);
            }
            results
        };

        match timeout {
            Some(deadline) => match tokio::time::timeout(deadline, fetch_all).await {
                Ok(results) => results,
                Err(_) => {
                    warn!("Timeout fetching artifacts for all servers");
                    server_names
                        .into_iter()
                        .map(|name| (name, ArtifactCollection::new()))
                        .collect()
                },
            },
            None => fetch_all.await,
        }
    }

    /// Fetch the three listings for one connected client.
    async fn fetch_collection(
        &self,
        client: &NexusClient,
        server_name: &str,
        retry_on_empty: bool,
    ) -> ArtifactCollection {
        let tools = fetch_with_retry(
            || async {
                client
                    .list_tools()
                    .await
                    .into_iter()
                    .map(|t| ArtifactRecord::new(t.name, t.description))
                    .collect()
            },
            server_name,
            "tools",
            retry_on_empty,
            &self.retry_policy,
        )
        .await;

        let prompts = fetch_with_retry(
            || async {
                client
                    .list_prompts()
                    .await
                    .into_iter()
                    .map(|p| ArtifactRecord::new(p.name, p.description))
                    .collect()
            },
            server_name,
            "prompts",
            retry_on_empty,
            &self.retry_policy,
        )
        .await;

        let resources = fetch_with_retry(
            || async {
                client
                    .list_resources()
                    .await
                    .into_iter()
                    .map(|r| {
                        let description = r.description.or(Some(r.name));
                        ArtifactRecord::new(r.uri, description)
                    })
                    .collect()
            },
            server_name,
            "resources",
            retry_on_empty,
            &self.retry_policy,
        )
        .await;

        debug!(
            server = %server_name,
            tools = tools.len(),
            prompts = prompts.len(),
            resources = resources.len(),
            "Fetched artifacts"
        );

        ArtifactCollection {
            tools,
            prompts,
            resources,
        }
    }
}

/// Run a listing, retrying on empty results when asked.
async fn fetch_with_retry<F, Fut>(
    fetch: F,
    server_name: &str,
    artifact_type: &str,
    retry_on_empty: bool,
    policy: &FetchRetryPolicy,
) -> Vec<ArtifactRecord>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Vec<ArtifactRecord>>,
{
    let attempts = policy.max_retries.saturating_add(1);
    for attempt in 0..attempts {
        let result = fetch().await;
        let last_attempt = attempt.saturating_add(1) == attempts;
        if !result.is_empty() || !retry_on_empty || last_attempt {
            return result;
        }

        debug!(
            server = %server_name,
            artifact_type,
            attempt = attempt.saturating_add(1),
            "Empty listing, retrying"
        );
        tokio::time::sleep(policy.retry_delay).await;
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_events::EventBus;
    use nexus_mcp::McpServersConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn empty_manager() -> Arc<ConnectionManager> {
        Arc::new(ConnectionManager::new(
            McpServersConfig::default(),
            EventBus::new(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_retry_stops_on_data() {
        let calls = AtomicU32::new(0);
        let policy = FetchRetryPolicy::default();

        let result = fetch_with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 1 {
                        Vec::new()
                    } else {
                        vec![ArtifactRecord::new("tool", None)]
                    }
                }
            },
            "docs",
            "tools",
            true,
            &policy,
        )
        .await;

        assert_eq!(result.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_retry_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let policy = FetchRetryPolicy {
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
        };

        let result = fetch_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Vec::new() }
            },
            "docs",
            "tools",
            true,
            &policy,
        )
        .await;

        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_with_retry_no_retry_when_disabled() {
        let calls = AtomicU32::new(0);
        let policy = FetchRetryPolicy::default();

        let result = fetch_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Vec::new() }
            },
            "docs",
            "tools",
            false,
            &policy,
        )
        .await;

        assert!(result.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_server_yields_empty_collection() {
        let repository = ArtifactRepository::new(empty_manager());
        let artifacts = repository.server_artifacts("ghost", false, None).await;
        assert!(artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_empty_fleet_aggregations() {
        let repository = ArtifactRepository::new(empty_manager());
        assert!(repository.resources_by_server().await.is_empty());
        assert!(repository.resource_list().await.is_empty());
        assert!(repository.command_names().await.is_empty());
        assert!(repository.find_prompt("anything").await.is_none());
        assert!(repository.all_servers_artifacts(None).await.is_empty());
    }
}
