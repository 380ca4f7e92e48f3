//! Tool registry: union of providers, routed execution.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ToolError, ToolResult};
use crate::provider::{ToolProvider, ToolSpec};
use crate::state::ToolStateManager;

/// Aggregates tool definitions across providers and routes execution by
/// tool name.
///
/// Routing is learned during definition listing: each emitted name maps
/// to the provider that supplied it (first provider wins on collisions
/// across providers). Execution of a name with no learned route
/// triggers one refresh before failing with `NotFound`.
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
    state: Arc<ToolStateManager>,
    /// `tool_name -> provider index`, rebuilt on every listing.
    routes: RwLock<HashMap<String, usize>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("provider_count", &self.providers.len())
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(state: Arc<ToolStateManager>) -> Self {
        Self {
            providers: Vec::new(),
            state,
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a provider. Registration order decides who wins name
    /// collisions across providers.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        info!(provider = provider.provider_name(), "Registered tool provider");
        self.providers.push(provider);
        self
    }

    /// The tool state manager gating emitted definitions.
    #[must_use]
    pub fn state(&self) -> &ToolStateManager {
        &self.state
    }

    /// Aggregate definitions across all providers, filtered by the
    /// disabled-tool set.
    pub async fn tool_definitions(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = Vec::new();
        let mut routes: HashMap<String, usize> = HashMap::new();

        for (index, provider) in self.providers.iter().enumerate() {
            for spec in provider.tool_definitions().await {
                if let Some(existing) = routes.get(&spec.name) {
                    warn!(
                        tool = %spec.name,
                        provider = provider.provider_name(),
                        owner = self.providers[*existing].provider_name(),
                        "Duplicate tool name across providers, skipping"
                    );
                    continue;
                }
                routes.insert(spec.name.clone(), index);
                specs.push(spec);
            }
        }

        *self.routes.write().await = routes;

        let before = specs.len();
        specs.retain(|spec| self.state.is_enabled(&spec.name));
        if specs.len() < before {
            debug!(
                filtered = before.saturating_sub(specs.len()),
                "Filtered disabled tools from definitions"
            );
        }

        specs
    }

    /// Names of all currently emitted tools.
    pub async fn tool_names(&self) -> Vec<String> {
        self.tool_definitions()
            .await
            .into_iter()
            .map(|spec| spec.name)
            .collect()
    }

    /// Execute a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] when no provider routes the name
    /// even after a refresh; execution failures propagate from the
    /// owning provider.
    pub async fn execute(&self, tool_name: &str, arguments: Value) -> ToolResult<String> {
        let route = { self.routes.read().await.get(tool_name).copied() };

        let route = match route {
            Some(index) => Some(index),
            None => {
                // The LLM may act on definitions from a previous listing;
                // refresh once before giving up.
                let _ = self.tool_definitions().await;
                self.routes.read().await.get(tool_name).copied()
            },
        };

        let Some(index) = route else {
            return Err(ToolError::NotFound {
                name: tool_name.to_string(),
            });
        };

        let provider = &self.providers[index];
        debug!(
            tool = tool_name,
            provider = provider.provider_name(),
            "Dispatching tool"
        );
        provider.execute(tool_name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedProvider {
        name: &'static str,
        tools: Vec<&'static str>,
    }

    #[async_trait]
    impl ToolProvider for FixedProvider {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn tool_definitions(&self) -> Vec<ToolSpec> {
            self.tools
                .iter()
                .map(|t| ToolSpec {
                    name: (*t).to_string(),
                    description: None,
                    input_schema: json!({"type": "object"}),
                })
                .collect()
        }

        async fn execute(&self, tool_name: &str, _arguments: Value) -> ToolResult<String> {
            if self.tools.contains(&tool_name) {
                Ok(format!("{}:{tool_name}", self.name))
            } else {
                Err(ToolError::NotFound {
                    name: tool_name.to_string(),
                })
            }
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(ToolStateManager::new()))
            .with_provider(Arc::new(FixedProvider {
                name: "alpha",
                tools: vec!["lookup", "shared"],
            }))
            .with_provider(Arc::new(FixedProvider {
                name: "beta",
                tools: vec!["compute", "shared"],
            }))
    }

    #[tokio::test]
    async fn test_aggregation_dedups_across_providers() {
        let registry = registry();
        let mut names = registry.tool_names().await;
        names.sort();
        assert_eq!(names, vec!["compute", "lookup", "shared"]);
    }

    #[tokio::test]
    async fn test_collision_routes_to_first_provider() {
        let registry = registry();
        let result = registry.execute("shared", json!({})).await.unwrap();
        assert_eq!(result, "alpha:shared");
    }

    #[tokio::test]
    async fn test_execute_routes_without_prior_listing() {
        // No explicit tool_definitions() call: execute must refresh
        // routes itself.
        let registry = registry();
        let result = registry.execute("compute", json!({})).await.unwrap();
        assert_eq!(result, "beta:compute");
    }

    #[tokio::test]
    async fn test_unknown_tool_not_found() {
        let registry = registry();
        let result = registry.execute("ghost", json!({})).await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_disabled_tool_filtered_but_executable() {
        let registry = registry();
        registry.state().disable_tool("lookup");

        let names = registry.tool_names().await;
        assert!(!names.contains(&"lookup".to_string()));

        // Execution is deliberately not gated
        let result = registry.execute("lookup", json!({})).await.unwrap();
        assert_eq!(result, "alpha:lookup");
    }
}
