//! MCP tool provider: aggregates tools from the fleet and routes calls.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use nexus_mcp::ConnectionManager;

use crate::error::{ToolError, ToolResult};
use crate::provider::{ToolProvider, ToolSpec};

/// Tool provider backed by the MCP connection manager.
///
/// Aggregates tools from every client, deduplicating by name — the
/// first server to claim a name wins, duplicates are logged and
/// skipped. A private routing map records which server owns each tool;
/// execution forwards to that server's client.
pub struct McpToolProvider {
    manager: Arc<ConnectionManager>,
    /// `tool_name -> server_name`, rebuilt on every definition listing.
    routes: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for McpToolProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolProvider").finish_non_exhaustive()
    }
}

impl McpToolProvider {
    /// Create a provider over the fleet.
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self {
            manager,
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Names of all servers currently in the fleet.
    pub async fn server_names(&self) -> Vec<String> {
        self.manager.clients().await.into_keys().collect()
    }
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    fn provider_name(&self) -> &str {
        "mcp"
    }

    async fn tool_definitions(&self) -> Vec<ToolSpec> {
        let clients = self.manager.clients().await;

        // List concurrently across the fleet; a failing client simply
        // contributes nothing.
        let listings = futures::future::join_all(clients.iter().map(|(name, client)| {
            let name = name.clone();
            let client = client.clone();
            async move { (name, client.list_tools().await) }
        }))
        .await;

        let mut specs: Vec<ToolSpec> = Vec::new();
        let mut routes: HashMap<String, String> = HashMap::new();

        for (server_name, tools) in listings {
            debug!(server = %server_name, count = tools.len(), "Listed tools");
            for tool in tools {
                if let Some(owner) = routes.get(&tool.name) {
                    warn!(
                        tool = %tool.name,
                        server = %server_name,
                        owner = %owner,
                        "Duplicate tool name, skipping"
                    );
                    continue;
                }
                routes.insert(tool.name.clone(), server_name.clone());
                specs.push(ToolSpec {
                    name: tool.name,
                    description: tool.description,
                    input_schema: tool.input_schema,
                });
            }
        }

        info!(
            tool_count = specs.len(),
            server_count = clients.len(),
            "Aggregated MCP tools"
        );
        *self.routes.write().await = routes;
        specs
    }

    async fn execute(&self, tool_name: &str, arguments: Value) -> ToolResult<String> {
        let server_name = {
            let routes = self.routes.read().await;
            routes.get(tool_name).cloned()
        };

        let Some(server_name) = server_name else {
            return Err(ToolError::NotFound {
                name: tool_name.to_string(),
            });
        };

        let Some(client) = self.manager.client(&server_name).await else {
            return Err(ToolError::ExecutionFailed {
                name: tool_name.to_string(),
                reason: format!("server {server_name} no longer in fleet"),
            });
        };

        debug!(tool = tool_name, server = %server_name, "Executing MCP tool");

        let Some(outcome) = client.call_tool(tool_name, arguments).await else {
            return Err(ToolError::ExecutionFailed {
                name: tool_name.to_string(),
                reason: format!("call to {server_name} failed or server disconnected"),
            });
        };

        if outcome.is_error {
            return Err(ToolError::ExecutionFailed {
                name: tool_name.to_string(),
                reason: outcome.joined_text(),
            });
        }

        // JSON-array rendering keeps multi-block results unambiguous
        serde_json::to_string(&outcome.texts).map_err(|e| ToolError::ExecutionFailed {
            name: tool_name.to_string(),
            reason: format!("result serialization failed: {e}"),
        })
    }
}
