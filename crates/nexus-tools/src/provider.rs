//! Tool provider trait and the provider-facing tool definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolResult;

/// A tool definition as emitted toward the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, unique within the registry's emitted set.
    pub name: String,
    /// Description of what the tool does.
    pub description: Option<String>,
    /// JSON Schema for the tool's input.
    pub input_schema: Value,
}

/// A source of tools: an MCP fleet, local functions, or anything else
/// that can list definitions and execute by name.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider name, for logging and collision reports.
    fn provider_name(&self) -> &str;

    /// Current tool definitions from this provider.
    async fn tool_definitions(&self) -> Vec<ToolSpec>;

    /// Execute a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError::NotFound`] for unknown names and
    /// [`crate::ToolError::ExecutionFailed`] when the underlying call
    /// fails.
    async fn execute(&self, tool_name: &str, arguments: Value) -> ToolResult<String>;
}
