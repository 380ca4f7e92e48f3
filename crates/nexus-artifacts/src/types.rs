//! Domain models for artifacts from MCP servers and local providers.

use nexus_mcp::PromptArgument;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Surfaced by an MCP server.
    Mcp,
    /// Registered locally in-process.
    Local,
}

/// A tool the agent can execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Unique tool name.
    pub name: String,
    /// Description of what the tool does.
    pub description: Option<String>,
    /// Where the tool comes from.
    pub source: ArtifactSource,
    /// Source identifier (server name, or `local`).
    pub source_id: String,
    /// Whether the tool is currently enabled.
    pub enabled: bool,
    /// JSON Schema for the tool's inputs.
    pub input_schema: Option<Value>,
}

/// A resource (document, file, dataset) referenced with `@` in chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Server providing this resource.
    pub source_id: String,
}

/// A prompt command invoked with `/` in chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt name.
    pub name: String,
    /// Description of the prompt.
    pub description: Option<String>,
    /// Server providing this prompt.
    pub source_id: String,
    /// Argument schema.
    pub arguments: Option<Vec<PromptArgument>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_serializes_source_tag() {
        let tool = Tool {
            name: "read_file".to_string(),
            description: None,
            source: ArtifactSource::Mcp,
            source_id: "filesystem".to_string(),
            enabled: true,
            input_schema: None,
        };
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["source"], "mcp");
    }
}
