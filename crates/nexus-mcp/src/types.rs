//! Domain types for tools, prompts, and resources surfaced by MCP servers.

use rmcp::model::{self as rmcp_model, RawContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Server this tool belongs to.
    pub server: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON Schema for input parameters.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create from an rmcp `Tool` and server name.
    #[must_use]
    pub fn from_rmcp(tool: &rmcp_model::Tool, server: &str) -> Self {
        Self {
            name: tool.name.to_string(),
            server: server.to_string(),
            description: tool.description.as_deref().map(String::from),
            input_schema: serde_json::to_value(&*tool.input_schema)
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }
}

/// Outcome of calling an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    /// Text content blocks returned by the tool.
    pub texts: Vec<String>,
    /// Whether the server flagged the result as an error.
    pub is_error: bool,
}

impl ToolCallOutcome {
    /// All text content joined with newlines.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.texts.join("\n")
    }
}

impl From<rmcp_model::CallToolResult> for ToolCallOutcome {
    fn from(result: rmcp_model::CallToolResult) -> Self {
        let texts = result
            .content
            .iter()
            .filter_map(|c| match &**c {
                RawContent::Text(text) => Some(text.text.clone()),
                _ => None,
            })
            .collect();

        Self {
            texts,
            is_error: result.is_error.unwrap_or(false),
        }
    }
}

/// Definition of an MCP resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource URI.
    pub uri: String,
    /// Server this resource belongs to.
    pub server: String,
    /// Human-readable name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// MIME type.
    pub mime_type: Option<String>,
}

impl ResourceDefinition {
    /// Create from an rmcp `Resource` and server name.
    #[must_use]
    pub fn from_rmcp(resource: &rmcp_model::Resource, server: &str) -> Self {
        Self {
            uri: resource.uri.clone(),
            server: server.to_string(),
            name: resource.name.clone(),
            description: resource.description.clone(),
            mime_type: resource.mime_type.clone(),
        }
    }
}

/// Decoded payload of a resource read.
///
/// JSON decoding applies if and only if the resource's MIME type is
/// `application/json`; everything else is surfaced as text. Blob
/// resources are not supported and yield `None` at the call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourcePayload {
    /// Structured payload decoded from JSON.
    Json(Value),
    /// Plain text payload.
    Text(String),
}

impl ResourcePayload {
    /// Decode a text payload according to its MIME type.
    ///
    /// Returns `None` for `application/json` payloads that fail to parse;
    /// malformed JSON is logged, never propagated.
    #[must_use]
    pub fn decode(uri: &str, mime_type: Option<&str>, text: &str) -> Option<Self> {
        if mime_type == Some("application/json") {
            match serde_json::from_str(text) {
                Ok(value) => Some(Self::Json(value)),
                Err(e) => {
                    warn!(uri = %uri, error = %e, "Invalid JSON in resource");
                    None
                },
            }
        } else {
            Some(Self::Text(text.to_string()))
        }
    }

    /// Decode an rmcp resource-content item.
    #[must_use]
    pub fn from_rmcp(contents: &rmcp_model::ResourceContents, uri: &str) -> Option<Self> {
        match contents {
            rmcp_model::ResourceContents::TextResourceContents {
                mime_type, text, ..
            } => Self::decode(uri, mime_type.as_deref(), text),
            rmcp_model::ResourceContents::BlobResourceContents { .. } => None,
        }
    }

    /// Render the payload as text for context injection.
    #[must_use]
    pub fn as_context_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            },
        }
    }
}

/// Definition of an MCP prompt (a slash command).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Prompt name.
    pub name: String,
    /// Server this prompt belongs to.
    pub server: String,
    /// Description.
    pub description: Option<String>,
    /// Argument schema.
    pub arguments: Option<Vec<PromptArgument>>,
}

impl PromptDefinition {
    /// Create from an rmcp `Prompt` and server name.
    #[must_use]
    pub fn from_rmcp(prompt: &rmcp_model::Prompt, server: &str) -> Self {
        Self {
            name: prompt.name.clone(),
            server: server.to_string(),
            description: prompt.description.clone(),
            arguments: prompt.arguments.as_ref().map(|args| {
                args.iter()
                    .map(|a| PromptArgument {
                        name: a.name.clone(),
                        description: a.description.clone(),
                        required: a.required.unwrap_or(false),
                    })
                    .collect()
            }),
        }
    }
}

/// Argument for an MCP prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Whether the argument is required.
    #[serde(default)]
    pub required: bool,
}

/// A rendered message from an MCP prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Role of the message sender (`user` or `assistant`).
    pub role: String,
    /// Text content of the message.
    pub content: String,
}

impl PromptMessage {
    /// Convert from an rmcp prompt message.
    #[must_use]
    pub fn from_rmcp(message: &rmcp_model::PromptMessage) -> Self {
        let role = match message.role {
            rmcp_model::PromptMessageRole::User => "user",
            rmcp_model::PromptMessageRole::Assistant => "assistant",
        };
        let content = match &message.content {
            rmcp_model::PromptMessageContent::Text { text } => text.clone(),
            rmcp_model::PromptMessageContent::Image { image } => {
                format!("[image: {}]", image.mime_type)
            },
            rmcp_model::PromptMessageContent::Resource { resource } => resource.get_text(),
            rmcp_model::PromptMessageContent::ResourceLink { link } => {
                format!("[resource: {}]", link.uri)
            },
        };
        Self {
            role: role.to_string(),
            content,
        }
    }
}
