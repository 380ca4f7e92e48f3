//! Message and content-block types for the LLM contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role. Tool results travel inside user messages, so only two
/// roles exist at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message (including tool results).
    User,
    /// Assistant message (including tool-use requests).
    Assistant,
}

/// A content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A tool invocation requested by the assistant.
    ToolUse {
        /// Unique call id, echoed back by the tool result.
        id: String,
        /// Tool name.
        name: String,
        /// Structured arguments.
        input: Value,
    },
    /// The result of a tool invocation, sent back as user content.
    ToolResult {
        /// Id of the `ToolUse` block this responds to.
        tool_use_id: String,
        /// Textual result (or error text).
        content: String,
        /// Whether the result is an error.
        #[serde(default)]
        is_error: bool,
    },
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent the message.
    pub role: MessageRole,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user text message.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: vec![ContentBlock::Text { text: text.into() }],
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant text message.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message from response content blocks.
    #[must_use]
    pub fn assistant_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a user message carrying tool results.
    #[must_use]
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::User,
            content: results,
            timestamp: Utc::now(),
        }
    }

    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tool-use blocks in this message.
    #[must_use]
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        self.content
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
            .collect()
    }
}

/// Tool definition handed to the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmToolDefinition {
    /// Tool name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Input JSON Schema.
    pub input_schema: Value,
}

/// A request to the LLM.
#[derive(Debug, Clone)]
pub struct MessageRequest {
    /// Conversation messages, oldest first.
    pub messages: Vec<Message>,
    /// Optional system preamble.
    pub system: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Tools the model may call.
    pub tools: Vec<LlmToolDefinition>,
}

impl MessageRequest {
    /// A plain request with no system prompt or tools.
    #[must_use]
    pub fn new(messages: Vec<Message>, max_tokens: u32) -> Self {
        Self {
            messages,
            system: None,
            max_tokens,
            tools: Vec::new(),
        }
    }

    /// Single-prompt convenience constructor.
    pub fn from_prompt(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self::new(vec![Message::user_text(prompt)], max_tokens)
    }

    /// Attach a system preamble.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach tool definitions.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<LlmToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response.
    EndTurn,
    /// Hit the max-token limit.
    MaxTokens,
    /// The model requested tool use.
    ToolUse,
    /// A stop sequence was hit.
    StopSequence,
}

/// Token usage reported per call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}

impl Usage {
    /// Total tokens.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Response from the LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated content blocks.
    pub content: Vec<ContentBlock>,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// Token usage for this call.
    pub usage: Usage,
}

impl LlmResponse {
    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tool-use blocks in the response.
    #[must_use]
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        self.content
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
            .collect()
    }

    /// Whether the model asked for tool use.
    #[must_use]
    pub fn has_tool_use(&self) -> bool {
        self.stop_reason == StopReason::ToolUse || !self.tool_uses().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_joins_blocks() {
        let message = Message {
            role: MessageRole::Assistant,
            content: vec![
                ContentBlock::Text {
                    text: "one".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "lookup".to_string(),
                    input: serde_json::json!({}),
                },
                ContentBlock::Text {
                    text: "two".to_string(),
                },
            ],
            timestamp: Utc::now(),
        };
        assert_eq!(message.text(), "one\ntwo");
        assert_eq!(message.tool_uses().len(), 1);
    }

    #[test]
    fn test_content_block_serde_tags() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "call_1".to_string(),
            content: "42".to_string(),
            is_error: false,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "call_1");

        let back: ContentBlock = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_message_roundtrip() {
        let message = Message::user_text("hello");
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, back);
    }

    #[test]
    fn test_usage_total() {
        let usage = Usage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(usage.total(), 150);
    }
}
