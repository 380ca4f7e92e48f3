//! Conversation: the ordered message history behind a session.

use nexus_llm::{ContentBlock, LlmToolDefinition, Message, MessageRequest, MessageRole};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ordered sequence of messages with an optional system preamble.
///
/// Appends observe program order; serialization is a lossless
/// round-trip. A tool-result user message may directly follow an
/// assistant tool-use message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Optional system preamble.
    #[serde(default)]
    pub system: Option<String>,
    /// Messages, oldest first.
    #[serde(default)]
    messages: Vec<Message>,
    /// Whether prompt caching is requested from the provider.
    #[serde(default)]
    pub enable_caching: bool,
}

impl Conversation {
    /// Create a conversation with an optional system preamble.
    #[must_use]
    pub fn new(system: Option<String>, enable_caching: bool) -> Self {
        Self {
            system,
            messages: Vec::new(),
            enable_caching,
        }
    }

    /// Append a user text message.
    pub fn add_user_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user_text(text));
    }

    /// Append an assistant text message.
    pub fn add_assistant_text(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant_text(text));
    }

    /// Append an assistant message built from response content blocks.
    pub fn add_assistant_blocks(&mut self, content: Vec<ContentBlock>) {
        self.messages.push(Message::assistant_blocks(content));
    }

    /// Append a user message carrying tool results.
    pub fn add_tool_results(&mut self, results: Vec<ContentBlock>) {
        self.messages.push(Message::tool_results(results));
    }

    /// Append a plain text message under an explicit role string.
    ///
    /// Unknown roles default to `user`; used when injecting prompt
    /// messages returned by an MCP server.
    pub fn add_message(&mut self, role: &str, text: impl Into<String>) {
        match role {
            "assistant" => self.add_assistant_text(text),
            _ => self.add_user_text(text),
        }
    }

    /// The message sequence, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Rough token estimate (~4 chars per token) across all text.
    #[must_use]
    pub fn token_estimate(&self) -> usize {
        let chars: usize = self
            .messages
            .iter()
            .map(|m| m.text().len())
            .sum::<usize>()
            .saturating_add(self.system.as_deref().map_or(0, str::len));
        chars / 4
    }

    /// Clear the history, preserving the system preamble.
    pub fn clear(&mut self) {
        debug!(removed = self.messages.len(), "Conversation history cleared");
        self.messages.clear();
    }

    /// The latest assistant text, if any.
    #[must_use]
    pub fn last_assistant_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(Message::text)
    }

    /// Build an LLM request from the current history.
    #[must_use]
    pub fn to_request(&self, max_tokens: u32, tools: Vec<LlmToolDefinition>) -> MessageRequest {
        let mut request = MessageRequest::new(self.messages.clone(), max_tokens).with_tools(tools);
        if let Some(system) = &self.system {
            request = request.with_system(system.clone());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_order() {
        let mut conversation = Conversation::new(Some("be helpful".into()), true);
        conversation.add_user_text("hi");
        conversation.add_assistant_text("hello");
        conversation.add_user_text("bye");

        let roles: Vec<MessageRole> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );
    }

    #[test]
    fn test_serde_roundtrip_is_lossless() {
        let mut conversation = Conversation::new(Some("system".into()), true);
        conversation.add_user_text("question");
        conversation.add_assistant_blocks(vec![
            ContentBlock::Text {
                text: "let me check".to_string(),
            },
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "lookup".to_string(),
                input: json!({"q": "x"}),
            },
        ]);
        conversation.add_tool_results(vec![ContentBlock::ToolResult {
            tool_use_id: "call_1".to_string(),
            content: "result".to_string(),
            is_error: false,
        }]);

        let serialized = serde_json::to_string(&conversation).unwrap();
        let restored: Conversation = serde_json::from_str(&serialized).unwrap();
        assert_eq!(conversation, restored);
    }

    #[test]
    fn test_clear_preserves_system() {
        let mut conversation = Conversation::new(Some("system".into()), false);
        conversation.add_user_text("hi");
        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.system.as_deref(), Some("system"));
    }

    #[test]
    fn test_add_message_role_mapping() {
        let mut conversation = Conversation::default();
        conversation.add_message("assistant", "from prompt");
        conversation.add_message("user", "also from prompt");
        conversation.add_message("weird", "defaults to user");

        let roles: Vec<MessageRole> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::Assistant, MessageRole::User, MessageRole::User]
        );
    }

    #[test]
    fn test_to_request_carries_system() {
        let mut conversation = Conversation::new(Some("sys".into()), false);
        conversation.add_user_text("q");
        let request = conversation.to_request(512, Vec::new());
        assert_eq!(request.system.as_deref(), Some("sys"));
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 512);
    }

    #[test]
    fn test_last_assistant_text() {
        let mut conversation = Conversation::default();
        assert!(conversation.last_assistant_text().is_none());
        conversation.add_user_text("q");
        conversation.add_assistant_text("a1");
        conversation.add_user_text("q2");
        conversation.add_assistant_text("a2");
        assert_eq!(conversation.last_assistant_text().unwrap(), "a2");
    }
}
