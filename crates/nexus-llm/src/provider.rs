//! LLM provider trait.
//!
//! Defines the interface every language-model back end must implement.
//! The runtime never talks HTTP itself; it talks to this trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::LlmResult;
use crate::types::{LlmResponse, MessageRequest, Usage};

/// Observer for per-call token usage and cost: `(usage, cost_usd)`.
pub type UsageObserver = Arc<dyn Fn(&Usage, f64) + Send + Sync>;

/// LLM provider trait.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, for logging.
    fn name(&self) -> &str;

    /// Model identifier in use.
    fn model(&self) -> &str;

    /// Send a message request and return the full response.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying API call fails; callers in
    /// the reasoning layer are expected to map failures to their
    /// documented fallbacks.
    async fn create_message(&self, request: MessageRequest) -> LlmResult<LlmResponse>;

    /// Simple text completion with no tools or system prompt.
    async fn complete_simple(&self, prompt: &str, max_tokens: u32) -> LlmResult<String> {
        let response = self
            .create_message(MessageRequest::from_prompt(prompt, max_tokens))
            .await?;
        Ok(response.text())
    }

    /// Approximate token count for budgeting (~4 chars per token).
    fn count_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }
}

/// Blanket implementation so `Arc<dyn LlmProvider>` satisfies
/// `LlmProvider` bounds directly.
#[async_trait]
impl LlmProvider for Arc<dyn LlmProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    async fn create_message(&self, request: MessageRequest) -> LlmResult<LlmResponse> {
        (**self).create_message(request).await
    }

    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, StopReason};

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn create_message(&self, request: MessageRequest) -> LlmResult<LlmResponse> {
            let text = request
                .messages
                .last()
                .map(crate::types::Message::text)
                .unwrap_or_default();
            Ok(LlmResponse {
                content: vec![ContentBlock::Text { text }],
                stop_reason: StopReason::EndTurn,
                usage: Usage {
                    input_tokens: 1,
                    output_tokens: 1,
                },
            })
        }
    }

    #[tokio::test]
    async fn test_complete_simple_extracts_text() {
        let provider = EchoProvider;
        let text = provider.complete_simple("ping", 64).await.unwrap();
        assert_eq!(text, "ping");
    }

    #[tokio::test]
    async fn test_arc_blanket_impl() {
        let provider: Arc<dyn LlmProvider> = Arc::new(EchoProvider);
        assert_eq!(provider.name(), "echo");
        let text = provider.complete_simple("pong", 64).await.unwrap();
        assert_eq!(text, "pong");
    }
}
