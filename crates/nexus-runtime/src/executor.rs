//! Tool-tracking LLM execution.
//!
//! The [`ToolLoopExecutor`] drives the LLM tool-use loop for one query:
//! assistant `tool_use` blocks dispatch through the registry (behind an
//! optional approval gate), results re-enter the conversation as
//! `tool_result` user blocks, and every execution is journaled into the
//! progress tracker. Tool failures surface to the LLM as error text
//! blocks — the model re-plans or narrates, the runtime never falls
//! over.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use nexus_approval::{ApprovalManager, ApprovalRequest};
use nexus_llm::{ContentBlock, CostCalculator, LlmProvider, UsageObserver};
use nexus_tools::ToolRegistry;

use crate::conversation::Conversation;
use crate::error::RuntimeResult;
use crate::observer::ExecutionObserver;
use crate::tracker::ProgressTracker;

/// Executor knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Token budget per LLM call.
    pub max_tokens: u32,
    /// Maximum assistant/tool rounds per execution.
    pub max_tool_rounds: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            max_tool_rounds: 8,
        }
    }
}

/// Executes queries against the LLM with tool dispatch and tracking.
pub struct ToolLoopExecutor {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    conversation: Arc<Mutex<Conversation>>,
    approval: Option<Arc<ApprovalManager>>,
    config: ExecutorConfig,
    cost: CostCalculator,
    on_usage: Option<UsageObserver>,
}

impl std::fmt::Debug for ToolLoopExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolLoopExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ToolLoopExecutor {
    /// Create an executor.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        conversation: Arc<Mutex<Conversation>>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            llm,
            registry,
            conversation,
            approval: None,
            config,
            cost: CostCalculator::new(),
            on_usage: None,
        }
    }

    /// Gate tool executions through an approval manager.
    #[must_use]
    pub fn with_approval(mut self, approval: Arc<ApprovalManager>) -> Self {
        self.approval = Some(approval);
        self
    }

    /// Report per-call usage and cost to an observer.
    #[must_use]
    pub fn with_usage_observer(mut self, observer: UsageObserver) -> Self {
        self.on_usage = Some(observer);
        self
    }

    /// The conversation this executor appends to.
    #[must_use]
    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    /// Execute a query with tool tracking.
    ///
    /// An empty query appends nothing — used after a `/command` has
    /// already injected prompt messages into the conversation.
    ///
    /// # Errors
    ///
    /// Propagates LLM API failures; tool failures never error, they
    /// become error blocks the model sees.
    pub async fn execute_tracked(
        &self,
        query: &str,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        if !query.is_empty() {
            self.conversation.lock().await.add_user_text(query);
        }

        let mut final_text = String::new();

        for round in 0..self.config.max_tool_rounds {
            let tools = self.registry.tool_definitions().await;
            let llm_tools = tools
                .into_iter()
                .map(|spec| nexus_llm::LlmToolDefinition {
                    name: spec.name,
                    description: spec.description,
                    input_schema: spec.input_schema,
                })
                .collect();

            let request = {
                let conversation = self.conversation.lock().await;
                conversation.to_request(self.config.max_tokens, llm_tools)
            };

            let response = self.llm.create_message(request).await?;

            if let Some(on_usage) = &self.on_usage {
                let cost = self.cost.cost(self.llm.model(), &response.usage);
                on_usage(&response.usage, cost);
            }

            let text = response.text();
            if !text.is_empty() {
                final_text = text;
            }

            let tool_uses: Vec<(String, String, Value)> = response
                .tool_uses()
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    },
                    _ => None,
                })
                .collect();

            self.conversation
                .lock()
                .await
                .add_assistant_blocks(response.content);

            if tool_uses.is_empty() {
                debug!(round, "No tool use requested, execution complete");
                break;
            }

            let mut results = Vec::with_capacity(tool_uses.len());
            for (call_id, tool_name, arguments) in tool_uses {
                observer.on_tool_call(&tool_name, &arguments).await;
                let block = self
                    .run_one_tool(&call_id, &tool_name, arguments, tracker, observer)
                    .await;
                results.push(block);
            }

            self.conversation.lock().await.add_tool_results(results);
        }

        info!(chars = final_text.len(), "Tracked execution complete");
        Ok(final_text)
    }

    /// Execute one tool call, mapping every failure to an error block.
    async fn run_one_tool(
        &self,
        call_id: &str,
        tool_name: &str,
        arguments: Value,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> ContentBlock {
        if let Some(denial) = self.check_tool_approval(tool_name, &arguments).await {
            observer.on_tool_result(tool_name, &denial, false).await;
            return ContentBlock::ToolResult {
                tool_use_id: call_id.to_string(),
                content: denial,
                is_error: true,
            };
        }

        match self.registry.execute(tool_name, arguments.clone()).await {
            Ok(result) => {
                tracker.record_tool_execution(tool_name, &arguments, &result);
                let preview: String = result.chars().take(160).collect();
                observer.on_tool_result(tool_name, &preview, true).await;
                ContentBlock::ToolResult {
                    tool_use_id: call_id.to_string(),
                    content: result,
                    is_error: false,
                }
            },
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Tool execution failed");
                let message = format!("Tool execution failed: {e}");
                tracker.record_tool_execution(tool_name, &arguments, &message);
                observer.on_tool_result(tool_name, &message, false).await;
                ContentBlock::ToolResult {
                    tool_use_id: call_id.to_string(),
                    content: message,
                    is_error: true,
                }
            },
        }
    }

    /// Returns a denial message when approval is required and refused.
    async fn check_tool_approval(&self, tool_name: &str, arguments: &Value) -> Option<String> {
        let approval = self.approval.as_ref()?;
        if !approval.config().require_tool_approval || approval.is_whitelisted(tool_name) {
            return None;
        }

        let mut details = serde_json::Map::new();
        details.insert(
            "tool_name".to_string(),
            Value::String(tool_name.to_string()),
        );
        details.insert("arguments".to_string(), arguments.clone());
        let request = ApprovalRequest::tool_execution(format!("Execute tool {tool_name}?"), details);

        match approval.request_approval(request).await {
            Ok(response) if response.approved => None,
            Ok(_) => Some("Tool execution denied by user".to_string()),
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Approval unavailable, denying tool");
                Some(format!("Tool execution not approved: {e}"))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use async_trait::async_trait;
    use nexus_llm::{LlmResponse, LlmResult, MessageRequest, StopReason, Usage};
    use nexus_tools::{LocalTool, LocalToolProvider, ParameterKind, ToolParameter, ToolStateManager};
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Scripted provider: first call requests a tool, second answers.
    struct ToolThenAnswer {
        calls: StdMutex<u32>,
        tool_name: String,
    }

    #[async_trait]
    impl LlmProvider for ToolThenAnswer {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "claude-sonnet-4-5"
        }

        async fn create_message(&self, request: MessageRequest) -> LlmResult<LlmResponse> {
            let mut calls = self.calls.lock().expect("lock poisoned");
            *calls += 1;
            if *calls == 1 {
                Ok(LlmResponse {
                    content: vec![
                        ContentBlock::Text {
                            text: "Let me check.".to_string(),
                        },
                        ContentBlock::ToolUse {
                            id: "call_1".to_string(),
                            name: self.tool_name.clone(),
                            input: json!({"name": "Ada"}),
                        },
                    ],
                    stop_reason: StopReason::ToolUse,
                    usage: Usage {
                        input_tokens: 10,
                        output_tokens: 5,
                    },
                })
            } else {
                // The tool result must have come back as a user message
                let last = request.messages.last().expect("messages present");
                let has_result = last
                    .content
                    .iter()
                    .any(|b| matches!(b, ContentBlock::ToolResult { .. }));
                assert!(has_result, "expected tool result in final request");
                Ok(LlmResponse {
                    content: vec![ContentBlock::Text {
                        text: "Ada says hello.".to_string(),
                    }],
                    stop_reason: StopReason::EndTurn,
                    usage: Usage {
                        input_tokens: 20,
                        output_tokens: 8,
                    },
                })
            }
        }
    }

    fn greet_registry() -> Arc<ToolRegistry> {
        let tool = LocalTool::new(
            "greet",
            "Greet someone",
            vec![ToolParameter::required("name", ParameterKind::String)],
            |args| Ok(format!("Hello, {}!", args["name"].as_str().unwrap_or("?"))),
        );
        Arc::new(
            ToolRegistry::new(Arc::new(ToolStateManager::new()))
                .with_provider(Arc::new(LocalToolProvider::new(vec![tool]))),
        )
    }

    fn executor_with(llm: Arc<dyn LlmProvider>) -> ToolLoopExecutor {
        ToolLoopExecutor::new(
            llm,
            greet_registry(),
            Arc::new(Mutex::new(Conversation::default())),
            ExecutorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_tool_roundtrip() {
        let executor = executor_with(Arc::new(ToolThenAnswer {
            calls: StdMutex::new(0),
            tool_name: "greet".to_string(),
        }));

        let mut tracker = ProgressTracker::new();
        let answer = executor
            .execute_tracked("greet Ada", &mut tracker, &NoopObserver)
            .await
            .unwrap();

        assert_eq!(answer, "Ada says hello.");
        assert_eq!(tracker.tool_executions.len(), 1);
        assert_eq!(tracker.tool_executions[0].tool, "greet");

        // Conversation: user, assistant(tool_use), user(tool_result), assistant
        let conversation = executor.conversation();
        let conversation = conversation.lock().await;
        assert_eq!(conversation.message_count(), 4);
    }

    #[tokio::test]
    async fn test_unknown_tool_surfaces_error_block() {
        let executor = executor_with(Arc::new(ToolThenAnswer {
            calls: StdMutex::new(0),
            tool_name: "nonexistent".to_string(),
        }));

        let mut tracker = ProgressTracker::new();
        let answer = executor
            .execute_tracked("do something", &mut tracker, &NoopObserver)
            .await
            .unwrap();

        // The loop continued past the failed tool and got a final answer
        assert_eq!(answer, "Ada says hello.");
        assert!(tracker.tool_executions[0]
            .result_preview
            .contains("Tool execution failed"));
    }

    #[tokio::test]
    async fn test_whitelisted_tool_skips_approval() {
        use nexus_approval::{ApprovalConfig, ApprovalManager};

        // Approval is required and no UI is registered: a non-whitelisted
        // tool would be denied. The whitelist short-circuits the prompt.
        let mut config = ApprovalConfig::default();
        config.require_tool_approval = true;
        config.tool_whitelist.insert("greet".to_string());

        let executor = executor_with(Arc::new(ToolThenAnswer {
            calls: StdMutex::new(0),
            tool_name: "greet".to_string(),
        }))
        .with_approval(Arc::new(ApprovalManager::new(config)));

        let mut tracker = ProgressTracker::new();
        let answer = executor
            .execute_tracked("greet Ada", &mut tracker, &NoopObserver)
            .await
            .unwrap();
        assert_eq!(answer, "Ada says hello.");
        assert_eq!(tracker.tool_executions.len(), 1);
    }

    #[tokio::test]
    async fn test_unapproved_tool_becomes_error_block() {
        use nexus_approval::{ApprovalConfig, ApprovalManager};

        // Approval required, tool not whitelisted, no UI: the denial
        // surfaces to the model as an error block, never as a failure.
        let config = ApprovalConfig {
            require_tool_approval: true,
            ..ApprovalConfig::default()
        };

        let executor = executor_with(Arc::new(ToolThenAnswer {
            calls: StdMutex::new(0),
            tool_name: "greet".to_string(),
        }))
        .with_approval(Arc::new(ApprovalManager::new(config)));

        let mut tracker = ProgressTracker::new();
        let answer = executor
            .execute_tracked("greet Ada", &mut tracker, &NoopObserver)
            .await
            .unwrap();

        // The loop continued to a final answer; the tool never ran
        assert_eq!(answer, "Ada says hello.");
        assert!(tracker.tool_executions.is_empty());
    }

    #[tokio::test]
    async fn test_usage_observer_sees_every_call() {
        let usage_log: Arc<StdMutex<Vec<(u64, u64)>>> = Arc::new(StdMutex::new(Vec::new()));
        let usage_clone = Arc::clone(&usage_log);

        let executor = executor_with(Arc::new(ToolThenAnswer {
            calls: StdMutex::new(0),
            tool_name: "greet".to_string(),
        }))
        .with_usage_observer(Arc::new(move |usage, _cost| {
            usage_clone
                .lock()
                .expect("lock poisoned")
                .push((usage.input_tokens, usage.output_tokens));
        }));

        let mut tracker = ProgressTracker::new();
        executor
            .execute_tracked("greet Ada", &mut tracker, &NoopObserver)
            .await
            .unwrap();

        // Two LLM rounds (tool request, final answer), two usage reports
        let log = usage_log.lock().unwrap();
        assert_eq!(*log, vec![(10, 5), (20, 8)]);
    }

    #[tokio::test]
    async fn test_empty_query_appends_nothing_initially() {
        struct PlainAnswer;

        #[async_trait]
        impl LlmProvider for PlainAnswer {
            fn name(&self) -> &str {
                "plain"
            }

            fn model(&self) -> &str {
                "m"
            }

            async fn create_message(&self, request: MessageRequest) -> LlmResult<LlmResponse> {
                // The preloaded prompt message is the only user content
                assert_eq!(request.messages.len(), 1);
                Ok(LlmResponse {
                    content: vec![ContentBlock::Text {
                        text: "ok".to_string(),
                    }],
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                })
            }
        }

        let conversation = Arc::new(Mutex::new(Conversation::default()));
        conversation.lock().await.add_user_text("from a prompt command");

        let executor = ToolLoopExecutor::new(
            Arc::new(PlainAnswer),
            greet_registry(),
            conversation,
            ExecutorConfig::default(),
        );

        let mut tracker = ProgressTracker::new();
        let answer = executor
            .execute_tracked("", &mut tracker, &NoopObserver)
            .await
            .unwrap();
        assert_eq!(answer, "ok");
    }
}
