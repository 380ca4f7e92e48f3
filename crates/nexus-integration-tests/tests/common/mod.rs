//! Shared harness for integration tests.

use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use async_trait::async_trait;
use nexus_llm::{
    ContentBlock, LlmProvider, LlmResponse, LlmResult, MessageRequest, StopReason, Usage,
};
use nexus_runtime::{
    AdaptiveReasoningLoop, Conversation, MetricsCollector, ReasoningConfig,
};
use nexus_tools::{LocalTool, LocalToolProvider, ParameterKind, ToolParameter, ToolRegistry, ToolStateManager};

/// Scripted LLM provider that answers by prompt kind.
///
/// Reasoning-component prompts (triage, planning, evaluation) are
/// recognized by their fixed preambles; everything else is treated as
/// an answer-generation call and served from the `answers` queue (the
/// last answer repeats once the queue is dry).
pub struct ScriptedLlm {
    pub analysis: String,
    pub quality: StdMutex<Vec<String>>,
    pub answers: StdMutex<Vec<String>>,
    pub plan: String,
}

impl ScriptedLlm {
    pub fn new(analysis: &str, quality: Vec<&str>, answers: Vec<&str>) -> Self {
        Self {
            analysis: analysis.to_string(),
            // Stored reversed so pop() yields original order
            quality: StdMutex::new(quality.iter().rev().map(|s| (*s).to_string()).collect()),
            answers: StdMutex::new(answers.iter().rev().map(|s| (*s).to_string()).collect()),
            plan: "1. [HIGH] investigate the question".to_string(),
        }
    }

    fn text_response(text: String) -> LlmResponse {
        LlmResponse {
            content: vec![ContentBlock::Text { text }],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 10,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn create_message(&self, request: MessageRequest) -> LlmResult<LlmResponse> {
        let prompt = request
            .messages
            .last()
            .map(nexus_llm::Message::text)
            .unwrap_or_default();

        let text = if prompt.contains("query triage system") {
            self.analysis.clone()
        } else if prompt.contains("response quality gate") {
            self.quality
                .lock()
                .expect("lock poisoned")
                .pop()
                .unwrap_or_else(|| {
                    "**Quality Assessment:** SUFFICIENT\n**Confidence Score:** 0.9".to_string()
                })
        } else if prompt.contains("research planner") {
            self.plan.clone()
        } else if prompt.contains("evaluating whether accumulated research") {
            "## Completeness Assessment\nCOMPLETE\n\n## Confidence Score\n0.9".to_string()
        } else {
            let mut answers = self.answers.lock().expect("lock poisoned");
            match answers.len() {
                0 => "default answer".to_string(),
                1 => answers[0].clone(),
                _ => answers.pop().expect("checked non-empty"),
            }
        };

        Ok(Self::text_response(text))
    }
}

/// Analysis response routing to DIRECT.
pub const SIMPLE_ANALYSIS: &str = "\
**Complexity Level:** SIMPLE
**Recommended Strategy:** DIRECT
**Estimated Iterations:** 1
**Confidence:** 0.95
**Reasoning:**
Trivial.";

/// A registry with one local `greet` tool.
pub fn greet_registry() -> Arc<ToolRegistry> {
    let tool = LocalTool::new(
        "greet",
        "Greet someone by name",
        vec![ToolParameter::required("name", ParameterKind::String)],
        |args| Ok(format!("Hello, {}!", args["name"].as_str().unwrap_or("?"))),
    );
    Arc::new(
        ToolRegistry::new(Arc::new(ToolStateManager::new()))
            .with_provider(Arc::new(LocalToolProvider::new(vec![tool]))),
    )
}

/// Build a reasoning loop over a scripted provider and fresh state.
pub fn make_loop(llm: ScriptedLlm) -> (AdaptiveReasoningLoop, Arc<Mutex<Conversation>>) {
    let conversation = Arc::new(Mutex::new(Conversation::default()));
    let reasoning_loop = AdaptiveReasoningLoop::new(
        Arc::new(llm),
        greet_registry(),
        Arc::clone(&conversation),
        ReasoningConfig::default(),
        None,
        Arc::new(MetricsCollector::new()),
    );
    (reasoning_loop, conversation)
}
