//! Strategic query planning and task decomposition.

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use nexus_llm::LlmProvider;

use crate::reasoning::config::ReasoningConfig;
use crate::reasoning::prompts;
use crate::reasoning::types::{PlanComplexity, ResearchPlan, SubTask};

const PLANNING_MAX_TOKENS: u32 = 1500;

/// Planning mode: light caps the plan at two subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// At most two subtasks, minimal overhead.
    Light,
    /// Up to the configured subtask budget.
    Deep,
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Deep => "deep",
        })
    }
}

/// Summary of a prior attempt, passed to the planner on refinement.
#[derive(Debug, Clone)]
pub struct AttemptSummary {
    /// Strategy used.
    pub strategy: String,
    /// Quality score, when evaluated.
    pub quality: Option<f64>,
    /// Evaluator reasoning, when available.
    pub evaluation: Option<String>,
}

/// Context handed to the planner.
///
/// Previous attempts, completed steps, and knowledge gaps are only
/// populated on refinement — when the tracker already holds prior work.
#[derive(Debug, Clone)]
pub struct PlanContext {
    /// Planning mode.
    pub mode: PlanMode,
    /// One-line complexity summary, when an analysis exists.
    pub complexity: Option<String>,
    /// Names of tools available to execution.
    pub available_tools: Vec<String>,
    /// Prior attempts (excluding the current one).
    pub previous_attempts: Vec<AttemptSummary>,
    /// Steps already completed in previous attempts.
    pub completed_steps: Vec<String>,
    /// Outstanding knowledge gaps from evaluations.
    pub knowledge_gaps: Vec<String>,
}

impl PlanContext {
    /// A fresh context with no refinement data.
    #[must_use]
    pub fn new(mode: PlanMode, available_tools: Vec<String>) -> Self {
        Self {
            mode,
            complexity: None,
            available_tools,
            previous_attempts: Vec::new(),
            completed_steps: Vec::new(),
            knowledge_gaps: Vec::new(),
        }
    }

    fn render(&self) -> String {
        let mut parts = vec![format!("Mode: {}", self.mode)];

        if let Some(complexity) = &self.complexity {
            parts.push(format!("Complexity: {complexity}"));
        }

        if !self.previous_attempts.is_empty() {
            parts.push("\n## Previous Execution Attempts".to_string());
            for attempt in &self.previous_attempts {
                let quality = attempt
                    .quality
                    .map_or_else(|| "N/A".to_string(), |q| format!("{q:.2}"));
                let mut line = format!("- {}: Quality {quality}", attempt.strategy);
                if let Some(evaluation) = &attempt.evaluation {
                    line.push_str(&format!(", Evaluation: {evaluation}"));
                }
                parts.push(line);
            }
        }

        if !self.completed_steps.is_empty() {
            parts.push("\n## Already Completed Steps".to_string());
            parts.push("Build upon these completed steps:".to_string());
            for step in &self.completed_steps {
                parts.push(format!("- {step}"));
            }
        }

        if !self.knowledge_gaps.is_empty() {
            parts.push("\n## Knowledge Gaps to Address".to_string());
            for gap in &self.knowledge_gaps {
                parts.push(format!("- {gap}"));
            }
        }

        parts.join("\n")
    }
}

/// LLM-driven subtask decomposition.
pub struct Planner {
    llm: Arc<dyn LlmProvider>,
    config: ReasoningConfig,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner").finish_non_exhaustive()
    }
}

impl Planner {
    /// Create a planner.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>, config: ReasoningConfig) -> Self {
        Self { llm, config }
    }

    /// Generate an execution plan for a query.
    ///
    /// On LLM failure, returns a single-subtask plan containing the
    /// original query with low complexity.
    pub async fn generate_plan(&self, query: &str, context: &PlanContext) -> ResearchPlan {
        debug!(query = %query.chars().take(100).collect::<String>(), mode = %context.mode, "Generating plan");

        let max_subtasks = match context.mode {
            PlanMode::Light => 2,
            PlanMode::Deep => self.config.max_subtasks,
        };

        let tools = if context.available_tools.is_empty() {
            "Available tools not specified".to_string()
        } else {
            context.available_tools.join(", ")
        };

        let prompt = prompts::planning(query, &tools, &context.render());

        match self.llm.complete_simple(&prompt, PLANNING_MAX_TOKENS).await {
            Ok(response) => {
                let subtasks = parse_plan(&response, max_subtasks);
                let estimated_complexity = PlanComplexity::from_subtask_count(subtasks.len());
                info!(
                    subtask_count = subtasks.len(),
                    complexity = ?estimated_complexity,
                    "Generated plan"
                );
                ResearchPlan {
                    original_query: query.to_string(),
                    subtasks,
                    max_iterations: self.config.max_iterations,
                    estimated_complexity,
                    complexity_analysis: None,
                }
            },
            Err(e) => {
                error!(error = %e, "Planning failed, falling back to single subtask");
                ResearchPlan {
                    original_query: query.to_string(),
                    subtasks: vec![SubTask {
                        query: query.to_string(),
                        priority: 1,
                        tool_hints: None,
                    }],
                    max_iterations: 1,
                    estimated_complexity: PlanComplexity::Low,
                    complexity_analysis: None,
                }
            },
        }
    }
}

/// Parse an LLM planning response into subtasks.
///
/// Two grammars are tried in order:
///
/// 1. `N. [PRIORITY] description` lines, each optionally followed by a
///    `Tools: a, b` line. Priority keywords map HIGH→1, MEDIUM→2,
///    LOW→3 (default 2).
/// 2. A plain numbered list `N. description` with sequential
///    priorities; lines that look like metadata are skipped.
///
/// Subtasks are sorted by priority and capped at `max_subtasks`.
fn parse_plan(response: &str, max_subtasks: usize) -> Vec<SubTask> {
    let bracketed =
        Regex::new(r"^\s*\d+\.\s*\[([^\]]+)\]\s*(.+)$").expect("valid bracketed-task regex");
    let tools_line = Regex::new(r"(?i)^\s*Tools:\s*(.+)$").expect("valid tools-line regex");

    let lines: Vec<&str> = response.lines().collect();
    let mut subtasks: Vec<SubTask> = Vec::new();

    let mut index = 0;
    while index < lines.len() && subtasks.len() < max_subtasks {
        let line = lines[index];
        index = index.saturating_add(1);

        let Some(caps) = bracketed.captures(line) else {
            continue;
        };

        let priority_text = caps
            .get(1)
            .map_or("", |m| m.as_str())
            .to_uppercase();
        let priority = if priority_text.contains("HIGH") {
            1
        } else if priority_text.contains("LOW") {
            3
        } else {
            2
        };

        let description = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();

        // An optional Tools: line may follow the task line
        let mut tool_hints = None;
        if let Some(next) = lines.get(index) {
            if let Some(tools_caps) = tools_line.captures(next) {
                let raw = tools_caps.get(1).map_or("", |m| m.as_str()).trim();
                if !raw.is_empty() && !raw.eq_ignore_ascii_case("none") {
                    tool_hints = Some(
                        raw.split(',')
                            .map(|t| t.trim().to_string())
                            .filter(|t| !t.is_empty())
                            .collect(),
                    );
                }
                index = index.saturating_add(1);
            }
        }

        subtasks.push(SubTask {
            query: description,
            priority,
            tool_hints,
        });
    }

    // Fallback grammar: plain numbered list
    if subtasks.is_empty() {
        let numbered = Regex::new(r"^\s*\d+\.\s*(.+)$").expect("valid numbered-task regex");
        let mut priority: u8 = 1;
        for line in &lines {
            if subtasks.len() >= max_subtasks {
                break;
            }
            let Some(caps) = numbered.captures(line) else {
                continue;
            };
            let description = caps.get(1).map_or("", |m| m.as_str()).trim();
            let lowered = description.to_lowercase();
            if ["tools:", "priority:", "strategy:", "output"]
                .iter()
                .any(|keyword| lowered.contains(keyword))
            {
                continue;
            }
            subtasks.push(SubTask {
                query: description.to_string(),
                priority,
                tool_hints: None,
            });
            priority = priority.saturating_add(1);
        }
    }

    if subtasks.is_empty() {
        warn!("No subtasks parsed from planning response");
    }

    subtasks.sort_by_key(|task| task.priority);
    debug!(count = subtasks.len(), "Parsed subtasks from plan");
    subtasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_llm::{
        ContentBlock, LlmError, LlmResponse, LlmResult, MessageRequest, StopReason, Usage,
    };

    struct ScriptedProvider {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn create_message(&self, _request: MessageRequest) -> LlmResult<LlmResponse> {
            match &self.response {
                Some(text) => Ok(LlmResponse {
                    content: vec![ContentBlock::Text { text: text.clone() }],
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                }),
                None => Err(LlmError::ApiRequestFailed("down".to_string())),
            }
        }
    }

    fn planner_with(response: Option<&str>) -> Planner {
        Planner::new(
            Arc::new(ScriptedProvider {
                response: response.map(String::from),
            }),
            ReasoningConfig::default(),
        )
    }

    #[test]
    fn test_parse_bracketed_grammar_with_tools() {
        let response = "\
1. [HIGH PRIORITY] Survey Raft deployments at the edge
   Tools: web_search, read_paper
2. [MEDIUM] Collect latency benchmarks
   Tools: none
3. [LOW PRIORITY] Summarize trade-offs";

        let subtasks = parse_plan(response, 5);
        assert_eq!(subtasks.len(), 3);
        assert_eq!(subtasks[0].priority, 1);
        assert_eq!(
            subtasks[0].tool_hints.as_ref().unwrap(),
            &vec!["web_search".to_string(), "read_paper".to_string()]
        );
        assert_eq!(subtasks[1].priority, 2);
        assert!(subtasks[1].tool_hints.is_none());
        assert_eq!(subtasks[2].priority, 3);
    }

    #[test]
    fn test_parse_sorts_by_priority() {
        let response = "\
1. [LOW] cleanup
2. [HIGH] the core question
3. [MEDIUM] supporting data";

        let subtasks = parse_plan(response, 5);
        assert_eq!(subtasks[0].query, "the core question");
        assert_eq!(subtasks[1].query, "supporting data");
        assert_eq!(subtasks[2].query, "cleanup");
    }

    #[test]
    fn test_parse_plain_numbered_fallback() {
        let response = "\
Here is the plan:
1. Find the population of France
2. Find the population of Germany
3. Output: compare the two";

        let subtasks = parse_plan(response, 5);
        assert_eq!(subtasks.len(), 2);
        assert_eq!(subtasks[0].priority, 1);
        assert_eq!(subtasks[1].priority, 2);
    }

    #[test]
    fn test_parse_caps_at_max_subtasks() {
        let response = "\
1. [HIGH] a
2. [HIGH] b
3. [HIGH] c";
        let subtasks = parse_plan(response, 2);
        assert_eq!(subtasks.len(), 2);
    }

    #[test]
    fn test_parse_unknown_priority_defaults_medium() {
        let subtasks = parse_plan("1. [URGENT] do the thing", 5);
        assert_eq!(subtasks[0].priority, 2);
    }

    #[tokio::test]
    async fn test_light_mode_caps_at_two() {
        let planner = planner_with(Some(
            "1. [HIGH] a\n2. [HIGH] b\n3. [HIGH] c\n4. [HIGH] d",
        ));
        let plan = planner
            .generate_plan("query", &PlanContext::new(PlanMode::Light, vec![]))
            .await;
        assert_eq!(plan.subtasks.len(), 2);
    }

    #[tokio::test]
    async fn test_complexity_estimate() {
        let planner = planner_with(Some("1. [HIGH] only one"));
        let plan = planner
            .generate_plan("query", &PlanContext::new(PlanMode::Deep, vec![]))
            .await;
        assert_eq!(plan.estimated_complexity, PlanComplexity::Low);
    }

    #[tokio::test]
    async fn test_llm_failure_yields_single_subtask_plan() {
        let planner = planner_with(None);
        let plan = planner
            .generate_plan("the original query", &PlanContext::new(PlanMode::Deep, vec![]))
            .await;
        assert_eq!(plan.subtasks.len(), 1);
        assert_eq!(plan.subtasks[0].query, "the original query");
        assert_eq!(plan.estimated_complexity, PlanComplexity::Low);
        assert_eq!(plan.max_iterations, 1);
    }
}
