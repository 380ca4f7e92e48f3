//! Per-query progress tracking.
//!
//! A [`ProgressTracker`] is created per query and lives for that
//! query's whole journey through the adaptive loop, accumulating the
//! plan, every strategy attempt, knowledge gaps from evaluations, and a
//! log of tool executions. Escalated strategies read this context to
//! avoid redoing work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::reasoning::types::{EvaluationResult, ResearchPlan, StrategyKind};

/// Execution state of a plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started.
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with failure.
    Failed,
}

impl StepStatus {
    /// Ordering rank; transitions may only increase it.
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InProgress => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether this is a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// One step of a tracked plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step identifier, unique within the plan.
    pub id: String,
    /// What the step does.
    pub description: String,
    /// Current status.
    pub status: StepStatus,
    /// When execution started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the step reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Findings accumulated by executing the step.
    pub findings: Vec<String>,
    /// Tools used while executing the step.
    pub tools_used: Vec<String>,
    /// Ids of steps this one depends on.
    pub depends_on: Vec<String>,
    /// Id of the step whose evaluation spawned this one, for dynamic
    /// steps.
    pub spawned_from: Option<String>,
}

impl PlanStep {
    fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            findings: Vec::new(),
            tools_used: Vec::new(),
            depends_on: Vec::new(),
            spawned_from: None,
        }
    }
}

/// The tracker's materialized view of a research plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPlan {
    /// The query this plan answers.
    pub original_query: String,
    /// Ordered steps.
    pub steps: Vec<PlanStep>,
    /// Iteration budget.
    pub max_iterations: u32,
    /// Which strategy installed the plan.
    pub strategy: StrategyKind,
}

impl TrackedPlan {
    /// Steps still pending, in order.
    #[must_use]
    pub fn pending_steps(&self) -> Vec<&PlanStep> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Pending)
            .collect()
    }

    /// Completed steps, in order.
    #[must_use]
    pub fn completed_steps(&self) -> Vec<&PlanStep> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .collect()
    }
}

/// A single strategy invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Strategy used.
    pub strategy: StrategyKind,
    /// Quality score assigned after evaluation.
    pub quality_score: Option<f64>,
    /// The quality evaluation itself.
    pub evaluation: Option<EvaluationResult>,
    /// Wall time of the attempt.
    pub elapsed: Duration,
}

/// Accumulated insights: currently an ordered, de-duplicated bag of
/// knowledge gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Insights {
    knowledge_gaps: Vec<String>,
}

impl Insights {
    /// Add a gap; duplicates compare case-insensitively.
    pub fn add_gap(&mut self, gap: impl Into<String>) {
        let gap = gap.into();
        let lowered = gap.to_lowercase();
        if !self
            .knowledge_gaps
            .iter()
            .any(|existing| existing.to_lowercase() == lowered)
        {
            self.knowledge_gaps.push(gap);
        }
    }

    /// Union in the missing aspects of an evaluation.
    pub fn add_from_evaluation(&mut self, evaluation: &EvaluationResult) {
        for aspect in &evaluation.missing_aspects {
            self.add_gap(aspect.clone());
        }
    }

    /// The gaps, oldest first.
    #[must_use]
    pub fn knowledge_gaps(&self) -> &[String] {
        &self.knowledge_gaps
    }
}

/// One entry in the tool-execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    /// Tool name.
    pub tool: String,
    /// Compact fingerprint of the arguments.
    pub args_fingerprint: String,
    /// Truncated result preview.
    pub result_preview: String,
    /// When the tool ran.
    pub at: DateTime<Utc>,
}

const FINGERPRINT_LIMIT: usize = 120;
const PREVIEW_LIMIT: usize = 160;

/// Per-query journal of plan, attempts, insights, and tool executions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressTracker {
    /// The current plan, when a planning strategy has run.
    pub plan: Option<TrackedPlan>,
    /// Strategy attempts, append-only.
    pub attempts: Vec<Attempt>,
    /// Knowledge gaps and other insights.
    pub insights: Insights,
    /// Log of tool executions across all attempts.
    pub tool_executions: Vec<ToolExecution>,
    #[serde(default)]
    dynamic_step_counter: u32,
}

impl ProgressTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a later strategy is refining earlier work.
    #[must_use]
    pub fn has_prior_work(&self) -> bool {
        self.plan.is_some() || self.attempts.len() > 1
    }

    /// Install (or replace) the plan from a planner result.
    ///
    /// Completed steps of an existing plan are carried over by
    /// description match, so a refined plan does not lose cached work.
    pub fn set_plan(&mut self, plan: &ResearchPlan, strategy: StrategyKind) {
        let previous = self.plan.take();

        let steps = plan
            .subtasks
            .iter()
            .enumerate()
            .map(|(index, subtask)| {
                let id = format!("step_{}", index.saturating_add(1));
                let mut step = PlanStep::new(id, subtask.query.clone());
                if let Some(old) = previous.as_ref().and_then(|p| {
                    p.steps
                        .iter()
                        .find(|s| s.description == subtask.query && s.status.is_terminal())
                }) {
                    step.status = old.status;
                    step.started_at = old.started_at;
                    step.completed_at = old.completed_at;
                    step.findings = old.findings.clone();
                    step.tools_used = old.tools_used.clone();
                }
                step
            })
            .collect();

        debug!(strategy = %strategy, steps = plan.subtasks.len(), "Plan installed");
        self.plan = Some(TrackedPlan {
            original_query: plan.original_query.clone(),
            steps,
            max_iterations: plan.max_iterations,
            strategy,
        });
    }

    /// Advance a step's status. Transitions are forward-only: attempts
    /// to move a step backwards (or out of a terminal state) are
    /// ignored and logged.
    ///
    /// Returns `true` if the transition was applied.
    pub fn update_step_status(
        &mut self,
        step_id: &str,
        new_status: StepStatus,
        findings: Vec<String>,
    ) -> bool {
        let Some(plan) = self.plan.as_mut() else {
            return false;
        };
        let Some(step) = plan.steps.iter_mut().find(|s| s.id == step_id) else {
            warn!(step_id, "Unknown step in status update");
            return false;
        };

        if new_status.rank() <= step.status.rank() {
            warn!(
                step_id,
                from = %step.status,
                to = %new_status,
                "Rejected non-monotonic step transition"
            );
            return false;
        }

        step.status = new_status;
        match new_status {
            StepStatus::InProgress => step.started_at = Some(Utc::now()),
            StepStatus::Completed | StepStatus::Failed => {
                if step.started_at.is_none() {
                    step.started_at = Some(Utc::now());
                }
                step.completed_at = Some(Utc::now());
            },
            StepStatus::Pending => {},
        }
        step.findings.extend(findings);
        true
    }

    /// Append a dynamic step spawned by an evaluation, linked to its
    /// parent via `spawned_from`.
    pub fn add_dynamic_step(&mut self, description: impl Into<String>, parent_id: &str) {
        let Some(plan) = self.plan.as_mut() else {
            return;
        };
        self.dynamic_step_counter = self.dynamic_step_counter.saturating_add(1);
        let id = format!("step_dynamic_{}", self.dynamic_step_counter);
        let mut step = PlanStep::new(id, description);
        step.depends_on.push(parent_id.to_string());
        step.spawned_from = Some(parent_id.to_string());
        debug!(parent = parent_id, "Dynamic step added");
        plan.steps.push(step);
    }

    /// Record an attempt's start; returns its index for completion.
    pub fn start_attempt(&mut self, strategy: StrategyKind) -> usize {
        self.attempts.push(Attempt {
            strategy,
            quality_score: None,
            evaluation: None,
            elapsed: Duration::ZERO,
        });
        self.attempts.len().saturating_sub(1)
    }

    /// Fill in an attempt's outcome after quality evaluation.
    pub fn complete_attempt(
        &mut self,
        index: usize,
        quality_score: f64,
        evaluation: EvaluationResult,
        elapsed: Duration,
    ) {
        if let Some(attempt) = self.attempts.get_mut(index) {
            attempt.quality_score = Some(quality_score);
            attempt.evaluation = Some(evaluation);
            attempt.elapsed = elapsed;
        }
    }

    /// Journal one tool execution.
    pub fn record_tool_execution(&mut self, tool: &str, arguments: &Value, result: &str) {
        let fingerprint: String = arguments
            .to_string()
            .chars()
            .take(FINGERPRINT_LIMIT)
            .collect();
        let preview: String = result.chars().take(PREVIEW_LIMIT).collect();
        self.tool_executions.push(ToolExecution {
            tool: tool.to_string(),
            args_fingerprint: fingerprint,
            result_preview: preview,
            at: Utc::now(),
        });
    }

    /// One-line digest for DIRECT escalation retries.
    #[must_use]
    pub fn to_compact_context(&self) -> String {
        let attempts = self
            .attempts
            .iter()
            .map(|attempt| {
                let quality = attempt
                    .quality_score
                    .map_or_else(|| "?".to_string(), |q| format!("{q:.2}"));
                format!("{} q={quality}", attempt.strategy)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let gaps = self.insights.knowledge_gaps().join("; ");
        let mut summary = format!("previous attempts: [{attempts}]");
        if !gaps.is_empty() {
            summary.push_str(&format!("; gaps: {gaps}"));
        }
        if !self.tool_executions.is_empty() {
            summary.push_str(&format!("; tools used: {}", self.tool_executions.len()));
        }
        summary
    }

    /// Structured context block for deep reasoning subtasks.
    #[must_use]
    pub fn to_context_text(&self, strategy: StrategyKind) -> String {
        let mut sections = vec![format!("## Execution Context ({strategy})")];

        if !self.attempts.is_empty() {
            sections.push("\n### Previous Attempts".to_string());
            for attempt in &self.attempts {
                let quality = attempt
                    .quality_score
                    .map_or_else(|| "unscored".to_string(), |q| format!("quality {q:.2}"));
                let mut line = format!("- {}: {quality}", attempt.strategy);
                if let Some(evaluation) = &attempt.evaluation {
                    let reasoning: String = evaluation.reasoning.chars().take(200).collect();
                    line.push_str(&format!(" — {reasoning}"));
                }
                sections.push(line);
            }
        }

        if let Some(plan) = &self.plan {
            sections.push("\n### Plan Progress".to_string());
            for step in &plan.steps {
                let marker = match step.status {
                    StepStatus::Completed => "[x]",
                    StepStatus::Failed => "[!]",
                    StepStatus::InProgress => "[~]",
                    StepStatus::Pending => "[ ]",
                };
                sections.push(format!("- {marker} {}", step.description));
            }
        }

        let gaps = self.insights.knowledge_gaps();
        if !gaps.is_empty() {
            sections.push("\n### Knowledge Gaps".to_string());
            for gap in gaps {
                sections.push(format!("- {gap}"));
            }
        }

        if !self.tool_executions.is_empty() {
            sections.push("\n### Tool Execution History".to_string());
            for execution in &self.tool_executions {
                sections.push(format!(
                    "- {}({}) -> {}",
                    execution.tool, execution.args_fingerprint, execution.result_preview
                ));
            }
        }

        sections.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::types::{PlanComplexity, SubTask};
    use serde_json::json;

    fn plan_with(queries: &[&str]) -> ResearchPlan {
        ResearchPlan {
            original_query: "the query".to_string(),
            subtasks: queries
                .iter()
                .map(|q| SubTask {
                    query: (*q).to_string(),
                    priority: 1,
                    tool_hints: None,
                })
                .collect(),
            max_iterations: 3,
            estimated_complexity: PlanComplexity::Medium,
            complexity_analysis: None,
        }
    }

    fn evaluation_with_gaps(gaps: &[&str]) -> EvaluationResult {
        EvaluationResult {
            is_complete: false,
            confidence: 0.4,
            reasoning: "gaps remain".to_string(),
            additional_queries: Vec::new(),
            missing_aspects: gaps.iter().map(|g| (*g).to_string()).collect(),
        }
    }

    #[test]
    fn test_step_transitions_are_forward_only() {
        let mut tracker = ProgressTracker::new();
        tracker.set_plan(&plan_with(&["a"]), StrategyKind::LightPlanning);

        assert!(tracker.update_step_status("step_1", StepStatus::InProgress, vec![]));
        assert!(tracker.update_step_status("step_1", StepStatus::Completed, vec!["done".into()]));

        // Rollback attempts are rejected
        assert!(!tracker.update_step_status("step_1", StepStatus::InProgress, vec![]));
        assert!(!tracker.update_step_status("step_1", StepStatus::Pending, vec![]));

        let plan = tracker.plan.as_ref().unwrap();
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
        assert!(plan.steps[0].completed_at.is_some());
        assert_eq!(plan.steps[0].findings, vec!["done".to_string()]);
    }

    #[test]
    fn test_completed_at_set_iff_terminal() {
        let mut tracker = ProgressTracker::new();
        tracker.set_plan(&plan_with(&["a", "b"]), StrategyKind::DeepReasoning);

        tracker.update_step_status("step_1", StepStatus::InProgress, vec![]);
        let plan = tracker.plan.as_ref().unwrap();
        assert!(plan.steps[0].completed_at.is_none());
        assert!(plan.steps[0].started_at.is_some());

        tracker.update_step_status("step_1", StepStatus::Failed, vec![]);
        let plan = tracker.plan.as_ref().unwrap();
        assert!(plan.steps[0].completed_at.is_some());
    }

    #[test]
    fn test_refined_plan_carries_completed_steps() {
        let mut tracker = ProgressTracker::new();
        tracker.set_plan(&plan_with(&["a", "b"]), StrategyKind::LightPlanning);
        tracker.update_step_status("step_1", StepStatus::InProgress, vec![]);
        tracker.update_step_status("step_1", StepStatus::Completed, vec!["finding-a".into()]);

        // Refinement includes the same "a" plus a new "c"
        tracker.set_plan(&plan_with(&["a", "c"]), StrategyKind::DeepReasoning);

        let plan = tracker.plan.as_ref().unwrap();
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
        assert_eq!(plan.steps[0].findings, vec!["finding-a".to_string()]);
        assert_eq!(plan.steps[1].status, StepStatus::Pending);
    }

    #[test]
    fn test_dynamic_step_linkage() {
        let mut tracker = ProgressTracker::new();
        tracker.set_plan(&plan_with(&["a"]), StrategyKind::DeepReasoning);
        tracker.add_dynamic_step("follow up on latency", "step_1");

        let plan = tracker.plan.as_ref().unwrap();
        assert_eq!(plan.steps.len(), 2);
        let dynamic = &plan.steps[1];
        assert_eq!(dynamic.spawned_from.as_deref(), Some("step_1"));
        assert_eq!(dynamic.depends_on, vec!["step_1".to_string()]);
        assert!(dynamic.id.starts_with("step_dynamic_"));
    }

    #[test]
    fn test_knowledge_gaps_dedupe_case_insensitively() {
        let mut tracker = ProgressTracker::new();
        tracker
            .insights
            .add_from_evaluation(&evaluation_with_gaps(&["Latency data", "cost model"]));
        tracker
            .insights
            .add_from_evaluation(&evaluation_with_gaps(&["latency DATA", "deployment"]));

        assert_eq!(
            tracker.insights.knowledge_gaps(),
            &[
                "Latency data".to_string(),
                "cost model".to_string(),
                "deployment".to_string()
            ]
        );
    }

    #[test]
    fn test_attempts_are_append_only_and_updated_in_place() {
        let mut tracker = ProgressTracker::new();
        let first = tracker.start_attempt(StrategyKind::Direct);
        tracker.complete_attempt(
            first,
            0.55,
            evaluation_with_gaps(&["depth"]),
            Duration::from_secs(1),
        );
        let second = tracker.start_attempt(StrategyKind::LightPlanning);

        assert_eq!(tracker.attempts.len(), 2);
        assert_eq!(tracker.attempts[first].quality_score, Some(0.55));
        assert!(tracker.attempts[second].quality_score.is_none());
        assert!(tracker.has_prior_work());
    }

    #[test]
    fn test_tool_execution_log_truncates() {
        let mut tracker = ProgressTracker::new();
        let long_result = "x".repeat(500);
        tracker.record_tool_execution("search", &json!({"q": "edge raft"}), &long_result);

        assert_eq!(tracker.tool_executions.len(), 1);
        assert!(tracker.tool_executions[0].result_preview.len() <= 160);
        assert!(tracker.tool_executions[0]
            .args_fingerprint
            .contains("edge raft"));
    }

    #[test]
    fn test_compact_context_mentions_attempts_and_gaps() {
        let mut tracker = ProgressTracker::new();
        let index = tracker.start_attempt(StrategyKind::Direct);
        tracker.complete_attempt(
            index,
            0.5,
            evaluation_with_gaps(&["more depth"]),
            Duration::from_secs(1),
        );
        tracker.insights.add_gap("more depth");

        let compact = tracker.to_compact_context();
        assert!(compact.contains("DIRECT q=0.50"));
        assert!(compact.contains("more depth"));
    }

    #[test]
    fn test_context_text_structure() {
        let mut tracker = ProgressTracker::new();
        tracker.set_plan(&plan_with(&["a", "b"]), StrategyKind::DeepReasoning);
        tracker.update_step_status("step_1", StepStatus::InProgress, vec![]);
        tracker.update_step_status("step_1", StepStatus::Completed, vec![]);
        tracker.insights.add_gap("latency");
        tracker.record_tool_execution("search", &json!({}), "found things");

        let context = tracker.to_context_text(StrategyKind::DeepReasoning);
        assert!(context.contains("### Plan Progress"));
        assert!(context.contains("- [x] a"));
        assert!(context.contains("- [ ] b"));
        assert!(context.contains("### Knowledge Gaps"));
        assert!(context.contains("### Tool Execution History"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut tracker = ProgressTracker::new();
        tracker.set_plan(&plan_with(&["a"]), StrategyKind::LightPlanning);
        tracker.record_tool_execution("t", &json!({"k": 1}), "r");

        let json = serde_json::to_string(&tracker).unwrap();
        let restored: ProgressTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.plan.as_ref().unwrap().steps.len(), 1);
        assert_eq!(restored.tool_executions.len(), 1);
    }
}
