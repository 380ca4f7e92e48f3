//! Execution strategies: direct, light planning, deep reasoning.

mod deep;
mod direct;
mod light;

pub use deep::DeepReasoningStrategy;
pub use direct::DirectStrategy;
pub use light::LightPlanningStrategy;

use async_trait::async_trait;

use crate::error::RuntimeResult;
use crate::observer::ExecutionObserver;
use crate::reasoning::planner::{AttemptSummary, PlanContext, PlanMode};
use crate::reasoning::types::{ComplexityAnalysis, StrategyKind};
use crate::tracker::{PlanStep, ProgressTracker};

/// Common contract for all execution strategies.
///
/// `execute` returns the buffered response text; quality checking is
/// the loop's job, not the strategy's.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Execute the query under this strategy.
    ///
    /// # Errors
    ///
    /// Propagates LLM API failures from the underlying executor.
    async fn execute(
        &self,
        query: &str,
        complexity: &ComplexityAnalysis,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String>;
}

/// Build the planner context from the tracker's accumulated state.
///
/// Refinement data (previous attempts, completed steps, knowledge gaps)
/// is only attached when the tracker already holds prior work.
pub(crate) fn build_plan_context(
    complexity: &ComplexityAnalysis,
    tool_names: Vec<String>,
    tracker: &ProgressTracker,
    mode: PlanMode,
) -> PlanContext {
    let mut context = PlanContext::new(mode, tool_names);
    context.complexity = Some(format!(
        "{} ({} iterations estimated)",
        complexity.level, complexity.estimated_iterations
    ));

    if !tracker.has_prior_work() {
        return context;
    }

    if tracker.attempts.len() > 1 {
        context.previous_attempts = tracker
            .attempts
            .iter()
            .take(tracker.attempts.len().saturating_sub(1))
            .map(|attempt| AttemptSummary {
                strategy: attempt.strategy.to_string(),
                quality: attempt.quality_score,
                evaluation: attempt
                    .evaluation
                    .as_ref()
                    .map(|evaluation| evaluation.reasoning.clone()),
            })
            .collect();
    }

    context.knowledge_gaps = tracker.insights.knowledge_gaps().to_vec();

    if let Some(plan) = &tracker.plan {
        context.completed_steps = plan
            .completed_steps()
            .iter()
            .map(|step| step.description.clone())
            .collect();
    }

    context
}

/// Build a subtask query enriched with recent findings and gaps.
///
/// Used by light planning: the last up-to-three completed steps'
/// findings and up to three knowledge gaps are appended.
pub(crate) fn build_subtask_query(step: &PlanStep, tracker: &ProgressTracker) -> String {
    let mut query = step.description.clone();

    if let Some(plan) = &tracker.plan {
        let completed = plan.completed_steps();
        if !completed.is_empty() {
            let recent = completed
                .iter()
                .rev()
                .take(3)
                .rev()
                .map(|s| format!("- {}: {}", s.description, s.findings.join("; ")))
                .collect::<Vec<_>>()
                .join("\n");
            query.push_str(&format!(
                "\n\nRelevant findings from previous steps:\n{recent}"
            ));
        }
    }

    let gaps = tracker.insights.knowledge_gaps();
    if !gaps.is_empty() {
        let listed = gaps
            .iter()
            .take(3)
            .map(|gap| format!("- {gap}"))
            .collect::<Vec<_>>()
            .join("\n");
        query.push_str(&format!(
            "\n\nAddress these knowledge gaps if relevant:\n{listed}"
        ));
    }

    query
}

/// Build a subtask query with the full tracker context block.
///
/// Used by deep reasoning; the context includes prior attempts, plan
/// progress, gaps, and the tool-execution history so the model avoids
/// redundant calls.
pub(crate) fn build_subtask_query_with_full_context(
    step: &PlanStep,
    tracker: &ProgressTracker,
) -> String {
    let context = tracker.to_context_text(StrategyKind::DeepReasoning);
    format!(
        "{}\n\n{context}\n\nFocus on addressing the identified knowledge gaps and building upon \
         completed work.\nAvoid redundant tool calls - check the tool execution history above.",
        step.description
    )
}
