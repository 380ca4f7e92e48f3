//! Deep reasoning: the full plan-execute-evaluate cycle.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use nexus_tools::ToolRegistry;

use crate::error::RuntimeResult;
use crate::executor::ToolLoopExecutor;
use crate::observer::ExecutionObserver;
use crate::reasoning::evaluator::Evaluator;
use crate::reasoning::planner::{PlanMode, Planner};
use crate::reasoning::synthesizer::{SubtaskResult, Synthesizer};
use crate::reasoning::types::{ComplexityAnalysis, StrategyKind};
use crate::strategies::{
    build_plan_context, build_subtask_query_with_full_context, ExecutionStrategy,
};
use crate::tracker::{ProgressTracker, StepStatus};

/// Comprehensive planning with per-iteration evaluation and dynamic
/// plan growth.
///
/// Each iteration executes the next pending step with full tracker
/// context, then asks the evaluator whether the accumulated material
/// answers the query. Incomplete evaluations can stage additional
/// queries as dynamic steps (linked via `spawned_from`). Results are
/// filtered and synthesized at the end. This is the terminal
/// escalation level.
pub struct DeepReasoningStrategy {
    planner: Arc<Planner>,
    evaluator: Arc<Evaluator>,
    synthesizer: Arc<Synthesizer>,
    registry: Arc<ToolRegistry>,
    executor: Arc<ToolLoopExecutor>,
    max_iterations: u32,
}

impl std::fmt::Debug for DeepReasoningStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepReasoningStrategy")
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl DeepReasoningStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(
        planner: Arc<Planner>,
        evaluator: Arc<Evaluator>,
        synthesizer: Arc<Synthesizer>,
        registry: Arc<ToolRegistry>,
        executor: Arc<ToolLoopExecutor>,
        max_iterations: u32,
    ) -> Self {
        Self {
            planner,
            evaluator,
            synthesizer,
            registry,
            executor,
            max_iterations,
        }
    }
}

#[async_trait]
impl ExecutionStrategy for DeepReasoningStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DeepReasoning
    }

    async fn execute(
        &self,
        query: &str,
        complexity: &ComplexityAnalysis,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        info!("Deep reasoning execution");
        observer.on_deep_reasoning().await;

        // Phase 1: planning with full tracker context
        info!(query = %query.chars().take(100).collect::<String>(), "Planning phase");
        observer.on_planning().await;

        let plan_context = build_plan_context(
            complexity,
            self.registry.tool_names().await,
            tracker,
            PlanMode::Deep,
        );
        let mut plan = self.planner.generate_plan(query, &plan_context).await;
        plan.complexity_analysis = Some(complexity.clone());
        info!(subtasks = plan.subtasks.len(), "Plan generated");

        tracker.set_plan(&plan, StrategyKind::DeepReasoning);
        observer.on_planning_complete(&plan, "deep").await;

        // Phase 2: iterative execution with evaluation
        let mut accumulated: Vec<SubtaskResult> = Vec::new();
        let mut executed_queries: Vec<String> = Vec::new();

        let step_count = tracker.plan.as_ref().map_or(0, |p| p.steps.len());
        let max_iterations = self
            .max_iterations
            .min(u32::try_from(step_count).unwrap_or(u32::MAX));

        for iteration in 0..max_iterations {
            info!(
                iteration = iteration.saturating_add(1),
                max_iterations, "Deep iteration"
            );

            let step = {
                let Some(plan) = tracker.plan.as_ref() else {
                    break;
                };
                let Some(step) = plan.pending_steps().first().map(|s| (*s).clone()) else {
                    break;
                };
                step
            };

            tracker.update_step_status(&step.id, StepStatus::InProgress, vec![]);
            observer
                .on_step_progress(&step.id, StepStatus::InProgress, &step.description)
                .await;
            observer
                .on_iteration(
                    iteration.saturating_add(1),
                    max_iterations,
                    &step.description,
                )
                .await;

            let subtask_query = build_subtask_query_with_full_context(&step, tracker);
            debug!(step = %step.id, "Executing subtask");

            let result = self
                .executor
                .execute_tracked(&subtask_query, tracker, observer)
                .await?;

            accumulated.push(SubtaskResult {
                query: step.description.clone(),
                result: result.clone(),
                iteration,
            });
            executed_queries.push(step.description.clone());

            tracker.update_step_status(&step.id, StepStatus::Completed, vec![result]);
            observer
                .on_step_progress(&step.id, StepStatus::Completed, &step.description)
                .await;

            // Phase 3: evaluate completeness
            info!("Evaluating completeness");
            observer.on_evaluation().await;

            let evaluation = self
                .evaluator
                .evaluate_research(query, &accumulated, &plan)
                .await;
            info!(
                complete = evaluation.is_complete,
                confidence = evaluation.confidence,
                "Research evaluation"
            );

            tracker.insights.add_from_evaluation(&evaluation);

            if evaluation.is_complete {
                info!("Query fully answered, proceeding to synthesis");
                break;
            }

            // Phase 4: stage follow-up queries as dynamic steps
            let last_iteration = iteration.saturating_add(1) == max_iterations;
            if !evaluation.additional_queries.is_empty() && !last_iteration {
                info!(
                    count = evaluation.additional_queries.len(),
                    "Adding dynamic steps from evaluation"
                );
                for additional in &evaluation.additional_queries {
                    if !executed_queries.contains(additional) {
                        tracker.add_dynamic_step(additional.clone(), &step.id);
                    }
                }
            }
        }

        // Phase 5: filter and synthesize
        info!("Synthesizing final answer");
        observer.on_synthesis().await;

        let filtered = self.synthesizer.filter_results(query, accumulated).await;
        let answer = self.synthesizer.synthesize(query, &filtered).await;

        if answer.is_empty() {
            warn!("Deep reasoning produced an empty answer");
        }
        info!(chars = answer.len(), "Deep reasoning complete");
        Ok(answer)
    }
}
