//! Light planning: quick decomposition, one or two iterations.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use nexus_tools::ToolRegistry;

use crate::error::RuntimeResult;
use crate::executor::ToolLoopExecutor;
use crate::observer::ExecutionObserver;
use crate::reasoning::planner::{PlanMode, Planner};
use crate::reasoning::synthesizer::{SubtaskResult, Synthesizer};
use crate::reasoning::types::{ComplexityAnalysis, StrategyKind};
use crate::strategies::{build_plan_context, build_subtask_query, ExecutionStrategy};
use crate::tracker::{ProgressTracker, StepStatus};

/// Light planning execution for medium-complexity queries.
///
/// Generates at most two subtasks, skips steps already completed in the
/// tracker (their cached findings are reused), and synthesizes without
/// filtering. Falls back to direct execution when planning yields
/// nothing.
pub struct LightPlanningStrategy {
    planner: Arc<Planner>,
    synthesizer: Arc<Synthesizer>,
    registry: Arc<ToolRegistry>,
    executor: Arc<ToolLoopExecutor>,
}

impl std::fmt::Debug for LightPlanningStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightPlanningStrategy").finish_non_exhaustive()
    }
}

impl LightPlanningStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(
        planner: Arc<Planner>,
        synthesizer: Arc<Synthesizer>,
        registry: Arc<ToolRegistry>,
        executor: Arc<ToolLoopExecutor>,
    ) -> Self {
        Self {
            planner,
            synthesizer,
            registry,
            executor,
        }
    }

    async fn fallback_direct(
        &self,
        query: &str,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        warn!("Falling back to direct execution");
        self.executor.execute_tracked(query, tracker, observer).await
    }
}

#[async_trait]
impl ExecutionStrategy for LightPlanningStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LightPlanning
    }

    async fn execute(
        &self,
        query: &str,
        complexity: &ComplexityAnalysis,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        info!("Light planning execution");
        observer.on_light_planning().await;

        let plan_context = build_plan_context(
            complexity,
            self.registry.tool_names().await,
            tracker,
            PlanMode::Light,
        );
        let plan = self.planner.generate_plan(query, &plan_context).await;
        tracker.set_plan(&plan, StrategyKind::LightPlanning);

        observer.on_planning_complete(&plan, "light").await;

        if plan.subtasks.is_empty() {
            warn!("No subtasks generated");
            return self.fallback_direct(query, tracker, observer).await;
        }

        let max_iterations = complexity.estimated_iterations.clamp(1, 2);
        let mut accumulated: Vec<SubtaskResult> = Vec::new();

        for iteration in 0..max_iterations {
            let step = {
                let Some(plan) = tracker.plan.as_ref() else {
                    return self.fallback_direct(query, tracker, observer).await;
                };
                let Some(step) = plan.steps.get(iteration as usize) else {
                    break;
                };
                step.clone()
            };

            // Cached results from earlier attempts are reused, not
            // re-executed
            if step.status == StepStatus::Completed {
                debug!(step = %step.id, "Skipping completed step");
                accumulated.push(SubtaskResult {
                    query: step.description.clone(),
                    result: format!("[Cached] {}: {}", step.description, step.findings.join("; ")),
                    iteration,
                });
                continue;
            }

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
            debug!(iteration = iteration.saturating_add(1), max_iterations, "Light iteration");

            let subtask_query = build_subtask_query(&step, tracker);
            let result = self
                .executor
                .execute_tracked(&subtask_query, tracker, observer)
                .await?;

            accumulated.push(SubtaskResult {
                query: step.description.clone(),
                result: result.clone(),
                iteration,
            });

            tracker.update_step_status(&step.id, StepStatus::Completed, vec![result]);
            observer
                .on_step_progress(&step.id, StepStatus::Completed, &step.description)
                .await;
        }

        if accumulated.is_empty() {
            warn!("No results accumulated");
            return self.fallback_direct(query, tracker, observer).await;
        }

        if accumulated.len() == 1 {
            let mut accumulated = accumulated;
            return Ok(accumulated.swap_remove(0).result);
        }

        // Quick synthesis, no filtering pass
        Ok(self.synthesizer.synthesize(query, &accumulated).await)
    }
}
