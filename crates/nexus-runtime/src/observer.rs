//! Observability hooks for strategy execution.

use async_trait::async_trait;
use serde_json::Value;

use crate::reasoning::types::ResearchPlan;
use crate::tracker::StepStatus;

/// Callbacks invoked at phase boundaries during query execution.
///
/// All methods default to no-ops; frontends override what they care
/// about. Implementations may do async work — the runtime awaits each
/// hook — but should return quickly.
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    /// Direct (fast-path) execution is starting.
    async fn on_direct_execution(&self) {}

    /// Light planning execution is starting.
    async fn on_light_planning(&self) {}

    /// Deep reasoning execution is starting.
    async fn on_deep_reasoning(&self) {}

    /// The planning phase is starting.
    async fn on_planning(&self) {}

    /// A plan has been generated.
    async fn on_planning_complete(&self, plan: &ResearchPlan, mode: &str) {
        let _ = (plan, mode);
    }

    /// An execution iteration is starting.
    async fn on_iteration(&self, iteration: u32, max_iterations: u32, description: &str) {
        let _ = (iteration, max_iterations, description);
    }

    /// A plan step changed status.
    async fn on_step_progress(&self, step_id: &str, status: StepStatus, description: &str) {
        let _ = (step_id, status, description);
    }

    /// Research evaluation is starting.
    async fn on_evaluation(&self) {}

    /// Synthesis is starting.
    async fn on_synthesis(&self) {}

    /// A tool is about to be executed.
    async fn on_tool_call(&self, tool: &str, arguments: &Value) {
        let _ = (tool, arguments);
    }

    /// A tool finished executing.
    async fn on_tool_result(&self, tool: &str, preview: &str, success: bool) {
        let _ = (tool, preview, success);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl ExecutionObserver for NoopObserver {}
