//! Direct execution: the fast path.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::RuntimeResult;
use crate::executor::ToolLoopExecutor;
use crate::observer::ExecutionObserver;
use crate::reasoning::types::{ComplexityAnalysis, StrategyKind};
use crate::strategies::ExecutionStrategy;
use crate::tracker::ProgressTracker;

/// Single-pass execution with no planning overhead.
///
/// On an escalation retry (more than one attempt in the tracker) the
/// compact tracker digest is prepended so the model knows what already
/// failed.
pub struct DirectStrategy {
    executor: Arc<ToolLoopExecutor>,
}

impl std::fmt::Debug for DirectStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectStrategy").finish_non_exhaustive()
    }
}

impl DirectStrategy {
    /// Create the strategy.
    #[must_use]
    pub fn new(executor: Arc<ToolLoopExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ExecutionStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    async fn execute(
        &self,
        query: &str,
        _complexity: &ComplexityAnalysis,
        tracker: &mut ProgressTracker,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        info!("Direct execution (fast-path)");
        observer.on_direct_execution().await;

        let enhanced_query = if tracker.attempts.len() > 1 {
            // Retry after a failed attempt: give the model the digest
            debug!("Adding compact tracker context to direct execution");
            format!(
                "{query}\n\n[Previous attempt context: {}]",
                tracker.to_compact_context()
            )
        } else {
            query.to_string()
        };

        let result = self
            .executor
            .execute_tracked(&enhanced_query, tracker, observer)
            .await?;

        info!(chars = result.len(), "Direct execution complete");
        Ok(result)
    }
}
