//! The adaptive reasoning loop: analyze, execute, evaluate, escalate.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

use nexus_approval::{ApprovalManager, ApprovalRequest};
use nexus_llm::LlmProvider;
use nexus_tools::ToolRegistry;

use crate::conversation::Conversation;
use crate::error::{RuntimeError, RuntimeResult};
use crate::executor::{ExecutorConfig, ToolLoopExecutor};
use crate::observer::ExecutionObserver;
use crate::reasoning::analyzer::ComplexityAnalyzer;
use crate::reasoning::config::ReasoningConfig;
use crate::reasoning::evaluator::Evaluator;
use crate::reasoning::metrics::{ExecutionMetrics, MetricsCollector};
use crate::reasoning::planner::Planner;
use crate::reasoning::synthesizer::Synthesizer;
use crate::reasoning::types::{ComplexityAnalysis, ComplexityLevel, StrategyKind};
use crate::strategies::{
    DeepReasoningStrategy, DirectStrategy, ExecutionStrategy, LightPlanningStrategy,
};
use crate::tracker::ProgressTracker;

/// Orchestrates query execution with quality-driven escalation.
///
/// Per query: create a tracker, analyze complexity (unless a strategy
/// is forced), optionally have the user approve the analysis, execute
/// the selected strategy, evaluate the response's quality against the
/// strategy's threshold, and escalate `DIRECT -> LIGHT_PLANNING ->
/// DEEP_REASONING` while quality stays insufficient. Deep reasoning is
/// terminal: its result is returned even below threshold.
pub struct AdaptiveReasoningLoop {
    analyzer: ComplexityAnalyzer,
    evaluator: Arc<Evaluator>,
    approval: Option<Arc<ApprovalManager>>,
    config: ReasoningConfig,
    metrics: Arc<MetricsCollector>,
    conversation: Arc<Mutex<Conversation>>,
    registry: Arc<ToolRegistry>,
    direct: DirectStrategy,
    light: LightPlanningStrategy,
    deep: DeepReasoningStrategy,
}

impl std::fmt::Debug for AdaptiveReasoningLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveReasoningLoop")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AdaptiveReasoningLoop {
    /// Wire up the loop and all reasoning components.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        conversation: Arc<Mutex<Conversation>>,
        config: ReasoningConfig,
        approval: Option<Arc<ApprovalManager>>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let mut executor = ToolLoopExecutor::new(
            Arc::clone(&llm),
            Arc::clone(&registry),
            Arc::clone(&conversation),
            ExecutorConfig {
                max_tokens: config.answer_max_tokens,
                max_tool_rounds: config.max_tool_rounds,
            },
        );
        if let Some(approval) = &approval {
            executor = executor.with_approval(Arc::clone(approval));
        }
        let executor = Arc::new(executor);

        let planner = Arc::new(Planner::new(Arc::clone(&llm), config.clone()));
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&llm)));
        let synthesizer = Arc::new(Synthesizer::new(Arc::clone(&llm)));

        Self {
            analyzer: ComplexityAnalyzer::new(Arc::clone(&llm)),
            evaluator: Arc::clone(&evaluator),
            approval,
            direct: DirectStrategy::new(Arc::clone(&executor)),
            light: LightPlanningStrategy::new(
                Arc::clone(&planner),
                Arc::clone(&synthesizer),
                Arc::clone(&registry),
                Arc::clone(&executor),
            ),
            deep: DeepReasoningStrategy::new(
                planner,
                Arc::clone(&evaluator),
                synthesizer,
                Arc::clone(&registry),
                executor,
                config.max_iterations,
            ),
            config,
            metrics: Arc::clone(&metrics),
            conversation,
            registry,
        }
    }

    /// The conversation state the loop reads and writes.
    #[must_use]
    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    /// The metrics collector.
    #[must_use]
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// Execute one query through the full adaptive cycle.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Cancelled`] when the user rejects the
    /// analysis, and propagates LLM API failures from execution.
    pub async fn run(
        &self,
        query: &str,
        observer: &dyn ExecutionObserver,
    ) -> RuntimeResult<String> {
        let query_id = self.metrics.next_query_id();
        let started = Instant::now();
        let mut tracker = ProgressTracker::new();

        // Step 1: analysis (or the configured shortcut around it)
        let analysis = match self.config.force_strategy {
            Some(strategy) => {
                info!(strategy = %strategy, "Strategy forced by configuration");
                ComplexityAnalysis::assumed(strategy)
            },
            None => {
                let tool_names = self.registry.tool_names().await;
                self.analyzer.analyze(query, &tool_names, None).await
            },
        };

        // Step 2: optional user sign-off on the analysis
        let mut strategy = analysis.recommended_strategy;
        if let Some(override_strategy) = self.approve_analysis(query, &analysis).await? {
            strategy = override_strategy;
        }

        let initial_strategy = strategy;
        let mut escalation_count: u32 = 0;
        let mut iterations: u32 = 0;

        // Steps 3-7: execute, evaluate, escalate
        loop {
            info!(query_id, strategy = %strategy, "Executing strategy");
            let attempt_index = tracker.start_attempt(strategy);
            let attempt_started = Instant::now();

            let response = self
                .strategy_for(strategy)
                .execute(query, &analysis, &mut tracker, observer)
                .await?;
            iterations = iterations.saturating_add(1);

            let evaluation = self
                .evaluator
                .evaluate_response_quality(query, &response, strategy, Some(&analysis))
                .await;
            let quality = evaluation.confidence;
            let sufficient = evaluation.is_complete;
            let threshold = self.config.quality_threshold(strategy);

            tracker.insights.add_from_evaluation(&evaluation);
            tracker.complete_attempt(
                attempt_index,
                quality,
                evaluation,
                attempt_started.elapsed(),
            );

            let passed = sufficient && quality >= threshold;
            info!(
                query_id,
                strategy = %strategy,
                quality,
                threshold,
                passed,
                "Quality evaluation"
            );

            if passed {
                self.record(
                    query_id,
                    query,
                    initial_strategy,
                    strategy,
                    analysis.level,
                    started,
                    escalation_count,
                    quality,
                    iterations,
                );
                return Ok(response);
            }

            match strategy.next() {
                Some(next) => {
                    warn!(
                        query_id,
                        from = %strategy,
                        to = %next,
                        quality,
                        "Escalating after insufficient quality"
                    );
                    escalation_count = escalation_count.saturating_add(1);
                    strategy = next;
                },
                None => {
                    // Deep is terminal: accept its result regardless
                    warn!(query_id, quality, "Deep reasoning below threshold, accepting result");
                    self.record(
                        query_id,
                        query,
                        initial_strategy,
                        strategy,
                        analysis.level,
                        started,
                        escalation_count,
                        quality,
                        iterations,
                    );
                    return Ok(response);
                },
            }
        }
    }

    fn strategy_for(&self, kind: StrategyKind) -> &dyn ExecutionStrategy {
        match kind {
            StrategyKind::Direct => &self.direct,
            StrategyKind::LightPlanning => &self.light,
            StrategyKind::DeepReasoning => &self.deep,
        }
    }

    /// Ask the user to approve the analysis, when configured.
    ///
    /// Returns an optional strategy override. A denial aborts the
    /// query.
    async fn approve_analysis(
        &self,
        query: &str,
        analysis: &ComplexityAnalysis,
    ) -> RuntimeResult<Option<StrategyKind>> {
        let Some(approval) = &self.approval else {
            return Ok(None);
        };
        if !approval.config().require_query_analysis_approval {
            return Ok(None);
        }
        if approval.config().auto_approve_simple_queries && analysis.level == ComplexityLevel::Simple
        {
            return Ok(None);
        }

        let mut details = serde_json::Map::new();
        details.insert(
            "complexity_level".to_string(),
            Value::String(analysis.level.to_string()),
        );
        details.insert(
            "recommended_strategy".to_string(),
            Value::String(analysis.recommended_strategy.to_string()),
        );
        details.insert(
            "estimated_iterations".to_string(),
            Value::from(analysis.estimated_iterations),
        );
        details.insert("confidence".to_string(), Value::from(analysis.confidence));
        details.insert(
            "rationale".to_string(),
            Value::String(analysis.rationale.clone()),
        );

        let request = ApprovalRequest::query_analysis(
            format!("Execute with {}?", analysis.recommended_strategy),
            details,
        );
        let response = approval.request_approval(request).await?;

        if !response.approved {
            let reason = if response.is_cancelled() {
                "analysis approval cancelled".to_string()
            } else {
                "analysis rejected by user".to_string()
            };
            info!(query = %query.chars().take(50).collect::<String>(), reason, "Query aborted at analysis");
            return Err(RuntimeError::Cancelled { reason });
        }

        // An approval may still override the routing
        if response
            .metadata
            .get("use_reasoning")
            .and_then(Value::as_bool)
            == Some(false)
        {
            return Ok(Some(StrategyKind::Direct));
        }

        let override_strategy = response
            .metadata
            .get("selected_strategy")
            .and_then(Value::as_str)
            .and_then(StrategyKind::parse);
        Ok(override_strategy)
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        query_id: u64,
        query: &str,
        initial_strategy: StrategyKind,
        final_strategy: StrategyKind,
        complexity_level: ComplexityLevel,
        started: Instant,
        escalation_count: u32,
        final_quality_score: f64,
        iterations: u32,
    ) {
        self.metrics.record_execution(ExecutionMetrics {
            query_id,
            timestamp: chrono::Utc::now(),
            query: query.chars().take(100).collect(),
            initial_strategy,
            final_strategy,
            complexity_level,
            execution_time: started.elapsed(),
            escalated: escalation_count > 0,
            escalation_count,
            final_quality_score,
            iterations,
            error: None,
        });
    }
}
