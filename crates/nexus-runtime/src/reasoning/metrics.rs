//! Metrics for the adaptive reasoning loop.
//!
//! Tracks per-query execution records and keeps running aggregates:
//! strategy distribution, escalation patterns, quality statistics, and
//! latency percentiles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::reasoning::types::{ComplexityLevel, StrategyKind};

/// Record of a single query execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionMetrics {
    /// Monotonic query identifier.
    pub query_id: u64,
    /// When the execution finished.
    pub timestamp: DateTime<Utc>,
    /// The query, truncated for storage.
    pub query: String,
    /// Strategy the loop started with.
    pub initial_strategy: StrategyKind,
    /// Strategy that produced the final answer.
    pub final_strategy: StrategyKind,
    /// Complexity classification.
    pub complexity_level: ComplexityLevel,
    /// Wall time.
    pub execution_time: Duration,
    /// Whether any escalation happened.
    pub escalated: bool,
    /// Number of escalations.
    pub escalation_count: u32,
    /// Final quality score.
    pub final_quality_score: f64,
    /// Execution iterations.
    pub iterations: u32,
    /// Error text, when the query failed.
    pub error: Option<String>,
}

/// Running aggregates over all executions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateMetrics {
    /// Total executions recorded.
    pub total_executions: u64,
    /// Count per initial strategy.
    pub initial_strategy_counts: HashMap<String, u64>,
    /// Count per final strategy.
    pub final_strategy_counts: HashMap<String, u64>,
    /// Executions that escalated at least once.
    pub escalation_count: u64,
    /// Escalated fraction of all executions.
    pub escalation_rate: f64,
    /// Histogram of `INITIAL->FINAL` escalation patterns.
    pub escalation_patterns: HashMap<String, u64>,
    /// Mean quality score.
    pub avg_quality: f64,
    /// Minimum quality seen.
    pub min_quality: f64,
    /// Maximum quality seen.
    pub max_quality: f64,
    /// Mean latency in seconds.
    pub avg_latency_secs: f64,
    /// Median latency in seconds.
    pub p50_latency_secs: f64,
    /// 95th percentile latency (once 20+ samples exist).
    pub p95_latency_secs: f64,
    /// 99th percentile latency (once 20+ samples exist).
    pub p99_latency_secs: f64,
    /// Mean latency per final strategy.
    pub latency_by_strategy_secs: HashMap<String, f64>,
    /// Executions that errored.
    pub error_count: u64,
    /// Errored fraction of all executions.
    pub error_rate: f64,
}

#[derive(Debug, Default)]
struct CollectorState {
    executions: Vec<ExecutionMetrics>,
    quality_scores: Vec<f64>,
    latencies: Vec<f64>,
    latency_by_strategy: HashMap<String, Vec<f64>>,
    aggregate: AggregateMetrics,
    next_query_id: u64,
}

/// Collects and aggregates reasoning metrics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    state: Mutex<CollectorState>,
}

impl MetricsCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next query id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn next_query_id(&self) -> u64 {
        let mut state = self.state.lock().expect("lock poisoned");
        let id = state.next_query_id;
        state.next_query_id = state.next_query_id.saturating_add(1);
        id
    }

    /// Record a completed execution and update aggregates.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::arithmetic_side_effects)] // counters bounded by execution count
    pub fn record_execution(&self, metrics: ExecutionMetrics) {
        let mut state = self.state.lock().expect("lock poisoned");

        debug!(
            query_id = metrics.query_id,
            strategy = %metrics.final_strategy,
            quality = metrics.final_quality_score,
            "Recorded execution"
        );

        let latency = metrics.execution_time.as_secs_f64();
        let final_strategy = metrics.final_strategy.to_string();

        state.quality_scores.push(metrics.final_quality_score);
        state.latencies.push(latency);
        state
            .latency_by_strategy
            .entry(final_strategy.clone())
            .or_default()
            .push(latency);

        let aggregate = &mut state.aggregate;
        aggregate.total_executions = aggregate.total_executions.saturating_add(1);
        *aggregate
            .initial_strategy_counts
            .entry(metrics.initial_strategy.to_string())
            .or_default() += 1;
        *aggregate
            .final_strategy_counts
            .entry(final_strategy)
            .or_default() += 1;

        if metrics.escalated {
            aggregate.escalation_count = aggregate.escalation_count.saturating_add(1);
            let pattern = format!("{}->{}", metrics.initial_strategy, metrics.final_strategy);
            *aggregate.escalation_patterns.entry(pattern).or_default() += 1;
        }
        if metrics.error.is_some() {
            aggregate.error_count = aggregate.error_count.saturating_add(1);
        }

        let total = aggregate.total_executions as f64;
        aggregate.escalation_rate = aggregate.escalation_count as f64 / total;
        aggregate.error_rate = aggregate.error_count as f64 / total;

        state.executions.push(metrics);
        Self::recompute_distributions(&mut state);
    }

    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    #[allow(clippy::arithmetic_side_effects)] // float statistics over non-empty samples
    fn recompute_distributions(state: &mut CollectorState) {
        let qualities = state.quality_scores.clone();
        let latencies = state.latencies.clone();
        let by_strategy = state.latency_by_strategy.clone();
        let aggregate = &mut state.aggregate;

        if !qualities.is_empty() {
            aggregate.avg_quality = qualities.iter().sum::<f64>() / qualities.len() as f64;
            aggregate.min_quality = qualities.iter().copied().fold(f64::INFINITY, f64::min);
            aggregate.max_quality = qualities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        }

        if !latencies.is_empty() {
            aggregate.avg_latency_secs = latencies.iter().sum::<f64>() / latencies.len() as f64;

            let mut sorted = latencies;
            sorted.sort_by(f64::total_cmp);
            aggregate.p50_latency_secs = sorted[sorted.len() / 2];

            if sorted.len() >= 20 {
                let p95_index = ((sorted.len() as f64) * 0.95) as usize;
                let p99_index = ((sorted.len() as f64) * 0.99) as usize;
                aggregate.p95_latency_secs = sorted[p95_index.min(sorted.len() - 1)];
                aggregate.p99_latency_secs = sorted[p99_index.min(sorted.len() - 1)];
            }
        }

        aggregate.latency_by_strategy_secs = by_strategy
            .into_iter()
            .map(|(strategy, values)| {
                let mean = if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };
                (strategy, mean)
            })
            .collect();
    }

    /// Snapshot of the aggregates.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn aggregate(&self) -> AggregateMetrics {
        self.state.lock().expect("lock poisoned").aggregate.clone()
    }

    /// The most recent executions, newest last.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn recent_executions(&self, count: usize) -> Vec<ExecutionMetrics> {
        let state = self.state.lock().expect("lock poisoned");
        let start = state.executions.len().saturating_sub(count);
        state.executions[start..].to_vec()
    }

    /// Per-strategy effectiveness: `(mean quality, mean latency, count)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::arithmetic_side_effects)] // float means over non-empty samples
    pub fn strategy_analysis(&self) -> HashMap<String, (f64, f64, usize)> {
        let state = self.state.lock().expect("lock poisoned");
        let mut quality: HashMap<String, Vec<f64>> = HashMap::new();
        let mut latency: HashMap<String, Vec<f64>> = HashMap::new();

        for execution in &state.executions {
            let key = execution.final_strategy.to_string();
            quality
                .entry(key.clone())
                .or_default()
                .push(execution.final_quality_score);
            latency
                .entry(key)
                .or_default()
                .push(execution.execution_time.as_secs_f64());
        }

        quality
            .into_iter()
            .map(|(strategy, scores)| {
                let count = scores.len();
                let mean_quality = scores.iter().sum::<f64>() / count as f64;
                let mean_latency = latency
                    .get(&strategy)
                    .map_or(0.0, |l| l.iter().sum::<f64>() / l.len() as f64);
                (strategy, (mean_quality, mean_latency, count))
            })
            .collect()
    }

    /// Reset everything.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn reset(&self) {
        *self.state.lock().expect("lock poisoned") = CollectorState::default();
        debug!("Metrics reset");
    }
}
