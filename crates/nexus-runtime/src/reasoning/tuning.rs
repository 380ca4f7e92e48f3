//! Threshold tuning: predefined profiles and metric-driven advice.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::reasoning::config::ReasoningConfig;
use crate::reasoning::metrics::MetricsCollector;

/// A named threshold configuration profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    /// Profile name.
    pub name: String,
    /// What the profile optimizes for.
    pub description: String,
    /// Minimum quality for DIRECT responses.
    pub min_quality_direct: f64,
    /// Minimum quality for LIGHT_PLANNING responses.
    pub min_quality_light: f64,
    /// Minimum quality for DEEP_REASONING responses.
    pub min_quality_deep: f64,
    /// Iteration budget for deep reasoning.
    pub max_iterations: u32,
}

impl ThresholdProfile {
    /// Apply this profile onto a reasoning configuration.
    #[must_use]
    pub fn apply(&self, mut config: ReasoningConfig) -> ReasoningConfig {
        config.min_quality_direct = self.min_quality_direct;
        config.min_quality_light = self.min_quality_light;
        config.min_quality_deep = self.min_quality_deep;
        config.max_iterations = self.max_iterations;
        config
    }
}

/// The predefined profiles.
fn profiles() -> Vec<ThresholdProfile> {
    vec![
        ThresholdProfile {
            name: "strict".to_string(),
            description: "High quality standards, more escalations".to_string(),
            min_quality_direct: 0.80,
            min_quality_light: 0.85,
            min_quality_deep: 0.70,
            max_iterations: 5,
        },
        ThresholdProfile {
            name: "balanced".to_string(),
            description: "Balanced quality and performance".to_string(),
            min_quality_direct: 0.70,
            min_quality_light: 0.75,
            min_quality_deep: 0.60,
            max_iterations: 3,
        },
        ThresholdProfile {
            name: "permissive".to_string(),
            description: "Lower thresholds, faster responses".to_string(),
            min_quality_direct: 0.60,
            min_quality_light: 0.65,
            min_quality_deep: 0.50,
            max_iterations: 2,
        },
        ThresholdProfile {
            name: "production".to_string(),
            description: "Production-optimized settings".to_string(),
            min_quality_direct: 0.75,
            min_quality_light: 0.80,
            min_quality_deep: 0.65,
            max_iterations: 3,
        },
    ]
}

/// Analyzes metrics and recommends threshold adjustments.
pub struct ThresholdTuner {
    metrics: Arc<MetricsCollector>,
}

impl std::fmt::Debug for ThresholdTuner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdTuner").finish_non_exhaustive()
    }
}

impl ThresholdTuner {
    /// Create a tuner over a metrics collector.
    #[must_use]
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self { metrics }
    }

    /// A predefined profile by name.
    #[must_use]
    pub fn profile(name: &str) -> Option<ThresholdProfile> {
        profiles().into_iter().find(|p| p.name == name)
    }

    /// Names of all predefined profiles.
    #[must_use]
    pub fn profile_names() -> Vec<String> {
        profiles().into_iter().map(|p| p.name).collect()
    }

    /// Recommend a profile based on observed metrics.
    ///
    /// Low average quality suggests `strict`; high latency suggests
    /// `permissive`; otherwise `balanced`. With no data, `balanced`.
    #[must_use]
    pub fn recommend_profile(&self) -> ThresholdProfile {
        let aggregate = self.metrics.aggregate();

        let name = if aggregate.total_executions == 0 {
            "balanced"
        } else if aggregate.avg_quality < 0.75 {
            "strict"
        } else if aggregate.avg_latency_secs > 2.0 {
            "permissive"
        } else {
            "balanced"
        };

        Self::profile(name).unwrap_or_else(|| {
            // profiles() always contains "balanced"
            unreachable!("predefined profile set is fixed")
        })
    }

    /// Human-readable assessment of current thresholds against metrics.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // percentage formatting
    pub fn recommendations(&self, config: &ReasoningConfig) -> Vec<String> {
        let aggregate = self.metrics.aggregate();
        let mut recommendations = Vec::new();

        if aggregate.total_executions == 0 {
            recommendations
                .push("No executions recorded yet; run some queries first".to_string());
            return recommendations;
        }

        if aggregate.escalation_rate > 0.4 {
            recommendations.push(format!(
                "High escalation rate ({:.0}%): consider lowering quality thresholds by 0.05-0.10",
                aggregate.escalation_rate * 100.0
            ));
        }

        if aggregate.escalation_rate < 0.1 && aggregate.avg_quality < 0.75 {
            recommendations.push(format!(
                "Low escalation rate ({:.0}%) but quality below target: consider raising thresholds",
                aggregate.escalation_rate * 100.0
            ));
        }

        if aggregate.avg_latency_secs > 2.0 {
            recommendations.push(format!(
                "High average latency ({:.2}s): consider the 'permissive' profile or fewer iterations (currently {})",
                aggregate.avg_latency_secs, config.max_iterations
            ));
        }

        if aggregate.avg_quality < 0.7 {
            recommendations.push(format!(
                "Quality below 0.7 (avg {:.2}): raise thresholds or improve prompts",
                aggregate.avg_quality
            ));
        }

        if recommendations.is_empty() {
            recommendations.push(format!(
                "Thresholds look well-tuned (escalation {:.0}%, avg quality {:.2})",
                aggregate.escalation_rate * 100.0,
                aggregate.avg_quality
            ));
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::metrics::ExecutionMetrics;
    use crate::reasoning::types::{ComplexityLevel, StrategyKind};
    use chrono::Utc;
    use std::time::Duration;

    fn record(collector: &MetricsCollector, quality: f64, secs: f64) {
        collector.record_execution(ExecutionMetrics {
            query_id: 0,
            timestamp: Utc::now(),
            query: "q".to_string(),
            initial_strategy: StrategyKind::Direct,
            final_strategy: StrategyKind::Direct,
            complexity_level: ComplexityLevel::Simple,
            execution_time: Duration::from_secs_f64(secs),
            escalated: false,
            escalation_count: 0,
            final_quality_score: quality,
            iterations: 1,
            error: None,
        });
    }

    #[test]
    fn test_profiles_exist() {
        for name in ["strict", "balanced", "permissive", "production"] {
            let profile = ThresholdTuner::profile(name).unwrap();
            assert_eq!(profile.name, name);
        }
        assert!(ThresholdTuner::profile("unknown").is_none());
        assert_eq!(ThresholdTuner::profile_names().len(), 4);
    }

    #[test]
    fn test_profile_apply() {
        let profile = ThresholdTuner::profile("strict").unwrap();
        let config = profile.apply(ReasoningConfig::default());
        assert!((config.min_quality_direct - 0.80).abs() < 1e-9);
        assert!((config.min_quality_light - 0.85).abs() < 1e-9);
        assert!((config.min_quality_deep - 0.70).abs() < 1e-9);
        assert_eq!(config.max_iterations, 5);
    }

    #[test]
    fn test_recommendation_defaults_to_balanced() {
        let tuner = ThresholdTuner::new(Arc::new(MetricsCollector::new()));
        assert_eq!(tuner.recommend_profile().name, "balanced");
    }

    #[test]
    fn test_low_quality_recommends_strict() {
        let collector = Arc::new(MetricsCollector::new());
        record(&collector, 0.5, 0.5);
        let tuner = ThresholdTuner::new(collector);
        assert_eq!(tuner.recommend_profile().name, "strict");
    }

    #[test]
    fn test_high_latency_recommends_permissive() {
        let collector = Arc::new(MetricsCollector::new());
        record(&collector, 0.9, 5.0);
        let tuner = ThresholdTuner::new(collector);
        assert_eq!(tuner.recommend_profile().name, "permissive");
    }

    #[test]
    fn test_recommendations_with_no_data() {
        let tuner = ThresholdTuner::new(Arc::new(MetricsCollector::new()));
        let recs = tuner.recommendations(&ReasoningConfig::default());
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("No executions"));
    }
}
