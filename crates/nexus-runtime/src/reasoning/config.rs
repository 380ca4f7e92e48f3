//! Configuration for the reasoning components.

use crate::reasoning::types::StrategyKind;

/// Tunable knobs for the adaptive reasoning loop and its components.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    /// Iteration budget for deep reasoning.
    pub max_iterations: u32,

    /// Minimum quality for DIRECT responses.
    pub min_quality_direct: f64,
    /// Minimum quality for LIGHT_PLANNING responses.
    pub min_quality_light: f64,
    /// Minimum quality for DEEP_REASONING responses. Lower than the
    /// others: deep is the terminal option, its result is returned
    /// either way.
    pub min_quality_deep: f64,

    /// Maximum subtasks in a deep plan.
    pub max_subtasks: usize,

    /// Maximum assistant/tool rounds per tracked execution.
    pub max_tool_rounds: u32,
    /// Token budget for answer generation.
    pub answer_max_tokens: u32,

    /// Skip the analyzer and force a strategy. Both routing paths of
    /// the loop exist behind this switch: `None` always analyzes,
    /// `Some` never does.
    pub force_strategy: Option<StrategyKind>,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_quality_direct: 0.6,
            min_quality_light: 0.7,
            min_quality_deep: 0.5,
            max_subtasks: 5,
            max_tool_rounds: 8,
            answer_max_tokens: 4096,
            force_strategy: None,
        }
    }
}

impl ReasoningConfig {
    /// The quality threshold for a strategy.
    #[must_use]
    pub fn quality_threshold(&self, strategy: StrategyKind) -> f64 {
        match strategy {
            StrategyKind::Direct => self.min_quality_direct,
            StrategyKind::LightPlanning => self.min_quality_light,
            StrategyKind::DeepReasoning => self.min_quality_deep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = ReasoningConfig::default();
        assert!((config.quality_threshold(StrategyKind::Direct) - 0.6).abs() < 1e-9);
        assert!((config.quality_threshold(StrategyKind::LightPlanning) - 0.7).abs() < 1e-9);
        assert!((config.quality_threshold(StrategyKind::DeepReasoning) - 0.5).abs() < 1e-9);
    }
}
