//! Value types shared by the reasoning components.

use serde::{Deserialize, Serialize};

/// An execution strategy over the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    /// Single LLM call, no planning.
    Direct,
    /// Quick decomposition, at most two subtasks.
    LightPlanning,
    /// Full plan-execute-evaluate cycle.
    DeepReasoning,
}

impl StrategyKind {
    /// The next, more expensive strategy; `None` past deep reasoning.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Direct => Some(Self::LightPlanning),
            Self::LightPlanning => Some(Self::DeepReasoning),
            Self::DeepReasoning => None,
        }
    }

    /// Parse from the wire form used in prompts and overrides.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "DIRECT" => Some(Self::Direct),
            "LIGHT_PLANNING" => Some(Self::LightPlanning),
            "DEEP_REASONING" => Some(Self::DeepReasoning),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Direct => "DIRECT",
            Self::LightPlanning => "LIGHT_PLANNING",
            Self::DeepReasoning => "DEEP_REASONING",
        };
        f.write_str(s)
    }
}

/// Query complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityLevel {
    /// Common knowledge plus at most a tool call or two.
    Simple,
    /// Benefits from light structure.
    Medium,
    /// Needs research, synthesis, or multiple iterations.
    Complex,
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Simple => "SIMPLE",
            Self::Medium => "MEDIUM",
            Self::Complex => "COMPLEX",
        };
        f.write_str(s)
    }
}

/// Result of complexity analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    /// Classified complexity level.
    pub level: ComplexityLevel,
    /// Recommended execution strategy.
    pub recommended_strategy: StrategyKind,
    /// Estimated execution iterations (at least 1).
    pub estimated_iterations: u32,
    /// Analyzer confidence in [0, 1]. Zero flags the fallback path.
    pub confidence: f64,
    /// Why the analyzer decided this.
    pub rationale: String,
    /// Whether the query needs research.
    pub requires_research: bool,
    /// Whether the query needs synthesis across sources.
    pub requires_synthesis: bool,
    /// Whether the query asks several things at once.
    pub multi_part_query: bool,
    /// Rough number of tool calls expected.
    pub tool_count_estimate: u32,
}

impl ComplexityAnalysis {
    /// An analysis representing a forced strategy, bypassing the LLM.
    #[must_use]
    pub fn assumed(strategy: StrategyKind) -> Self {
        let level = match strategy {
            StrategyKind::Direct => ComplexityLevel::Simple,
            StrategyKind::LightPlanning => ComplexityLevel::Medium,
            StrategyKind::DeepReasoning => ComplexityLevel::Complex,
        };
        Self {
            level,
            recommended_strategy: strategy,
            estimated_iterations: 1,
            confidence: 1.0,
            rationale: "strategy forced by configuration".to_string(),
            requires_research: false,
            requires_synthesis: false,
            multi_part_query: false,
            tool_count_estimate: 0,
        }
    }
}

/// A unit of work within a research plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    /// What to do.
    pub query: String,
    /// Priority: 1 (high) to 3 (low).
    pub priority: u8,
    /// Tools the planner suggests for this subtask.
    pub tool_hints: Option<Vec<String>>,
}

/// Overall plan complexity, derived from subtask count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanComplexity {
    /// One subtask or fewer.
    Low,
    /// Two or three subtasks.
    Medium,
    /// More than three subtasks.
    High,
}

impl PlanComplexity {
    /// Derive from a subtask count.
    #[must_use]
    pub fn from_subtask_count(count: usize) -> Self {
        match count {
            0 | 1 => Self::Low,
            2 | 3 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// An execution plan: ordered subtasks plus iteration budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// The query this plan answers.
    pub original_query: String,
    /// Subtasks ordered by priority.
    pub subtasks: Vec<SubTask>,
    /// Iteration budget for executing the plan.
    pub max_iterations: u32,
    /// Derived complexity estimate.
    pub estimated_complexity: PlanComplexity,
    /// The complexity analysis that led here, when available.
    pub complexity_analysis: Option<ComplexityAnalysis>,
}

/// Result of a research or quality evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Research: material answers the query. Quality: response is
    /// sufficient.
    pub is_complete: bool,
    /// Confidence / quality score in [0, 1].
    pub confidence: f64,
    /// The evaluator's explanation.
    pub reasoning: String,
    /// Follow-up queries that would close the gaps.
    pub additional_queries: Vec<String>,
    /// What is missing or inadequate.
    pub missing_aspects: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_order() {
        assert_eq!(StrategyKind::Direct.next(), Some(StrategyKind::LightPlanning));
        assert_eq!(
            StrategyKind::LightPlanning.next(),
            Some(StrategyKind::DeepReasoning)
        );
        assert_eq!(StrategyKind::DeepReasoning.next(), None);
    }

    #[test]
    fn test_strategy_parse_roundtrip() {
        for kind in [
            StrategyKind::Direct,
            StrategyKind::LightPlanning,
            StrategyKind::DeepReasoning,
        ] {
            assert_eq!(StrategyKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(StrategyKind::parse("nonsense"), None);
    }

    #[test]
    fn test_plan_complexity_buckets() {
        assert_eq!(PlanComplexity::from_subtask_count(0), PlanComplexity::Low);
        assert_eq!(PlanComplexity::from_subtask_count(1), PlanComplexity::Low);
        assert_eq!(PlanComplexity::from_subtask_count(3), PlanComplexity::Medium);
        assert_eq!(PlanComplexity::from_subtask_count(4), PlanComplexity::High);
    }
}
