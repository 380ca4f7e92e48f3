//! Query complexity analyzer.
//!
//! The triage component: classifies a query and recommends an
//! execution strategy before any real work happens.

use std::sync::Arc;
use tracing::{debug, error, info};

use nexus_llm::LlmProvider;

use crate::reasoning::parse;
use crate::reasoning::prompts;
use crate::reasoning::types::{ComplexityAnalysis, ComplexityLevel, StrategyKind};

const ANALYSIS_MAX_TOKENS: u32 = 1000;

/// Classifies query complexity via the LLM.
pub struct ComplexityAnalyzer {
    llm: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for ComplexityAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplexityAnalyzer").finish_non_exhaustive()
    }
}

impl ComplexityAnalyzer {
    /// Create an analyzer over the given provider.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Analyze a query and recommend a strategy.
    ///
    /// On LLM failure this falls back to MEDIUM / LIGHT_PLANNING with
    /// two iterations and confidence 0.0 — the zero confidence is the
    /// fallback marker.
    pub async fn analyze(
        &self,
        query: &str,
        available_tools: &[String],
        conversation_context: Option<&str>,
    ) -> ComplexityAnalysis {
        debug!(query = %truncate(query, 100), "Analyzing query complexity");

        let tools = if available_tools.is_empty() {
            "None".to_string()
        } else {
            available_tools.join(", ")
        };
        let context = conversation_context.unwrap_or("No prior context");
        let prompt = prompts::complexity_analysis(query, &tools, context);

        match self.llm.complete_simple(&prompt, ANALYSIS_MAX_TOKENS).await {
            Ok(response) => {
                let analysis = parse_analysis(&response);
                info!(
                    level = %analysis.level,
                    strategy = %analysis.recommended_strategy,
                    confidence = analysis.confidence,
                    "Complexity analysis"
                );
                analysis
            },
            Err(e) => {
                error!(error = %e, "Complexity analysis failed, using fallback");
                ComplexityAnalysis {
                    level: ComplexityLevel::Medium,
                    recommended_strategy: StrategyKind::LightPlanning,
                    estimated_iterations: 2,
                    confidence: 0.0,
                    rationale: format!("Analysis failed ({e}), defaulting to medium complexity"),
                    requires_research: false,
                    requires_synthesis: false,
                    multi_part_query: false,
                    tool_count_estimate: 0,
                }
            },
        }
    }
}

fn parse_analysis(response: &str) -> ComplexityAnalysis {
    let level = parse::labeled_field(response, "Complexity Level")
        .as_deref()
        .map(str::to_uppercase)
        .and_then(|v| match v.as_str() {
            s if s.contains("SIMPLE") => Some(ComplexityLevel::Simple),
            s if s.contains("COMPLEX") => Some(ComplexityLevel::Complex),
            s if s.contains("MEDIUM") => Some(ComplexityLevel::Medium),
            _ => None,
        })
        .unwrap_or(ComplexityLevel::Medium);

    let recommended_strategy = parse::labeled_field(response, "Recommended Strategy")
        .and_then(|v| StrategyKind::parse(&v))
        .unwrap_or(StrategyKind::LightPlanning);

    let estimated_iterations = parse::labeled_field(response, "Estimated Iterations")
        .and_then(|v| parse::leading_u32(&v))
        .unwrap_or(2)
        .max(1);

    let confidence = parse::labeled_field(response, "Confidence")
        .and_then(|v| parse::leading_f64(&v))
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let rationale = parse::section(response, "**Reasoning:**")
        .or_else(|| parse::labeled_field(response, "Reasoning"))
        .unwrap_or_else(|| "No rationale provided".to_string());

    let tool_count_estimate = parse::labeled_field(response, "Tool Count Estimate")
        .and_then(|v| parse::leading_u32(&v))
        .unwrap_or(0);

    ComplexityAnalysis {
        level,
        recommended_strategy,
        estimated_iterations,
        confidence,
        rationale,
        requires_research: response.contains("Requires Research: Yes"),
        requires_synthesis: response.contains("Requires Synthesis: Yes"),
        multi_part_query: response.contains("Multi-Part Query: Yes"),
        tool_count_estimate,
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
