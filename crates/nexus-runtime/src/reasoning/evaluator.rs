//! Dual-purpose evaluation: research completeness and response quality.

use std::sync::Arc;
use tracing::{debug, error, info};

use nexus_llm::LlmProvider;

use crate::reasoning::parse;
use crate::reasoning::prompts;
use crate::reasoning::synthesizer::SubtaskResult;
use crate::reasoning::types::{ComplexityAnalysis, EvaluationResult, ResearchPlan, StrategyKind};

const EVALUATION_MAX_TOKENS: u32 = 1000;
const RESPONSE_TRUNCATION: usize = 2000;

/// Evaluates research completeness and response quality via the LLM.
///
/// Both paths fall back to safe defaults on LLM failure, chosen to
/// avoid deadlock: research evaluation assumes "not complete" so deep
/// reasoning keeps working, quality evaluation assumes "sufficient" so
/// the loop never escalates forever on a broken evaluator.
pub struct Evaluator {
    llm: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}

impl Evaluator {
    /// Create an evaluator.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Does the accumulated material answer the query?
    pub async fn evaluate_research(
        &self,
        query: &str,
        results: &[SubtaskResult],
        plan: &ResearchPlan,
    ) -> EvaluationResult {
        debug!(query = %query.chars().take(100).collect::<String>(), "Evaluating research completeness");

        let results_text = format_results(results);
        let plan_text = format_plan(plan);
        let prompt = prompts::research_evaluation(query, &results_text, &plan_text);

        match self.llm.complete_simple(&prompt, EVALUATION_MAX_TOKENS).await {
            Ok(response) => {
                let evaluation = parse_research_evaluation(&response);
                info!(
                    complete = evaluation.is_complete,
                    confidence = evaluation.confidence,
                    "Research evaluation"
                );
                evaluation
            },
            Err(e) => {
                error!(error = %e, "Research evaluation failed, assuming incomplete");
                EvaluationResult {
                    is_complete: false,
                    confidence: 0.5,
                    reasoning: format!("Evaluation failed ({e}), assuming incomplete"),
                    additional_queries: Vec::new(),
                    missing_aspects: Vec::new(),
                }
            },
        }
    }

    /// Is the response good enough, or should the loop escalate?
    pub async fn evaluate_response_quality(
        &self,
        query: &str,
        response: &str,
        strategy_used: StrategyKind,
        expected_complexity: Option<&ComplexityAnalysis>,
    ) -> EvaluationResult {
        debug!(strategy = %strategy_used, "Evaluating response quality");

        let complexity = expected_complexity
            .map_or_else(|| "unknown".to_string(), |analysis| analysis.level.to_string());

        let truncated: String = response.chars().take(RESPONSE_TRUNCATION).collect();
        let prompt = prompts::quality_evaluation(
            query,
            &truncated,
            &strategy_used.to_string(),
            &complexity,
        );

        match self.llm.complete_simple(&prompt, EVALUATION_MAX_TOKENS).await {
            Ok(text) => {
                let evaluation = parse_quality_evaluation(&text);
                info!(
                    sufficient = evaluation.is_complete,
                    confidence = evaluation.confidence,
                    "Quality evaluation"
                );
                evaluation
            },
            Err(e) => {
                error!(error = %e, "Quality evaluation failed, accepting response");
                EvaluationResult {
                    is_complete: true,
                    confidence: 0.5,
                    reasoning: format!("Evaluation failed ({e}), accepting response"),
                    additional_queries: Vec::new(),
                    missing_aspects: Vec::new(),
                }
            },
        }
    }
}

fn format_results(results: &[SubtaskResult]) -> String {
    if results.is_empty() {
        return "No results yet".to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let content: String = result.result.chars().take(500).collect();
            format!(
                "{}. Query: {}\n   Result: {content}...",
                index.saturating_add(1),
                result.query
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_plan(plan: &ResearchPlan) -> String {
    if plan.subtasks.is_empty() {
        return "No remaining subtasks".to_string();
    }
    plan.subtasks
        .iter()
        .map(|task| format!("- {}", task.query))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_research_evaluation(response: &str) -> EvaluationResult {
    let assessment = parse::section(response, "Completeness Assessment");
    let is_complete = assessment
        .as_deref()
        .is_some_and(|text| {
            let upper = text.to_uppercase();
            upper.contains("COMPLETE") && !upper.contains("NOT COMPLETE")
        });

    let confidence = parse::section(response, "Confidence Score")
        .or_else(|| parse::labeled_field(response, "Confidence Score"))
        .and_then(|v| parse::leading_f64(&v))
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let reasoning =
        assessment.unwrap_or_else(|| "No assessment provided".to_string());

    let additional_queries = parse::section(response, "Additional Queries Needed")
        .map(|body| parse::numbered_items(&body))
        .unwrap_or_default();

    let missing_aspects = parse::section(response, "Missing Aspects")
        .map(|body| parse::bulleted_items(&body))
        .unwrap_or_default();

    EvaluationResult {
        is_complete,
        confidence,
        reasoning,
        additional_queries,
        missing_aspects,
    }
}

fn parse_quality_evaluation(response: &str) -> EvaluationResult {
    let is_sufficient = parse::labeled_field(response, "Quality Assessment")
        .map_or(true, |v| v.to_uppercase().contains("SUFFICIENT")
            && !v.to_uppercase().contains("INSUFFICIENT"));

    let confidence = parse::labeled_field(response, "Confidence Score")
        .and_then(|v| parse::leading_f64(&v))
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    let reasoning = parse::section(response, "**Reasoning:**")
        .or_else(|| parse::labeled_field(response, "Reasoning"))
        .unwrap_or_else(|| "No reasoning provided".to_string());

    let missing_aspects = parse::section(response, "Missing Aspects")
        .map(|body| parse::bulleted_items(&body))
        .unwrap_or_default();

    EvaluationResult {
        is_complete: is_sufficient,
        confidence,
        reasoning,
        additional_queries: Vec::new(),
        missing_aspects,
    }
}
