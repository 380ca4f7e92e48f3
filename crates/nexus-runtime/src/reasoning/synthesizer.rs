//! Result filtering and final-answer synthesis.

use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error, info};

use nexus_llm::LlmProvider;

use crate::reasoning::prompts;

const FILTER_MAX_TOKENS: u32 = 1000;
const SYNTHESIS_MAX_TOKENS: u32 = 2000;
/// Upper bound on results kept after filtering.
const MAX_FILTERED_RESULTS: usize = 7;
/// Below this count, filtering is skipped entirely.
const FILTER_THRESHOLD: usize = 3;

/// One subtask's outcome, as accumulated by the strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskResult {
    /// The subtask query that produced this result.
    pub query: String,
    /// The result text.
    pub result: String,
    /// Which iteration produced it.
    pub iteration: u32,
}

/// Filters results by relevance and combines them into a final answer.
pub struct Synthesizer {
    llm: Arc<dyn LlmProvider>,
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer").finish_non_exhaustive()
    }
}

impl Synthesizer {
    /// Create a synthesizer.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Filter results by relevance to the query.
    ///
    /// With three results or fewer, all are returned unchanged.
    /// Otherwise the LLM ranks them; the top seven are returned in rank
    /// order. On LLM failure all results pass through.
    pub async fn filter_results(
        &self,
        query: &str,
        results: Vec<SubtaskResult>,
    ) -> Vec<SubtaskResult> {
        if results.len() <= FILTER_THRESHOLD {
            return results;
        }

        debug!(count = results.len(), "Filtering results for relevance");

        let results_text = format_for_filtering(&results);
        let prompt = prompts::filter(query, &results_text);

        match self.llm.complete_simple(&prompt, FILTER_MAX_TOKENS).await {
            Ok(response) => {
                let ranked_ids = parse_ranked_ids(&response, results.len());
                let filtered: Vec<SubtaskResult> = ranked_ids
                    .into_iter()
                    .take(MAX_FILTERED_RESULTS)
                    .filter_map(|id| results.get(id).cloned())
                    .collect();
                info!(kept = filtered.len(), "Filtered results");
                filtered
            },
            Err(e) => {
                error!(error = %e, "Result filtering failed, keeping all results");
                results
            },
        }
    }

    /// Combine filtered results into the final answer.
    ///
    /// A single result is returned as-is. On LLM failure a
    /// deterministic concatenation of the query and numbered sources is
    /// returned instead.
    pub async fn synthesize(&self, query: &str, filtered: &[SubtaskResult]) -> String {
        if filtered.is_empty() {
            return "No results available to synthesize.".to_string();
        }

        if filtered.len() == 1 {
            return filtered[0].result.clone();
        }

        debug!(count = filtered.len(), "Synthesizing results");

        let results_text = format_for_synthesis(filtered);
        let prompt = prompts::synthesis(query, &results_text);

        match self.llm.complete_simple(&prompt, SYNTHESIS_MAX_TOKENS).await {
            Ok(answer) => {
                info!(chars = answer.len(), "Synthesized final answer");
                answer
            },
            Err(e) => {
                error!(error = %e, "Synthesis failed, falling back to concatenation");
                fallback_synthesis(query, filtered)
            },
        }
    }
}

fn format_for_filtering(results: &[SubtaskResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let content: String = result.result.chars().take(300).collect();
            format!(
                "Result {index}:\nQuery: {}\nContent: {content}...\n",
                result.query
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_for_synthesis(results: &[SubtaskResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            format!(
                "Source {} (from: {}):\n{}\n",
                index.saturating_add(1),
                result.query,
                result.result
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Parse ranked result IDs from a filter response.
///
/// Tries an explicit ranked list at the end first, then scattered
/// `Result ID: N` mentions, and finally falls back to original order.
fn parse_ranked_ids(response: &str, total_results: usize) -> Vec<usize> {
    let ranked_section =
        Regex::new(r"(?is)ranked list.*?:\s*\n(.*)$").expect("valid ranked-list regex");
    let number = Regex::new(r"\b(\d+)\b").expect("valid number regex");

    let mut ids: Vec<usize> = Vec::new();

    if let Some(caps) = ranked_section.captures(response) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        ids = number
            .captures_iter(body)
            .filter_map(|c| c.get(1))
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
    }

    if ids.is_empty() {
        let mentions = Regex::new(r"Result ID:\s*(\d+)").expect("valid mention regex");
        ids = mentions
            .captures_iter(response)
            .filter_map(|c| c.get(1))
            .filter_map(|m| m.as_str().parse().ok())
            .collect();
    }

    if ids.is_empty() {
        ids = (0..total_results).collect();
    }

    // Deduplicate while preserving rank order, drop out-of-range ids
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .filter(|id| *id < total_results && seen.insert(*id))
        .collect()
}

fn fallback_synthesis(query: &str, results: &[SubtaskResult]) -> String {
    let mut parts = vec![format!(
        "Based on the query: {query}\n\nHere are the findings:\n"
    )];
    for (index, result) in results.iter().enumerate() {
        parts.push(format!("\n{}. {}", index.saturating_add(1), result.result));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_llm::{
        ContentBlock, LlmError, LlmResponse, LlmResult, MessageRequest, StopReason, Usage,
    };

    struct ScriptedProvider {
        response: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn create_message(&self, _request: MessageRequest) -> LlmResult<LlmResponse> {
            match &self.response {
                Some(text) => Ok(LlmResponse {
                    content: vec![ContentBlock::Text { text: text.clone() }],
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                }),
                None => Err(LlmError::ApiRequestFailed("down".to_string())),
            }
        }
    }

    fn synthesizer_with(response: Option<&str>) -> Synthesizer {
        Synthesizer::new(Arc::new(ScriptedProvider {
            response: response.map(String::from),
        }))
    }

    fn results(count: usize) -> Vec<SubtaskResult> {
        (0..count)
            .map(|i| SubtaskResult {
                query: format!("q{i}"),
                result: format!("r{i}"),
                iteration: 0,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_small_result_sets_pass_through() {
        let synthesizer = synthesizer_with(None);
        let input = results(3);
        let output = synthesizer.filter_results("q", input.clone()).await;
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_filter_reorders_by_ranked_list() {
        let synthesizer = synthesizer_with(Some("Reasoning here.\n\nRanked list:\n3, 1, 0, 2"));
        let output = synthesizer.filter_results("q", results(4)).await;
        let queries: Vec<&str> = output.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["q3", "q1", "q0", "q2"]);
    }

    #[tokio::test]
    async fn test_filter_clamps_to_seven() {
        let ranked = "Ranked list:\n0, 1, 2, 3, 4, 5, 6, 7, 8, 9";
        let synthesizer = synthesizer_with(Some(ranked));
        let output = synthesizer.filter_results("q", results(10)).await;
        assert_eq!(output.len(), 7);
    }

    #[tokio::test]
    async fn test_filter_result_id_mentions() {
        let response = "The best is Result ID: 2 and then Result ID: 0.";
        let synthesizer = synthesizer_with(Some(response));
        let output = synthesizer.filter_results("q", results(4)).await;
        let queries: Vec<&str> = output.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["q2", "q0"]);
    }

    #[tokio::test]
    async fn test_filter_out_of_range_ids_dropped() {
        let synthesizer = synthesizer_with(Some("Ranked list:\n9, 1"));
        let output = synthesizer.filter_results("q", results(4)).await;
        let queries: Vec<&str> = output.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["q1"]);
    }

    #[tokio::test]
    async fn test_filter_failure_keeps_all() {
        let synthesizer = synthesizer_with(None);
        let output = synthesizer.filter_results("q", results(5)).await;
        assert_eq!(output.len(), 5);
    }

    #[tokio::test]
    async fn test_synthesize_single_result_passthrough() {
        let synthesizer = synthesizer_with(None);
        let input = results(1);
        let answer = synthesizer.synthesize("q", &input).await;
        assert_eq!(answer, "r0");
    }

    #[tokio::test]
    async fn test_synthesize_combines_via_llm() {
        let synthesizer = synthesizer_with(Some("Combined answer."));
        let answer = synthesizer.synthesize("q", &results(2)).await;
        assert_eq!(answer, "Combined answer.");
    }

    #[tokio::test]
    async fn test_synthesize_failure_concatenates() {
        let synthesizer = synthesizer_with(None);
        let answer = synthesizer.synthesize("the query", &results(2)).await;
        assert!(answer.contains("the query"));
        assert!(answer.contains("1. r0"));
        assert!(answer.contains("2. r1"));
    }

    #[tokio::test]
    async fn test_synthesize_empty() {
        let synthesizer = synthesizer_with(None);
        let answer = synthesizer.synthesize("q", &[]).await;
        assert!(answer.contains("No results"));
    }
}
