//! Prompt templates for the reasoning components.
//!
//! Templates are embedded constants; `{placeholders}` are substituted
//! by the small format helpers below. The response formats requested
//! here are what the parsers in the sibling modules expect.

/// Complexity analysis prompt.
const COMPLEXITY_ANALYSIS: &str = "\
You are a query triage system. Analyze the complexity of the user's query and \
recommend an execution strategy.

Query:
{query}

Available tools: {tools}

Conversation context: {context}

Strategies:
- DIRECT: single-pass execution, no planning. For simple factual queries and quick lookups.
- LIGHT_PLANNING: quick decomposition into at most two subtasks. For multi-part questions with clear structure.
- DEEP_REASONING: full planning with iterative research and evaluation. For complex research tasks.

Respond in exactly this format:

**Complexity Level:** SIMPLE|MEDIUM|COMPLEX
**Recommended Strategy:** DIRECT|LIGHT_PLANNING|DEEP_REASONING
**Estimated Iterations:** <number>
**Confidence:** <0.0-1.0>
**Reasoning:**
<one short paragraph>

Requires Research: Yes/No
Requires Synthesis: Yes/No
Multi-Part Query: Yes/No
Tool Count Estimate: <number>";

/// Planning prompt.
const PLANNING: &str = "\
You are a research planner. Decompose the query into ordered subtasks.

Query:
{query}

Available tools: {tools}

{context}

Produce a numbered list of subtasks. Each line must look like:

1. [HIGH PRIORITY] <subtask description>
   Tools: tool_a, tool_b

Priority is HIGH, MEDIUM, or LOW. The Tools line is optional; write \
'Tools: none' when no tool applies. Keep subtasks independent and \
concrete. Do not add commentary after the list.";

/// Research completeness evaluation prompt.
const RESEARCH_EVALUATION: &str = "\
You are evaluating whether accumulated research results answer the original query.

Original query:
{query}

Accumulated results:
{results}

Remaining plan:
{plan}

Respond in exactly this format:

## Completeness Assessment
<COMPLETE or NOT COMPLETE, with a short justification>

## Confidence Score
<0.0-1.0>

## Additional Queries Needed
1. <query that would close a gap, if any>

## Missing Aspects
- <missing aspect, if any>";

/// Response quality evaluation prompt.
const QUALITY_EVALUATION: &str = "\
You are a response quality gate. Judge whether the response adequately answers \
the query, given the execution strategy used.

Query:
{query}

Response (may be truncated):
{response}

Strategy used: {strategy_used}
Expected complexity: {expected_complexity}

Respond in exactly this format:

**Quality Assessment:** SUFFICIENT|INSUFFICIENT
**Confidence Score:** <0.0-1.0>
**Reasoning:**
<one short paragraph>

**Missing Aspects:**
- <missing aspect, if any>";

/// Result filtering prompt.
const FILTER: &str = "\
Rank the following results by relevance to the query. Consider coverage, \
specificity, and how directly each result addresses the question.

Query:
{query}

{results}

End your response with a ranked list of result IDs, most relevant first, like:

Ranked list:
2, 0, 1";

/// Synthesis prompt.
const SYNTHESIS: &str = "\
Combine the following sources into one coherent, comprehensive answer to the query. \
Resolve contradictions explicitly and do not repeat yourself.

Query:
{query}

{results}

Write the final answer only, with no preamble about the sources.";

/// Fill the complexity analysis template.
pub(crate) fn complexity_analysis(query: &str, tools: &str, context: &str) -> String {
    COMPLEXITY_ANALYSIS
        .replace("{query}", query)
        .replace("{tools}", tools)
        .replace("{context}", context)
}

/// Fill the planning template.
pub(crate) fn planning(query: &str, tools: &str, context: &str) -> String {
    PLANNING
        .replace("{query}", query)
        .replace("{tools}", tools)
        .replace("{context}", context)
}

/// Fill the research evaluation template.
pub(crate) fn research_evaluation(query: &str, results: &str, plan: &str) -> String {
    RESEARCH_EVALUATION
        .replace("{query}", query)
        .replace("{results}", results)
        .replace("{plan}", plan)
}

/// Fill the quality evaluation template.
pub(crate) fn quality_evaluation(
    query: &str,
    response: &str,
    strategy_used: &str,
    expected_complexity: &str,
) -> String {
    QUALITY_EVALUATION
        .replace("{query}", query)
        .replace("{response}", response)
        .replace("{strategy_used}", strategy_used)
        .replace("{expected_complexity}", expected_complexity)
}

/// Fill the filter template.
pub(crate) fn filter(query: &str, results: &str) -> String {
    FILTER.replace("{query}", query).replace("{results}", results)
}

/// Fill the synthesis template.
pub(crate) fn synthesis(query: &str, results: &str) -> String {
    SYNTHESIS
        .replace("{query}", query)
        .replace("{results}", results)
}
