//! Command and resource preprocessing in front of the reasoning loop.
//!
//! Before a query reaches the adaptive loop, `@token` mentions are
//! resolved to server resources and injected as context, and a leading
//! `/command` whose first word names a known prompt is executed
//! through the MCP prompt interface — its rendered messages become the
//! conversation and the loop runs with an empty query.

use std::sync::Arc;
use tracing::{debug, info, warn};

use async_trait::async_trait;
use nexus_artifacts::ArtifactManager;
use nexus_mcp::ConnectionManager;

use crate::error::RuntimeResult;
use crate::observer::ExecutionObserver;
use crate::parsers::{ArgumentParser, CompositeParser, PromptArgumentSchema};
use crate::reasoning_loop::AdaptiveReasoningLoop;
use crate::session::Agent;

/// Agent facade that expands `/commands` and `@resources`, then
/// delegates to the adaptive reasoning loop.
pub struct CommandControlAgent {
    artifacts: Arc<ArtifactManager>,
    fleet: Arc<ConnectionManager>,
    reasoning: Arc<AdaptiveReasoningLoop>,
    parser: Arc<dyn ArgumentParser>,
}

impl std::fmt::Debug for CommandControlAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandControlAgent").finish_non_exhaustive()
    }
}

impl CommandControlAgent {
    /// Create the agent with the default composite argument parser.
    #[must_use]
    pub fn new(
        artifacts: Arc<ArtifactManager>,
        fleet: Arc<ConnectionManager>,
        reasoning: Arc<AdaptiveReasoningLoop>,
    ) -> Self {
        Self {
            artifacts,
            fleet,
            reasoning,
            parser: Arc::new(CompositeParser::new()),
        }
    }

    /// Swap in a different argument parser.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn ArgumentParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Try to process the query as a `/command`.
    ///
    /// Returns `true` when the command was executed and its prompt
    /// messages appended to the conversation.
    async fn process_command(&self, query: &str) -> bool {
        let Some(first_word) = query.split_whitespace().next() else {
            return false;
        };
        let Some(command_name) = first_word.strip_prefix('/') else {
            return false;
        };
        if command_name.is_empty() {
            return false;
        }

        let Some((prompt, server_name)) = self.artifacts.find_prompt(command_name).await else {
            warn!(command = command_name, "Command not found in any MCP server");
            return false;
        };

        let Some(client) = self.fleet.client(&server_name).await else {
            warn!(server = %server_name, "Client not found for prompt's server");
            return false;
        };

        // Parse arguments against the prompt's schema
        let remaining = query
            .strip_prefix(first_word)
            .unwrap_or("")
            .trim()
            .to_string();
        let schemas = PromptArgumentSchema::from_prompt(&prompt);
        let mut arguments = self.parser.parse(&remaining, &schemas);
        CompositeParser::apply_defaults(&mut arguments, &schemas);
        CompositeParser::validate(&arguments, &schemas, command_name);

        info!(
            command = command_name,
            server = %server_name,
            argument_count = arguments.len(),
            "Executing prompt command"
        );

        let argument_map = if arguments.is_empty() {
            None
        } else {
            Some(
                arguments
                    .into_iter()
                    .map(|(key, value)| (key, serde_json::Value::String(value)))
                    .collect(),
            )
        };

        let messages = client.get_prompt(command_name, argument_map).await;
        if messages.is_empty() {
            warn!(command = command_name, "No messages returned from prompt");
            return false;
        }

        // The prompt's rendered messages become the context
        let conversation = self.reasoning.conversation();
        let mut conversation = conversation.lock().await;
        for message in &messages {
            conversation.add_message(&message.role, message.content.clone());
        }
        info!(command = command_name, messages = messages.len(), "Prompt messages appended");
        true
    }

    /// Resolve `@token` mentions into a resource-context envelope.
    ///
    /// Tokens that match no resource stay literal text in the query —
    /// the model may still treat them as natural-language references.
    async fn extract_resources(&self, query: &str) -> String {
        let mentions: Vec<&str> = query
            .split_whitespace()
            .filter_map(|word| word.strip_prefix('@'))
            .filter(|token| !token.is_empty())
            .collect();

        if mentions.is_empty() {
            return String::new();
        }

        let resources_by_server = self.artifacts.resources_by_server().await;
        let mut context = String::new();

        for (server_name, uris) in resources_by_server {
            let Some(client) = self.fleet.client(&server_name).await else {
                continue;
            };
            for uri in uris {
                let matched = mentions
                    .iter()
                    .any(|mention| uri == *mention || uri.contains(*mention));
                if !matched {
                    continue;
                }

                debug!(server = %server_name, uri = %uri, "Fetching mentioned resource");
                if let Some(payload) = client.read_resource(&uri).await {
                    context.push_str(&format!(
                        "\n<resource id=\"{server_name}:{uri}\">\n{}\n</resource>\n",
                        payload.as_context_text()
                    ));
                }
            }
        }

        if !context.is_empty() {
            info!(chars = context.len(), "Extracted resource context");
        }
        context
    }

    fn enrich_with_resources(query: &str, resource_context: &str) -> String {
        format!(
            "The user has a question:\n<query>\n{query}\n</query>\n\n\
             The following context may be useful in answering their question:\n\
             <context>\n{resource_context}\n</context>\n\n\
             The user's query might contain references to documents like \"@report.docx\". \
             The \"@\" only marks a mention; the document's actual name is \"report.docx\". \
             When the document content is included above, do not use a tool to read it again. \
             Answer the user's question directly and concisely, starting with the exact \
             information they need, without referring to the provided context."
        )
    }
}

#[async_trait]
impl Agent for CommandControlAgent {
    async fn run(&self, query: &str, observer: &dyn ExecutionObserver) -> RuntimeResult<String> {
        info!(query = %query.chars().take(50).collect::<String>(), "Processing query");

        if query.starts_with('/') && self.process_command(query).await {
            // The command's messages are already the context
            debug!("Command processed, running loop with empty query");
            return self.reasoning.run("", observer).await;
        }

        let resource_context = self.extract_resources(query).await;
        let effective_query = if resource_context.is_empty() {
            query.to_string()
        } else {
            Self::enrich_with_resources(query, &resource_context)
        };

        self.reasoning.run(&effective_query, observer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_envelope_shape() {
        let enriched = CommandControlAgent::enrich_with_resources(
            "summarize @report.docx",
            "\n<resource id=\"docs:report.docx\">\ncontents\n</resource>\n",
        );
        assert!(enriched.contains("<query>\nsummarize @report.docx\n</query>"));
        assert!(enriched.contains("<resource id=\"docs:report.docx\">"));
        assert!(enriched.contains("do not use a tool to read it again"));
    }
}
