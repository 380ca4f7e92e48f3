//! Argument parsing for prompt commands.
//!
//! `/command` arguments arrive as a free-form string. Two formats are
//! recognized: `key=value` pairs (with quoted values) and positional
//! values. The composite parser picks per input, applies schema
//! defaults, and logs — without failing — when required arguments are
//! missing, matching the forgiving surface of the command layer.

use nexus_mcp::PromptDefinition;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Normalized schema for one prompt argument.
#[derive(Debug, Clone)]
pub struct PromptArgumentSchema {
    /// Argument name.
    pub name: String,
    /// Whether the argument must be provided.
    pub required: bool,
    /// Description from the server.
    pub description: Option<String>,
    /// Default value applied when absent.
    pub default: Option<String>,
}

impl PromptArgumentSchema {
    /// Normalize the argument schemas of a prompt definition.
    #[must_use]
    pub fn from_prompt(prompt: &PromptDefinition) -> Vec<Self> {
        prompt
            .arguments
            .as_ref()
            .map(|arguments| {
                arguments
                    .iter()
                    .map(|argument| Self {
                        name: argument.name.clone(),
                        required: argument.required,
                        description: argument.description.clone(),
                        default: None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Pluggable argument parser.
pub trait ArgumentParser: Send + Sync {
    /// Parse the remaining query text against the argument schemas.
    fn parse(
        &self,
        query_remaining: &str,
        schemas: &[PromptArgumentSchema],
    ) -> HashMap<String, String>;
}

/// Parser for `key=value` arguments with quoted-value support.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyValueParser;

impl KeyValueParser {
    /// Scan `key=value` pairs, honoring single and double quotes and
    /// escaped quote characters inside quoted values.
    #[allow(clippy::arithmetic_side_effects)] // index increments bounded by chars.len()
    fn scan_pairs(text: &str) -> Vec<(String, String)> {
        let chars: Vec<char> = text.chars().collect();
        let mut pairs = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i >= chars.len() {
                break;
            }

            let key_start = i;
            while i < chars.len() && chars[i] != '=' && !chars[i].is_whitespace() {
                i += 1;
            }

            if i >= chars.len() || chars[i] != '=' {
                // Token without '=': skip it
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                continue;
            }

            let key: String = chars[key_start..i].iter().collect();
            i += 1; // skip '='

            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i >= chars.len() {
                pairs.push((key.trim().to_string(), String::new()));
                break;
            }

            let value = if chars[i] == '"' || chars[i] == '\'' {
                let quote = chars[i];
                i += 1;
                let value_start = i;
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1] == quote {
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                let value: String = chars[value_start..i].iter().collect();
                if i < chars.len() {
                    i += 1; // skip closing quote
                }
                value
            } else {
                let value_start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                chars[value_start..i].iter().collect::<String>()
            };

            pairs.push((key.trim().to_string(), value));
        }

        pairs
    }
}

impl ArgumentParser for KeyValueParser {
    fn parse(
        &self,
        query_remaining: &str,
        schemas: &[PromptArgumentSchema],
    ) -> HashMap<String, String> {
        let mut arguments = HashMap::new();
        if !query_remaining.contains('=') {
            return arguments;
        }

        let known: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
        for (key, value) in Self::scan_pairs(query_remaining) {
            if known.contains(&key.as_str()) {
                debug!(key = %key, "Parsed key=value argument");
                arguments.insert(key, value);
            }
        }
        arguments
    }
}

/// Parser for positional (space-separated) arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalParser;

/// Extract the bare resource id from a mention.
///
/// `mcp://server/resource` and `server:resource` both reduce to
/// `resource`; anything else passes through unchanged.
#[must_use]
pub(crate) fn extract_resource_id(reference: &str) -> String {
    if let Some((_, rest)) = reference.split_once("://") {
        return rest.split('/').next_back().unwrap_or(rest).to_string();
    }
    if let Some((_, rest)) = reference.split_once(':') {
        return rest.to_string();
    }
    reference.to_string()
}

impl ArgumentParser for PositionalParser {
    fn parse(
        &self,
        query_remaining: &str,
        schemas: &[PromptArgumentSchema],
    ) -> HashMap<String, String> {
        let mut arguments = HashMap::new();

        // Single-argument prompts accept a bare @resource mention
        if schemas.len() == 1 && query_remaining.starts_with('@') {
            let reference = query_remaining[1..].trim();
            let resource_id = extract_resource_id(reference);
            debug!(argument = %schemas[0].name, value = %resource_id, "Parsed resource-reference argument");
            arguments.insert(schemas[0].name.clone(), resource_id);
            return arguments;
        }

        let values: Vec<&str> = query_remaining.split_whitespace().collect();
        for (schema, raw) in schemas.iter().zip(values.iter()) {
            let mut value = raw.trim_matches('"').trim_matches('\'').to_string();
            if let Some(stripped) = value.strip_prefix('@') {
                value = extract_resource_id(stripped);
            }
            debug!(argument = %schema.name, value = %value, "Parsed positional argument");
            arguments.insert(schema.name.clone(), value);
        }
        arguments
    }
}

/// Composite parser: `key=value` when an `=` is present, positional
/// otherwise; defaults applied, required arguments validated.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeParser {
    key_value: KeyValueParser,
    positional: PositionalParser,
}

impl CompositeParser {
    /// Create the composite parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill in schema defaults for absent arguments.
    pub fn apply_defaults(
        arguments: &mut HashMap<String, String>,
        schemas: &[PromptArgumentSchema],
    ) {
        for schema in schemas {
            if !arguments.contains_key(&schema.name) {
                if let Some(default) = &schema.default {
                    debug!(argument = %schema.name, default = %default, "Applied default argument");
                    arguments.insert(schema.name.clone(), default.clone());
                }
            }
        }
    }

    /// Log missing required arguments. The command still proceeds —
    /// the server reports precise errors for its own schema.
    pub fn validate(
        arguments: &HashMap<String, String>,
        schemas: &[PromptArgumentSchema],
        command_name: &str,
    ) {
        let missing: Vec<&str> = schemas
            .iter()
            .filter(|schema| schema.required && !arguments.contains_key(&schema.name))
            .map(|schema| schema.name.as_str())
            .collect();
        if !missing.is_empty() {
            warn!(
                command = command_name,
                missing = ?missing,
                "Missing required arguments for prompt"
            );
        }
    }
}

impl ArgumentParser for CompositeParser {
    fn parse(
        &self,
        query_remaining: &str,
        schemas: &[PromptArgumentSchema],
    ) -> HashMap<String, String> {
        if query_remaining.contains('=') {
            self.key_value.parse(query_remaining, schemas)
        } else {
            self.positional.parse(query_remaining, schemas)
        }
    }
}
