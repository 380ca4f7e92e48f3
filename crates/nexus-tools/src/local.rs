//! Local tool provider with explicit schema registration.
//!
//! Each local tool declares its name, description, and parameter list
//! up front; the JSON Schema handed to the LLM is a straight transform
//! of that declaration. Handlers are plain functions over JSON
//! arguments returning a string result.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ToolError, ToolResult};
use crate::provider::{ToolProvider, ToolSpec};

/// JSON-schema-level type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// A string value.
    String,
    /// An integer value.
    Integer,
    /// A floating-point number.
    Number,
    /// A boolean.
    Boolean,
    /// An arbitrary JSON object.
    Object,
    /// A JSON array.
    Array,
}

impl ParameterKind {
    /// The JSON Schema `type` keyword for this kind.
    #[must_use]
    pub fn schema_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

/// Declared parameter of a local tool.
#[derive(Debug, Clone)]
pub struct ToolParameter {
    /// Parameter name.
    pub name: String,
    /// JSON-schema type.
    pub kind: ParameterKind,
    /// Whether the parameter must be provided.
    pub required: bool,
    /// Description shown to the LLM.
    pub description: Option<String>,
}

impl ToolParameter {
    /// A required parameter.
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
        }
    }

    /// An optional parameter.
    pub fn optional(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Handler invoked with the tool's JSON arguments.
pub type LocalToolHandler = Arc<dyn Fn(&Value) -> ToolResult<String> + Send + Sync>;

/// A locally registered tool.
#[derive(Clone)]
pub struct LocalTool {
    /// Tool name.
    pub name: String,
    /// Description shown to the LLM.
    pub description: String,
    /// Declared parameters.
    pub parameters: Vec<ToolParameter>,
    /// The function to invoke.
    pub handler: LocalToolHandler,
}

impl std::fmt::Debug for LocalTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTool")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl LocalTool {
    /// Create a tool with a handler.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ToolParameter>,
        handler: impl Fn(&Value) -> ToolResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(handler),
        }
    }

    /// Emit the JSON Schema for this tool's input.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for parameter in &self.parameters {
            let mut schema = Map::new();
            schema.insert(
                "type".to_string(),
                Value::String(parameter.kind.schema_type().to_string()),
            );
            if let Some(description) = &parameter.description {
                schema.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            properties.insert(parameter.name.clone(), Value::Object(schema));

            if parameter.required {
                required.push(Value::String(parameter.name.clone()));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }
}

/// Tool provider for locally registered functions.
pub struct LocalToolProvider {
    tools: HashMap<String, LocalTool>,
}

impl std::fmt::Debug for LocalToolProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalToolProvider")
            .field("tool_count", &self.tools.len())
            .finish()
    }
}

impl LocalToolProvider {
    /// Create a provider from a set of tools.
    #[must_use]
    pub fn new(tools: Vec<LocalTool>) -> Self {
        let tools = tools
            .into_iter()
            .map(|tool| (tool.name.clone(), tool))
            .collect::<HashMap<_, _>>();
        debug!(tool_count = tools.len(), "Local tool provider initialized");
        Self { tools }
    }

    /// Names of all registered tools.
    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Check that all required parameters are present.
    fn validate_arguments(tool: &LocalTool, arguments: &Value) -> ToolResult<()> {
        let missing: Vec<&str> = tool
            .parameters
            .iter()
            .filter(|p| p.required && arguments.get(&p.name).is_none())
            .map(|p| p.name.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidArguments {
                name: tool.name.clone(),
                reason: format!("missing required parameters: {}", missing.join(", ")),
            })
        }
    }
}

#[async_trait]
impl ToolProvider for LocalToolProvider {
    fn provider_name(&self) -> &str {
        "local"
    }

    async fn tool_definitions(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    async fn execute(&self, tool_name: &str, arguments: Value) -> ToolResult<String> {
        let Some(tool) = self.tools.get(tool_name) else {
            return Err(ToolError::NotFound {
                name: tool_name.to_string(),
            });
        };

        Self::validate_arguments(tool, &arguments)?;

        debug!(tool = tool_name, "Executing local tool");
        match (tool.handler)(&arguments) {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(tool = tool_name, error = %e, "Local tool failed");
                Err(e)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greet_tool() -> LocalTool {
        LocalTool::new(
            "greet",
            "Greet someone by name",
            vec![
                ToolParameter::required("name", ParameterKind::String)
                    .with_description("Person's name"),
                ToolParameter::optional("greeting", ParameterKind::String),
            ],
            |args| {
                let name = args["name"].as_str().unwrap_or("world");
                let greeting = args
                    .get("greeting")
                    .and_then(Value::as_str)
                    .unwrap_or("Hello");
                Ok(format!("{greeting}, {name}!"))
            },
        )
    }

    #[test]
    fn test_schema_emission() {
        let schema = greet_tool().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(
            schema["properties"]["name"]["description"],
            "Person's name"
        );
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[tokio::test]
    async fn test_execute_with_defaults() {
        let provider = LocalToolProvider::new(vec![greet_tool()]);
        let result = provider
            .execute("greet", json!({"name": "Ada"}))
            .await
            .unwrap();
        assert_eq!(result, "Hello, Ada!");
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let provider = LocalToolProvider::new(vec![greet_tool()]);
        let result = provider.execute("greet", json!({})).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments { .. })));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let provider = LocalToolProvider::new(vec![]);
        let result = provider.execute("ghost", json!({})).await;
        assert!(matches!(result, Err(ToolError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_definitions_include_all_tools() {
        let provider = LocalToolProvider::new(vec![greet_tool()]);
        let defs = provider.tool_definitions().await;
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "greet");
    }
}
