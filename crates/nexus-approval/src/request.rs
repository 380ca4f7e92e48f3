//! Approval request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// What kind of decision is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// Validate a query's complexity analysis before execution.
    QueryAnalysis,
    /// Confirm a tool execution before it runs.
    ToolExecution,
}

/// A request for user approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique identifier for this request.
    pub id: Uuid,
    /// What is being approved.
    pub kind: ApprovalKind,
    /// Short description shown in the UI.
    pub title: String,
    /// Kind-specific details (analysis fields, tool name and args, ...).
    pub details: Map<String, Value>,
    /// Actions the user can take.
    pub options: Vec<String>,
    /// Default selection; the first option when not set explicitly.
    pub default_option: String,
}

impl ApprovalRequest {
    /// Create a request with explicit options.
    pub fn new(
        kind: ApprovalKind,
        title: impl Into<String>,
        details: Map<String, Value>,
        options: Vec<String>,
    ) -> Self {
        let default_option = options.first().cloned().unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            details,
            options,
            default_option,
        }
    }

    /// A query-analysis request with the standard options.
    pub fn query_analysis(title: impl Into<String>, details: Map<String, Value>) -> Self {
        Self::new(
            ApprovalKind::QueryAnalysis,
            title,
            details,
            vec![
                "Approve".to_string(),
                "Override Strategy".to_string(),
                "Cancel".to_string(),
            ],
        )
    }

    /// A tool-execution request with the standard options.
    pub fn tool_execution(title: impl Into<String>, details: Map<String, Value>) -> Self {
        Self::new(
            ApprovalKind::ToolExecution,
            title,
            details,
            vec![
                "Approve".to_string(),
                "Deny".to_string(),
                "Approve All".to_string(),
                "Deny All".to_string(),
            ],
        )
    }

    /// The tool name for tool-execution requests.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.details.get("tool_name").and_then(Value::as_str)
    }
}

/// A response to an approval request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalResponse {
    /// Id of the request this responds to.
    pub request_id: Uuid,
    /// Primary decision.
    pub approved: bool,
    /// Which option the user selected.
    pub selected_option: String,
    /// Additional data: strategy overrides, remember flags, ...
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ApprovalResponse {
    /// An approving response.
    #[must_use]
    pub fn approve(request_id: Uuid) -> Self {
        Self {
            request_id,
            approved: true,
            selected_option: "Approve".to_string(),
            metadata: Map::new(),
        }
    }

    /// A denying response.
    #[must_use]
    pub fn deny(request_id: Uuid) -> Self {
        Self {
            request_id,
            approved: false,
            selected_option: "Deny".to_string(),
            metadata: Map::new(),
        }
    }

    /// Mark this decision to be remembered for the session.
    #[must_use]
    pub fn remember_for_session(mut self) -> Self {
        self.metadata
            .insert("remember_for_session".to_string(), Value::Bool(true));
        self
    }

    /// Add a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the response asks to be remembered.
    #[must_use]
    pub fn wants_remembering(&self) -> bool {
        self.metadata
            .get("remember_for_session")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether this response was produced from session memory.
    #[must_use]
    pub fn is_remembered(&self) -> bool {
        self.metadata
            .get("remembered")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether this response was auto-approved by configuration.
    #[must_use]
    pub fn is_auto_approved(&self) -> bool {
        self.metadata
            .get("auto_approved")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether this response came from cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.metadata
            .get("cancelled")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_option_is_first() {
        let request = ApprovalRequest::query_analysis("Check", Map::new());
        assert_eq!(request.default_option, "Approve");
        assert_eq!(request.options.len(), 3);
    }

    #[test]
    fn test_tool_execution_options() {
        let mut details = Map::new();
        details.insert(
            "tool_name".to_string(),
            Value::String("read_file".to_string()),
        );
        let request = ApprovalRequest::tool_execution("Run read_file?", details);
        assert_eq!(request.options.len(), 4);
        assert_eq!(request.tool_name(), Some("read_file"));
    }

    #[test]
    fn test_response_flags() {
        let id = Uuid::new_v4();
        let response = ApprovalResponse::approve(id).remember_for_session();
        assert!(response.approved);
        assert!(response.wants_remembering());
        assert!(!response.is_remembered());
        assert!(!response.is_cancelled());
    }
}
