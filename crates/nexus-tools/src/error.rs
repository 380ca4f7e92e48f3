//! Tool dispatch error types.

use thiserror::Error;

/// Errors that can occur dispatching tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No provider routes the requested tool name.
    #[error("Tool not found: {name}")]
    NotFound {
        /// The tool name.
        name: String,
    },

    /// Execution failed upstream.
    #[error("Tool execution failed: {name} - {reason}")]
    ExecutionFailed {
        /// The tool name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Arguments did not match the tool's schema.
    #[error("Invalid arguments for {name}: {reason}")]
    InvalidArguments {
        /// The tool name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;
