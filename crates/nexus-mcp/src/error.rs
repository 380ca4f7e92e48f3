//! MCP-related error types.

use thiserror::Error;

/// Errors that can occur with MCP operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// Configuration file not found.
    ///
    /// This is a hard failure at startup, by design: a missing config
    /// file is not recoverable at runtime.
    #[error("MCP configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was checked.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Invalid MCP configuration: {0}")]
    ConfigInvalid(String),

    /// The requested transport is not supported.
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// Server not found in the configuration or fleet.
    #[error("MCP server not found: {name}")]
    ServerNotFound {
        /// The server name that was not found.
        name: String,
    },

    /// No active session for the server.
    #[error("MCP server not connected: {name}")]
    NotConnected {
        /// The server name.
        name: String,
    },

    /// Connection failed.
    #[error("MCP connection failed: {0}")]
    ConnectionFailed(String),

    /// Tool call failed.
    #[error("Tool call failed: {server}:{tool} - {reason}")]
    ToolCallFailed {
        /// Server name.
        server: String,
        /// Tool name.
        tool: String,
        /// Reason for failure.
        reason: String,
    },

    /// OAuth flow failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
