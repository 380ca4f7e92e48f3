//! Runtime error types.

use thiserror::Error;

/// Errors from the reasoning runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An LLM call failed with no applicable component fallback.
    #[error("LLM error: {0}")]
    Llm(#[from] nexus_llm::LlmError),

    /// A tool dispatch failed at the registry level.
    #[error("tool error: {0}")]
    Tool(#[from] nexus_tools::ToolError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] nexus_storage::StorageError),

    /// The approval subsystem failed.
    #[error("approval error: {0}")]
    Approval(#[from] nexus_approval::ApprovalError),

    /// The user cancelled the query.
    #[error("query cancelled: {reason}")]
    Cancelled {
        /// Why the query was cancelled.
        reason: String,
    },

    /// A queue was used while not running.
    #[error("queue {name} is not running")]
    QueueNotRunning {
        /// Queue name.
        name: String,
    },

    /// Snapshot (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
