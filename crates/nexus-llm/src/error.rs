//! LLM-related error types.

use thiserror::Error;

/// Errors surfaced by an [`crate::LlmProvider`] implementation.
///
/// The reasoning components never let these propagate past their own
/// boundary; each one maps a failed call to its documented fallback.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request to the model back end failed outright.
    #[error("API request failed: {0}")]
    ApiRequestFailed(String),

    /// The back end asked us to slow down.
    #[error("Rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimitExceeded {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The back end answered with something we cannot interpret.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The conversation no longer fits the model's context window.
    #[error("Context length exceeded: {current} tokens, max is {max}")]
    ContextLengthExceeded {
        /// Current token count.
        current: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Provider or pricing configuration problem.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;
