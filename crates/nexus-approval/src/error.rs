//! Approval error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors from the approval manager.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// No UI callback has been registered.
    #[error("no approval UI registered; call set_ui() before requesting approval")]
    NoUiRegistered,

    /// A response referenced an unknown request id.
    #[error("no pending approval request with id {0}")]
    UnknownRequest(Uuid),

    /// The pending entry was dropped before a response arrived.
    #[error("approval request {0} was abandoned")]
    Abandoned(Uuid),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
