//! Nexus Approval - human-in-the-loop approval rendezvous.
//!
//! Agent code that needs a user's sign-off calls
//! [`ApprovalManager::request_approval`] and suspends until the UI
//! submits a response (or the request is cancelled). Two request kinds
//! exist: validating a query's complexity analysis before execution,
//! and confirming a tool execution.
//!
//! Decisions can be remembered for the session: one boolean for query
//! analysis, a per-tool-name map for tool execution. Remembered
//! decisions short-circuit later requests without consulting the UI.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod manager;
mod request;

pub use error::{ApprovalError, ApprovalResult};
pub use manager::{ApprovalConfig, ApprovalManager, ApprovalUi};
pub use request::{ApprovalKind, ApprovalRequest, ApprovalResponse};
