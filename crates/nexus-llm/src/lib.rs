//! Nexus LLM - provider contract, message types, and cost accounting.
//!
//! The runtime treats the language model as an interface: anything that
//! can answer `create_message` with content blocks, a stop reason, and
//! token usage. Concrete HTTP clients live with the embedder; the
//! reasoning components only ever see [`LlmProvider`].
//!
//! Cost accounting follows the same philosophy: the pricing table is
//! configuration data with a hard-coded fallback, never discovered from
//! a vendor API at runtime.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod pricing;
mod provider;
mod types;

pub use error::{LlmError, LlmResult};
pub use pricing::{CostCalculator, ModelRate, PricingTable};
pub use provider::{LlmProvider, UsageObserver};
pub use types::{
    ContentBlock, LlmResponse, LlmToolDefinition, Message, MessageRequest, MessageRole, StopReason,
    Usage,
};
