//! Nexus Tools - tool dispatch registry.
//!
//! A [`ToolRegistry`] aggregates tool definitions from any number of
//! [`ToolProvider`]s and routes execution by tool name. Two providers
//! ship with the runtime:
//!
//! - [`McpToolProvider`]: wraps the MCP fleet, deduplicates colliding
//!   tool names (first server wins), and forwards calls to the owning
//!   client.
//! - [`LocalToolProvider`]: explicitly registered in-process tools with
//!   declared parameter schemas — no reflection.
//!
//! A [`ToolStateManager`] tracks disabled tool names; the registry
//! filters the definitions it emits by that set, but does not refuse
//! execution of a disabled tool. The gate is the LLM's tool menu.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod local;
mod mcp;
mod provider;
mod registry;
mod state;

pub use error::{ToolError, ToolResult};
pub use local::{LocalTool, LocalToolHandler, LocalToolProvider, ParameterKind, ToolParameter};
pub use mcp::McpToolProvider;
pub use provider::{ToolProvider, ToolSpec};
pub use registry::ToolRegistry;
pub use state::ToolStateManager;
