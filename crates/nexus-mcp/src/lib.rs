//! Nexus MCP - client fleet for Model Context Protocol upstreams.
//!
//! This crate owns one side of the runtime's hardest plumbing: N
//! heterogeneous MCP servers, each with its own connection lifecycle,
//! health monitoring, and exponential-backoff reconnection.
//!
//! # Layers
//!
//! - [`ExponentialBackoff`]: capped backoff with cancellable waits
//! - [`HealthChecker`]: periodic keep-alive probe with a failure threshold
//! - [`ConnectionLifecycle`]: per-client state machine with a ready signal
//! - [`NexusClient`]: one upstream (streamable HTTP only); list/call
//!   tools, prompts, and resources with degrade-to-empty semantics
//! - [`ConnectionManager`]: the fleet; factory construction, concurrent
//!   connect/disconnect, status snapshots, event fan-out
//!
//! All status transitions and reconnect progress are published on the
//! [`nexus_events::EventBus`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

mod client;
mod config;
mod error;
mod health;
mod lifecycle;
mod manager;
mod oauth;
mod reconnect;
mod types;

pub use client::{NexusClient, NexusClientConfig, ProgressCallback, TransportKind};
pub use config::{load_mcp_config, McpServerConfig, McpServersConfig, DEFAULT_CONFIG_PATH};
pub use error::{McpError, McpResult};
pub use health::{HealthChecker, HealthCheckerConfig, HealthProbeOperation};
pub use lifecycle::{ConnectionLifecycle, StatusCallback};
pub use manager::{ClientProvider, ConnectionManager, DefaultClientProvider};
pub use oauth::{
    InMemoryTokenStorage, OAuthCallbackState, OAuthClientConfig, OAuthTokens, TokenStorage,
    DEFAULT_CALLBACK_PORT,
};
pub use reconnect::{BackoffProgressFn, ExponentialBackoff};
pub use types::{
    PromptArgument, PromptDefinition, PromptMessage, ResourceDefinition, ResourcePayload,
    ToolCallOutcome, ToolDefinition,
};

pub use nexus_core::ConnectionStatus;
