//! MCP client for a single upstream server.
//!
//! A [`NexusClient`] owns one streamable-HTTP connection: the session,
//! its lifecycle state machine, health monitoring, and the reconnect
//! supervisor. All MCP operations degrade safely when no session is
//! active — they log and return an empty result or `None`, never an
//! error.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rmcp::model::{
    CallToolRequestParams, ClientCapabilities, ClientInfo, GetPromptRequestParams, Implementation,
    ReadResourceRequestParams,
};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{McpError, McpResult};
use crate::health::{HealthChecker, HealthCheckerConfig, HealthProbeOperation};
use crate::lifecycle::{ConnectionLifecycle, StatusCallback};
use crate::oauth::{InMemoryTokenStorage, OAuthCallbackState, TokenStorage};
use crate::reconnect::ExponentialBackoff;
use crate::types::{
    PromptDefinition, PromptMessage, ResourceDefinition, ResourcePayload, ToolCallOutcome,
    ToolDefinition,
};
use nexus_core::ConnectionStatus;

/// Graceful close deadline for the MCP session.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Progress callback during reconnection: `(attempt, max_attempts, delay)`.
pub type ProgressCallback = Arc<dyn Fn(u32, u32, Duration) + Send + Sync>;

/// Transport selection for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Streamable HTTP, the only supported transport.
    #[default]
    StreamableHttp,
    /// Server-sent events. Rejected at construction time.
    Sse,
}

/// Configuration for a single client.
#[derive(Debug, Clone)]
pub struct NexusClientConfig {
    /// Server URL.
    pub url: String,
    /// Transport kind; only streamable HTTP is accepted.
    pub transport: TransportKind,
    /// Reconnection backoff parameters.
    pub backoff: ExponentialBackoff,
    /// Health checker parameters.
    pub health: HealthCheckerConfig,
}

impl NexusClientConfig {
    /// Streamable-HTTP config with default backoff and health settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            transport: TransportKind::StreamableHttp,
            backoff: ExponentialBackoff::default(),
            health: HealthCheckerConfig::default(),
        }
    }
}

type McpService = RunningService<RoleClient, NexusClientHandler>;

/// Minimal rmcp client handler carrying Nexus client info.
#[derive(Debug, Clone)]
struct NexusClientHandler {
    server_name: String,
}

impl NexusClientHandler {
    fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
        }
    }
}

impl rmcp::ClientHandler for NexusClientHandler {
    fn get_info(&self) -> ClientInfo {
        debug!(server = %self.server_name, "Preparing MCP client info");
        ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "nexus".to_string(),
                title: Some("Nexus Agent Runtime".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
        }
    }
}

/// MCP client for one upstream server.
///
/// Cheaply cloneable: all fields are `Arc`-wrapped, so clones share the
/// same session, lifecycle, and supervisor.
pub struct NexusClient {
    name: String,
    config: NexusClientConfig,
    lifecycle: Arc<ConnectionLifecycle>,
    service: Arc<RwLock<Option<McpService>>>,
    token_storage: Arc<dyn TokenStorage>,
    oauth_callback: Arc<OAuthCallbackState>,
    on_reconnect_progress: Arc<std::sync::RwLock<Option<ProgressCallback>>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
    use_auth: Arc<AtomicBool>,
}

impl Clone for NexusClient {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            config: self.config.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
            service: Arc::clone(&self.service),
            token_storage: Arc::clone(&self.token_storage),
            oauth_callback: Arc::clone(&self.oauth_callback),
            on_reconnect_progress: Arc::clone(&self.on_reconnect_progress),
            cancel: Arc::clone(&self.cancel),
            use_auth: Arc::clone(&self.use_auth),
        }
    }
}

impl std::fmt::Debug for NexusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NexusClient")
            .field("name", &self.name)
            .field("url", &self.config.url)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl NexusClient {
    /// Create a client for one upstream.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::UnsupportedTransport`] for SSE; streamable
    /// HTTP is the only accepted transport.
    pub fn new(name: impl Into<String>, config: NexusClientConfig) -> McpResult<Self> {
        if config.transport == TransportKind::Sse {
            return Err(McpError::UnsupportedTransport(
                "SSE transport is not supported; use streamable HTTP".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            config,
            lifecycle: Arc::new(ConnectionLifecycle::new()),
            service: Arc::new(RwLock::new(None)),
            token_storage: Arc::new(InMemoryTokenStorage::new()),
            oauth_callback: Arc::new(OAuthCallbackState::new()),
            on_reconnect_progress: Arc::new(std::sync::RwLock::new(None)),
            cancel: Arc::new(Mutex::new(None)),
            use_auth: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the token storage backend.
    #[must_use]
    pub fn with_token_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.token_storage = storage;
        self
    }

    /// Server name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.lifecycle.status()
    }

    /// Whether the client has an active session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lifecycle.is_connected()
    }

    /// The lifecycle state machine.
    #[must_use]
    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.lifecycle
    }

    /// Register the status-change callback.
    pub fn set_status_callback(&self, callback: StatusCallback) {
        self.lifecycle.set_status_callback(callback);
    }

    /// Register the reconnect-progress callback.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_reconnect_progress_callback(&self, callback: ProgressCallback) {
        *self.on_reconnect_progress.write().expect("lock poisoned") = Some(callback);
    }

    /// Block until the session is connected.
    pub async fn wait_ready(&self) {
        self.lifecycle.wait_ready().await;
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Establish a connection and wait until the session is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be established or the
    /// MCP handshake fails; the client is left in the `Error` state.
    pub async fn connect(&self, use_auth: bool) -> McpResult<()> {
        self.use_auth.store(use_auth, Ordering::SeqCst);
        info!(server = %self.name, url = %self.config.url, use_auth, "Connecting to MCP server");

        self.lifecycle.transition(ConnectionStatus::Connecting);

        let cancel = CancellationToken::new();
        {
            let mut guard = self.cancel.lock().expect("lock poisoned");
            if let Some(old) = guard.take() {
                old.cancel();
            }
            *guard = Some(cancel.clone());
        }

        match self.establish_session().await {
            Ok(service) => {
                *self.service.write().await = Some(service);
                self.lifecycle.transition(ConnectionStatus::Connected);
                self.spawn_monitor(cancel);
                info!(server = %self.name, "MCP connection established");
                Ok(())
            },
            Err(e) => {
                self.lifecycle.transition(ConnectionStatus::Error);
                Err(e)
            },
        }
    }

    /// Manually re-enter the connection cycle from the `Error` state.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`connect`](Self::connect).
    pub async fn retry_connection(&self, use_auth: bool) -> McpResult<()> {
        info!(server = %self.name, "Retrying connection");
        self.connect(use_auth).await
    }

    /// Terminate the connection and clean up resources.
    pub async fn disconnect(&self) {
        info!(server = %self.name, "Disconnect requested");

        if let Some(cancel) = self.cancel.lock().expect("lock poisoned").take() {
            cancel.cancel();
        }

        if let Some(mut service) = self.service.write().await.take() {
            match service.close_with_timeout(SHUTDOWN_TIMEOUT).await {
                Ok(Some(reason)) => {
                    debug!(server = %self.name, ?reason, "MCP session closed gracefully");
                },
                Ok(None) => {
                    warn!(server = %self.name, "MCP session close timed out; dropping");
                },
                Err(e) => {
                    warn!(server = %self.name, error = %e, "MCP session close join error");
                },
            }
        }

        self.lifecycle.transition(ConnectionStatus::Disconnected);
        info!(server = %self.name, "Disconnected");
    }

    /// Establish the transport and perform the MCP handshake.
    async fn establish_session(&self) -> McpResult<McpService> {
        if self.use_auth.load(Ordering::SeqCst) {
            // A fresh OAuth flow must never see a stale authorization
            // code from a previous one.
            self.oauth_callback.reset();
            if self.token_storage.get_tokens(&self.config.url).await.is_none() {
                debug!(server = %self.name, "No stored OAuth tokens; transport will trigger the flow");
            }
        }

        let transport = StreamableHttpClientTransport::from_uri(self.config.url.clone());
        let handler = NexusClientHandler::new(&self.name);

        let service = handler
            .serve(transport)
            .await
            .map_err(|e| McpError::ConnectionFailed(format!("handshake failed: {e}")))?;

        debug!(server = %self.name, "MCP session initialized");
        Ok(service)
    }

    /// Spawn the health checker and the reconnect supervisor.
    fn spawn_monitor(&self, cancel: CancellationToken) {
        let health_cancel = cancel.child_token();
        let (unhealthy_tx, mut unhealthy_rx) = mpsc::channel::<()>(1);

        let probe_client = self.clone();
        let checker = HealthChecker::new(self.config.health.clone());
        // Detached: the task exits when health_cancel fires
        let _probe_task = checker.spawn(
            move |op| {
                let client = probe_client.clone();
                async move { client.probe(op).await }
            },
            move || {
                // Full channel means a trip is already pending
                let _ = unhealthy_tx.try_send(());
            },
            health_cancel.clone(),
        );

        let client = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => return,
                received = unhealthy_rx.recv() => {
                    if received.is_none() {
                        return;
                    }
                },
            }

            // Stop probing the dead session before tearing it down
            health_cancel.cancel();
            warn!(server = %client.name, "Connection lost, entering reconnect cycle");
            client.service.write().await.take();
            client.lifecycle.transition(ConnectionStatus::Reconnecting);
            client.reconnect_cycle(cancel).await;
        });
    }

    /// Retry with backoff until connected, cancelled, or exhausted.
    async fn reconnect_cycle(&self, cancel: CancellationToken) {
        let backoff = self.config.backoff.clone();
        let progress = self
            .on_reconnect_progress
            .read()
            .expect("lock poisoned")
            .clone();

        let mut attempt: u32 = 1;
        loop {
            let resumed = backoff
                .wait_before_retry(attempt, &cancel, progress.as_deref())
                .await;

            if !resumed {
                if cancel.is_cancelled() {
                    info!(server = %self.name, "Reconnect cycle cancelled");
                } else {
                    warn!(server = %self.name, attempts = attempt, "Reconnection attempts exhausted");
                    self.lifecycle.transition(ConnectionStatus::Error);
                }
                return;
            }

            info!(server = %self.name, attempt, "Reconnection attempt");
            match self.establish_session().await {
                Ok(service) => {
                    *self.service.write().await = Some(service);
                    self.lifecycle.transition(ConnectionStatus::Connected);
                    self.spawn_monitor(cancel);
                    info!(server = %self.name, attempt, "Reconnected");
                    return;
                },
                Err(e) => {
                    warn!(server = %self.name, attempt, error = %e, "Reconnection attempt failed");
                    attempt = attempt.saturating_add(1);
                    if !backoff.should_retry(attempt) {
                        warn!(server = %self.name, "Reconnection attempts exhausted");
                        self.lifecycle.transition(ConnectionStatus::Error);
                        return;
                    }
                },
            }
        }
    }

    /// Run one health probe against the current session.
    async fn probe(&self, operation: HealthProbeOperation) -> bool {
        let Some(peer) = self.peer().await else {
            debug!(server = %self.name, "Health probe: no active session");
            return false;
        };

        let result = match operation {
            HealthProbeOperation::ListTools => peer.list_all_tools().await.map(|_| ()),
            HealthProbeOperation::ListPrompts => peer.list_all_prompts().await.map(|_| ()),
            HealthProbeOperation::ListResources => peer.list_all_resources().await.map(|_| ()),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(server = %self.name, error = %e, "Health probe failed");
                false
            },
        }
    }

    /// Get a cloneable peer handle, if a session is active.
    async fn peer(&self) -> Option<Peer<RoleClient>> {
        let guard = self.service.read().await;
        guard.as_ref().map(|svc| svc.peer().clone())
    }

    // ------------------------------------------------------------------
    // MCP operations - tools
    // ------------------------------------------------------------------

    /// List tools exposed by the connected server.
    ///
    /// Returns an empty list when no session is active or the call fails.
    pub async fn list_tools(&self) -> Vec<ToolDefinition> {
        let Some(peer) = self.peer().await else {
            warn!(server = %self.name, "Cannot list tools: no active MCP session");
            return Vec::new();
        };

        match peer.list_all_tools().await {
            Ok(tools) => tools
                .iter()
                .map(|t| ToolDefinition::from_rmcp(t, &self.name))
                .collect(),
            Err(e) => {
                warn!(server = %self.name, error = %e, "Failed to list tools");
                Vec::new()
            },
        }
    }

    /// Invoke a tool on the connected server.
    ///
    /// Returns `None` when no session is active or the call fails.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Option<ToolCallOutcome> {
        let Some(peer) = self.peer().await else {
            warn!(server = %self.name, tool = tool_name, "Cannot call tool: no active MCP session");
            return None;
        };

        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                Some(map)
            },
        };

        let params = CallToolRequestParams {
            meta: None,
            name: Cow::Owned(tool_name.to_string()),
            arguments,
            task: None,
        };

        debug!(server = %self.name, tool = tool_name, "Calling MCP tool");
        match peer.call_tool(params).await {
            Ok(result) => Some(ToolCallOutcome::from(result)),
            Err(e) => {
                warn!(server = %self.name, tool = tool_name, error = %e, "Tool call failed");
                None
            },
        }
    }

    // ------------------------------------------------------------------
    // MCP operations - prompts
    // ------------------------------------------------------------------

    /// List prompts exposed by the connected server.
    pub async fn list_prompts(&self) -> Vec<PromptDefinition> {
        let Some(peer) = self.peer().await else {
            warn!(server = %self.name, "Cannot list prompts: no active MCP session");
            return Vec::new();
        };

        match peer.list_all_prompts().await {
            Ok(prompts) => prompts
                .iter()
                .map(|p| PromptDefinition::from_rmcp(p, &self.name))
                .collect(),
            Err(e) => {
                warn!(server = %self.name, error = %e, "Failed to list prompts");
                Vec::new()
            },
        }
    }

    /// Retrieve a prompt with the provided arguments.
    ///
    /// Returns an empty message list when no session is active or the
    /// call fails.
    pub async fn get_prompt(
        &self,
        prompt_name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Vec<PromptMessage> {
        let Some(peer) = self.peer().await else {
            warn!(server = %self.name, prompt = prompt_name, "Cannot get prompt: no active MCP session");
            return Vec::new();
        };

        let params = GetPromptRequestParams {
            meta: None,
            name: prompt_name.to_string(),
            arguments,
        };

        match peer.get_prompt(params).await {
            Ok(result) => result.messages.iter().map(PromptMessage::from_rmcp).collect(),
            Err(e) => {
                warn!(server = %self.name, prompt = prompt_name, error = %e, "Failed to get prompt");
                Vec::new()
            },
        }
    }

    // ------------------------------------------------------------------
    // MCP operations - resources
    // ------------------------------------------------------------------

    /// List resources exposed by the connected server.
    pub async fn list_resources(&self) -> Vec<ResourceDefinition> {
        let Some(peer) = self.peer().await else {
            warn!(server = %self.name, "Cannot list resources: no active MCP session");
            return Vec::new();
        };

        match peer.list_all_resources().await {
            Ok(resources) => resources
                .iter()
                .map(|r| ResourceDefinition::from_rmcp(r, &self.name))
                .collect(),
            Err(e) => {
                warn!(server = %self.name, error = %e, "Failed to list resources");
                Vec::new()
            },
        }
    }

    /// Read and decode the contents of a resource.
    ///
    /// Returns `None` when no session is active, the call fails, the
    /// resource has no text contents, or a JSON payload is malformed.
    pub async fn read_resource(&self, uri: &str) -> Option<ResourcePayload> {
        let Some(peer) = self.peer().await else {
            warn!(server = %self.name, uri, "Cannot read resource: no active MCP session");
            return None;
        };

        let params = ReadResourceRequestParams {
            meta: None,
            uri: uri.to_string(),
        };

        match peer.read_resource(params).await {
            Ok(result) => result
                .contents
                .first()
                .and_then(|c| ResourcePayload::from_rmcp(c, uri)),
            Err(e) => {
                warn!(server = %self.name, uri, error = %e, "Failed to read resource");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_rejected_at_construction() {
        let config = NexusClientConfig {
            url: "https://example.com/mcp".to_string(),
            transport: TransportKind::Sse,
            backoff: ExponentialBackoff::default(),
            health: HealthCheckerConfig::default(),
        };
        let result = NexusClient::new("docs", config);
        assert!(matches!(result, Err(McpError::UnsupportedTransport(_))));
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let client =
            NexusClient::new("docs", NexusClientConfig::new("https://example.com/mcp")).unwrap();
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
        assert!(!client.is_connected());
        assert_eq!(client.name(), "docs");
    }

    #[tokio::test]
    async fn test_operations_degrade_without_session() {
        let client =
            NexusClient::new("docs", NexusClientConfig::new("https://example.com/mcp")).unwrap();

        assert!(client.list_tools().await.is_empty());
        assert!(client.list_prompts().await.is_empty());
        assert!(client.list_resources().await.is_empty());
        assert!(client
            .call_tool("anything", Value::Null)
            .await
            .is_none());
        assert!(client.get_prompt("anything", None).await.is_empty());
        assert!(client.read_resource("docs://x").await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_without_session_is_clean() {
        let client =
            NexusClient::new("docs", NexusClientConfig::new("https://example.com/mcp")).unwrap();
        client.disconnect().await;
        assert_eq!(client.status(), ConnectionStatus::Disconnected);
    }
}
