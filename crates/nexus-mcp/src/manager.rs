//! Connection manager for the MCP client fleet.
//!
//! Owns the `{server_name -> NexusClient}` map, constructs clients via a
//! [`ClientProvider`] factory, connects and disconnects them
//! concurrently, and turns per-client status and reconnect-progress
//! callbacks into events on the bus. One client's failure never takes
//! down the rest of the fleet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::client::{NexusClient, NexusClientConfig};
use crate::config::{McpServerConfig, McpServersConfig};
use crate::error::McpResult;
use nexus_core::ConnectionStatus;
use nexus_events::{EventBus, EventMetadata, NexusEvent};

/// Factory for creating MCP clients from server configurations.
///
/// The default implementation handles remote servers only; other
/// deployments may plug in their own construction logic.
pub trait ClientProvider: Send + Sync {
    /// Create a client for one server, or `None` when the configuration
    /// is not supported by this provider.
    fn create_client(&self, server_name: &str, config: &McpServerConfig) -> Option<NexusClient>;
}

/// Default client factory: remote (`mcp-remote`) servers only.
#[derive(Debug, Clone, Default)]
pub struct DefaultClientProvider;

impl ClientProvider for DefaultClientProvider {
    fn create_client(&self, server_name: &str, config: &McpServerConfig) -> Option<NexusClient> {
        let Some(url) = config.remote_url() else {
            warn!(
                server = server_name,
                "Unsupported MCP server configuration; only remote servers are handled"
            );
            return None;
        };

        match NexusClient::new(server_name, NexusClientConfig::new(url)) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(server = server_name, error = %e, "Failed to construct client");
                None
            },
        }
    }
}

/// Manages the MCP client fleet: lifecycle, status, and event fan-out.
pub struct ConnectionManager {
    config: McpServersConfig,
    event_bus: EventBus,
    provider: Arc<dyn ClientProvider>,
    clients: RwLock<HashMap<String, NexusClient>>,
    previous_statuses: Arc<Mutex<HashMap<String, ConnectionStatus>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("configured_servers", &self.config.mcp_servers.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager for the given configuration.
    #[must_use]
    pub fn new(config: McpServersConfig, event_bus: EventBus) -> Self {
        Self::with_provider(config, event_bus, Arc::new(DefaultClientProvider))
    }

    /// Create a manager with a custom client factory.
    #[must_use]
    pub fn with_provider(
        config: McpServersConfig,
        event_bus: EventBus,
        provider: Arc<dyn ClientProvider>,
    ) -> Self {
        Self {
            config,
            event_bus,
            provider,
            clients: RwLock::new(HashMap::new()),
            previous_statuses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The event bus this manager publishes on.
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Create and connect clients for all configured servers.
    ///
    /// Connections are attempted concurrently; a failure on one client
    /// marks that client `Error` and does not abort the others.
    ///
    /// Returns the number of servers that connected successfully.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` is kept for future providers
    /// that can fail wholesale.
    pub async fn initialize(&self, use_auth: bool) -> McpResult<usize> {
        info!(
            server_count = self.config.mcp_servers.len(),
            "Initializing connection manager"
        );

        let mut created: HashMap<String, NexusClient> = HashMap::new();
        for (server_name, server_config) in &self.config.mcp_servers {
            if let Some(client) = self.provider.create_client(server_name, server_config) {
                self.wire_callbacks(&client);
                created.insert(server_name.clone(), client);
            }
        }

        info!(client_count = created.len(), "Prepared MCP client(s)");

        let connect_futures = created.iter().map(|(name, client)| {
            let name = name.clone();
            let client = client.clone();
            async move {
                match client.connect(use_auth).await {
                    Ok(()) => {
                        info!(server = %name, "Successfully connected");
                        true
                    },
                    Err(e) => {
                        // The client transitioned itself to Error; the
                        // status event has already been published.
                        error!(server = %name, error = %e, "Failed to connect");
                        false
                    },
                }
            }
        });

        let results = join_all(connect_futures).await;
        let connected = results.iter().filter(|ok| **ok).count();

        self.clients.write().await.extend(created);
        Ok(connected)
    }

    /// Disconnect all clients concurrently, ignoring per-client errors.
    pub async fn cleanup(&self) {
        let clients: Vec<NexusClient> = {
            let mut guard = self.clients.write().await;
            guard.drain().map(|(_, c)| c).collect()
        };

        if clients.is_empty() {
            return;
        }

        info!(client_count = clients.len(), "Cleaning up MCP client(s)");
        join_all(clients.iter().map(NexusClient::disconnect)).await;
        info!("Connection manager cleanup complete");
    }

    /// Snapshot of all clients, keyed by server name.
    pub async fn clients(&self) -> HashMap<String, NexusClient> {
        self.clients.read().await.clone()
    }

    /// A single client by name.
    pub async fn client(&self, server_name: &str) -> Option<NexusClient> {
        self.clients.read().await.get(server_name).cloned()
    }

    /// Read-only snapshot of `{server_name -> status}`.
    pub async fn server_statuses(&self) -> HashMap<String, ConnectionStatus> {
        self.clients
            .read()
            .await
            .iter()
            .map(|(name, client)| (name.clone(), client.status()))
            .collect()
    }

    /// Wire a client's status and progress callbacks to the event bus.
    fn wire_callbacks(&self, client: &NexusClient) {
        let server_name = client.name().to_string();

        {
            let bus = self.event_bus.clone();
            let previous = Arc::clone(&self.previous_statuses);
            let name = server_name.clone();
            client.set_status_callback(Arc::new(move |status, _lifecycle_prev| {
                // Previous status is tracked fleet-side so the very first
                // event for a server carries `None`.
                let prev = {
                    let mut map = previous.lock().expect("lock poisoned");
                    map.insert(name.clone(), status)
                };
                bus.publish(NexusEvent::ConnectionStatusChanged {
                    metadata: EventMetadata::new("connection_manager"),
                    server_name: name.clone(),
                    status,
                    previous_status: prev,
                });
            }));
        }

        {
            let bus = self.event_bus.clone();
            let name = server_name;
            client.set_reconnect_progress_callback(Arc::new(move |attempt, max_attempts, delay| {
                bus.publish(NexusEvent::ReconnectProgress {
                    metadata: EventMetadata::new("connection_manager"),
                    server_name: name.clone(),
                    attempt,
                    max_attempts,
                    next_retry_secs: delay.as_secs_f64(),
                });
            }));
        }
    }
}
