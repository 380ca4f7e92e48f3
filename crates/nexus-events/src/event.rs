//! Event types for the Nexus event bus.

use chrono::{DateTime, Utc};
use nexus_core::{ArtifactCollection, ConnectionStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Source component that generated the event.
    pub source: String,
}

impl EventMetadata {
    /// Create new event metadata stamped with the current time.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// All events that travel the Nexus event bus.
///
/// Each variant carries the affected `server_name` and metadata stamped
/// at construction. Events are process-internal; there is no wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NexusEvent {
    /// An MCP server's connection status changed.
    ConnectionStatusChanged {
        /// Event metadata.
        metadata: EventMetadata,
        /// Name of the server whose status changed.
        server_name: String,
        /// New connection status.
        status: ConnectionStatus,
        /// Previous connection status, if any was recorded.
        previous_status: Option<ConnectionStatus>,
    },

    /// Progress during reconnection attempts for a server.
    ReconnectProgress {
        /// Event metadata.
        metadata: EventMetadata,
        /// Name of the server being reconnected.
        server_name: String,
        /// Current attempt number (1-based).
        attempt: u32,
        /// Maximum number of attempts.
        max_attempts: u32,
        /// Seconds until the next retry.
        next_retry_secs: f64,
    },

    /// Artifacts were fetched for a server.
    ArtifactsFetched {
        /// Event metadata.
        metadata: EventMetadata,
        /// Name of the server.
        server_name: String,
        /// The fetched artifacts.
        artifacts: ArtifactCollection,
        /// Whether the artifacts differ from the cached version.
        changed: bool,
    },
}

impl NexusEvent {
    /// A short type tag for logging and filtering.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionStatusChanged { .. } => "connection_status_changed",
            Self::ReconnectProgress { .. } => "reconnect_progress",
            Self::ArtifactsFetched { .. } => "artifacts_fetched",
        }
    }

    /// The server this event concerns.
    #[must_use]
    pub fn server_name(&self) -> &str {
        match self {
            Self::ConnectionStatusChanged { server_name, .. }
            | Self::ReconnectProgress { server_name, .. }
            | Self::ArtifactsFetched { server_name, .. } => server_name,
        }
    }

    /// The metadata stamped at construction.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::ConnectionStatusChanged { metadata, .. }
            | Self::ReconnectProgress { metadata, .. }
            | Self::ArtifactsFetched { metadata, .. } => metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_server() {
        let event = NexusEvent::ConnectionStatusChanged {
            metadata: EventMetadata::new("test"),
            server_name: "docs".to_string(),
            status: ConnectionStatus::Connected,
            previous_status: Some(ConnectionStatus::Connecting),
        };
        assert_eq!(event.event_type(), "connection_status_changed");
        assert_eq!(event.server_name(), "docs");
    }

    #[test]
    fn test_metadata_timestamp_monotonicity() {
        let before = Utc::now();
        let event = NexusEvent::ReconnectProgress {
            metadata: EventMetadata::new("test"),
            server_name: "docs".to_string(),
            attempt: 1,
            max_attempts: 10,
            next_retry_secs: 1.0,
        };
        assert!(event.metadata().timestamp >= before);
    }
}
