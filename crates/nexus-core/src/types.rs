//! Connection status and artifact value types.

use serde::{Deserialize, Serialize};

/// Connection status of an MCP upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No connection and none in progress.
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Session established and ready.
    Connected,
    /// Connection lost, automatic retries in progress.
    Reconnecting,
    /// Connection failed and retries are exhausted (or never started).
    Error,
}

impl ConnectionStatus {
    /// Whether the client currently has a usable session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the client is in a terminal failure state.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single artifact surfaced by a server: a tool, prompt, or resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Artifact name (resource URI for resources).
    pub name: String,
    /// Human-readable description, when the server provides one.
    pub description: Option<String>,
}

impl ArtifactRecord {
    /// Create a record with a name and optional description.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

/// Everything a single server surfaces, grouped by category.
///
/// Structural equality between two collections is what drives change
/// detection in the artifact cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCollection {
    /// Tools exposed by the server.
    pub tools: Vec<ArtifactRecord>,
    /// Prompts (slash commands) exposed by the server.
    pub prompts: Vec<ArtifactRecord>,
    /// Resources exposed by the server.
    pub resources: Vec<ArtifactRecord>,
}

impl ArtifactCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether all three categories are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.prompts.is_empty() && self.resources.is_empty()
    }

    /// Total number of artifacts across categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools
            .len()
            .saturating_add(self.prompts.len())
            .saturating_add(self.resources.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(!ConnectionStatus::Reconnecting.is_connected());
        assert!(ConnectionStatus::Error.is_error());
        assert_eq!(ConnectionStatus::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn test_collection_equality_drives_change_detection() {
        let a = ArtifactCollection {
            tools: vec![ArtifactRecord::new("read_file", Some("Read a file".into()))],
            prompts: vec![],
            resources: vec![],
        };
        let mut b = a.clone();
        assert_eq!(a, b);

        b.tools[0].description = Some("Read a file from disk".into());
        assert_ne!(a, b);
    }

    #[test]
    fn test_collection_len() {
        let c = ArtifactCollection {
            tools: vec![ArtifactRecord::new("t", None)],
            prompts: vec![ArtifactRecord::new("p", None)],
            resources: vec![ArtifactRecord::new("r", None), ArtifactRecord::new("s", None)],
        };
        assert_eq!(c.len(), 4);
        assert!(!c.is_empty());
        assert!(ArtifactCollection::new().is_empty());
    }
}
