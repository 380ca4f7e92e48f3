//! MCP server configuration parsing.
//!
//! Parses the JSON configuration file containing MCP server definitions:
//!
//! ```json
//! { "mcpServers": { "docs": { "command": "npx", "args": ["mcp-remote", "https://..."] } } }
//! ```
//!
//! A server is considered remote when its first argument is `"mcp-remote"`;
//! the second argument is then its URL.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{McpError, McpResult};

/// Default configuration path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/nexus_mcp_config.json";

/// Marker argument for remote servers.
const REMOTE_MARKER: &str = "mcp-remote";

/// Configuration for a single MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Command to execute the MCP server.
    pub command: String,
    /// Arguments for the command.
    #[serde(default)]
    pub args: Vec<String>,
}

impl McpServerConfig {
    /// Whether this is a remote MCP server.
    ///
    /// A server is remote when the first argument is `"mcp-remote"`.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.args.first().is_some_and(|a| a == REMOTE_MARKER)
    }

    /// The remote URL, when this is a remote server.
    #[must_use]
    pub fn remote_url(&self) -> Option<&str> {
        if self.is_remote() {
            self.args.get(1).map(String::as_str)
        } else {
            None
        }
    }
}

/// Configuration containing multiple MCP servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServersConfig {
    /// Server configurations keyed by name.
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: HashMap<String, McpServerConfig>,
}

impl McpServersConfig {
    /// Get configuration for a specific server.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<&McpServerConfig> {
        self.mcp_servers.get(name)
    }

    /// Names of all configured servers.
    #[must_use]
    pub fn server_names(&self) -> Vec<String> {
        self.mcp_servers.keys().cloned().collect()
    }
}

/// Load MCP server configuration from a JSON file.
///
/// When `config_path` is `None`, reads [`DEFAULT_CONFIG_PATH`].
///
/// # Errors
///
/// Returns [`McpError::ConfigNotFound`] when the file does not exist and
/// [`McpError::ConfigInvalid`] when it cannot be parsed. Both are hard
/// failures: the configuration phase is the one place the runtime is
/// allowed to refuse to start.
pub fn load_mcp_config(config_path: Option<&Path>) -> McpResult<McpServersConfig> {
    let path: PathBuf = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if !path.exists() {
        error!(path = %path.display(), "MCP configuration file not found");
        return Err(McpError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    info!(path = %path.display(), "Loading MCP configuration");

    let raw = std::fs::read_to_string(&path)?;
    let config: McpServersConfig = serde_json::from_str(&raw)
        .map_err(|e| McpError::ConfigInvalid(format!("{}: {e}", path.display())))?;

    info!(server_count = config.mcp_servers.len(), "Loaded MCP configuration");
    for (name, server) in &config.mcp_servers {
        debug!(server = %name, command = %server.command, remote = server.is_remote(), "Configured server");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn remote_config() -> McpServerConfig {
        McpServerConfig {
            command: "npx".to_string(),
            args: vec![
                "mcp-remote".to_string(),
                "https://example.com/mcp".to_string(),
            ],
        }
    }

    #[test]
    fn test_remote_detection() {
        let config = remote_config();
        assert!(config.is_remote());
        assert_eq!(config.remote_url(), Some("https://example.com/mcp"));
    }

    #[test]
    fn test_local_server_has_no_remote_url() {
        let config = McpServerConfig {
            command: "python".to_string(),
            args: vec!["server.py".to_string()],
        };
        assert!(!config.is_remote());
        assert_eq!(config.remote_url(), None);
    }

    #[test]
    fn test_remote_marker_without_url() {
        let config = McpServerConfig {
            command: "npx".to_string(),
            args: vec!["mcp-remote".to_string()],
        };
        assert!(config.is_remote());
        assert_eq!(config.remote_url(), None);
    }

    #[test]
    fn test_load_missing_file_is_hard_error() {
        let result = load_mcp_config(Some(Path::new("/nonexistent/nexus_config.json")));
        assert!(matches!(result, Err(McpError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "mcpServers": {{ "docs": {{ "command": "npx", "args": ["mcp-remote", "https://docs.example/mcp"] }} }} }}"#
        )
        .unwrap();

        let config = load_mcp_config(Some(file.path())).unwrap();
        assert_eq!(config.mcp_servers.len(), 1);
        let docs = config.server("docs").unwrap();
        assert_eq!(docs.remote_url(), Some("https://docs.example/mcp"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ corrupt json").unwrap();

        let result = load_mcp_config(Some(file.path()));
        assert!(matches!(result, Err(McpError::ConfigInvalid(_))));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut servers = HashMap::new();
        servers.insert("docs".to_string(), remote_config());
        let config = McpServersConfig {
            mcp_servers: servers,
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("mcpServers"));
        let restored: McpServersConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
