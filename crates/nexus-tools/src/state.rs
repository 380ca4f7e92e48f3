//! Tool enable/disable state.

use std::collections::HashSet;
use std::sync::RwLock;
use tracing::{debug, info};

/// Tracks which tools are disabled.
///
/// All tools are enabled by default; only disabled names are stored.
/// The registry filters the definitions it emits by this set. Execution
/// of a disabled tool is still possible: the gate is the LLM's tool
/// menu, not a hard refusal.
#[derive(Debug, Default)]
pub struct ToolStateManager {
    disabled: RwLock<HashSet<String>>,
}

impl ToolStateManager {
    /// Create a manager with every tool enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tool is enabled.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_enabled(&self, tool_name: &str) -> bool {
        !self.disabled.read().expect("lock poisoned").contains(tool_name)
    }

    /// Enable a tool.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn enable_tool(&self, tool_name: &str) {
        if self.disabled.write().expect("lock poisoned").remove(tool_name) {
            info!(tool = tool_name, "Tool enabled");
        } else {
            debug!(tool = tool_name, "Tool already enabled");
        }
    }

    /// Disable a tool.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn disable_tool(&self, tool_name: &str) {
        if self
            .disabled
            .write()
            .expect("lock poisoned")
            .insert(tool_name.to_string())
        {
            info!(tool = tool_name, "Tool disabled");
        } else {
            debug!(tool = tool_name, "Tool already disabled");
        }
    }

    /// Toggle a tool; returns the new enabled state.
    #[must_use]
    pub fn toggle_tool(&self, tool_name: &str) -> bool {
        if self.is_enabled(tool_name) {
            self.disable_tool(tool_name);
            false
        } else {
            self.enable_tool(tool_name);
            true
        }
    }

    /// Snapshot of the disabled set.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn disabled_tools(&self) -> HashSet<String> {
        self.disabled.read().expect("lock poisoned").clone()
    }

    /// Enable every tool.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn enable_all(&self) {
        let mut disabled = self.disabled.write().expect("lock poisoned");
        let count = disabled.len();
        disabled.clear();
        info!(previously_disabled = count, "All tools enabled");
    }

    /// Number of enabled tools, given a total.
    #[must_use]
    pub fn enabled_count(&self, total_tools: usize) -> usize {
        total_tools.saturating_sub(self.disabled.read().expect("lock poisoned").len())
    }
}
