//! Pricing table and cost calculation.
//!
//! The table is configuration data: loadable from a JSON file, with a
//! hard-coded fallback. Rates are USD per million tokens. An "extended
//! context" variant applies when the model id carries a matching
//! suffix (for long-context SKUs priced differently).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{LlmError, LlmResult};
use crate::types::Usage;

/// Per-model rates in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    /// Input rate, USD per 1M input tokens.
    pub input_rate: f64,
    /// Output rate, USD per 1M output tokens.
    pub output_rate: f64,
}

/// Pricing table: base rates per model, plus extended-context variants
/// keyed by model-id suffix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingTable {
    /// Base rates keyed by model id.
    pub models: HashMap<String, ModelRate>,
    /// Extended-context rates keyed by model-id suffix (e.g. `"[1m]"`).
    #[serde(default)]
    pub extended_context: HashMap<String, ModelRate>,
}

impl PricingTable {
    /// The built-in fallback table, used when no pricing file is
    /// configured or loading fails.
    #[must_use]
    pub fn fallback() -> Self {
        let mut models = HashMap::new();
        models.insert(
            "claude-sonnet-4-5".to_string(),
            ModelRate {
                input_rate: 3.0,
                output_rate: 15.0,
            },
        );
        models.insert(
            "claude-haiku-4-5".to_string(),
            ModelRate {
                input_rate: 1.0,
                output_rate: 5.0,
            },
        );
        models.insert(
            "claude-opus-4-1".to_string(),
            ModelRate {
                input_rate: 15.0,
                output_rate: 75.0,
            },
        );

        let mut extended_context = HashMap::new();
        extended_context.insert(
            "[1m]".to_string(),
            ModelRate {
                input_rate: 6.0,
                output_rate: 22.5,
            },
        );

        Self {
            models,
            extended_context,
        }
    }

    /// Load a pricing table from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the file cannot be read or
    /// parsed. Callers typically fall back to [`PricingTable::fallback`].
    pub fn from_json_file(path: &Path) -> LlmResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("cannot read pricing file: {e}")))?;
        let table: Self = serde_json::from_str(&raw)
            .map_err(|e| LlmError::ConfigError(format!("invalid pricing file: {e}")))?;
        info!(path = %path.display(), models = table.models.len(), "Loaded pricing table");
        Ok(table)
    }

    /// Resolve the rate for a model id.
    ///
    /// Extended-context suffixes take precedence: a model id ending in
    /// a registered suffix uses the extended rate. Unknown models
    /// resolve to `None`.
    #[must_use]
    pub fn rate_for(&self, model: &str) -> Option<ModelRate> {
        for (suffix, rate) in &self.extended_context {
            if model.ends_with(suffix.as_str()) {
                return Some(*rate);
            }
        }
        if let Some(rate) = self.models.get(model) {
            return Some(*rate);
        }
        // Versioned ids like "claude-sonnet-4-5-20250929" fall back to
        // their longest registered prefix.
        self.models
            .iter()
            .filter(|(id, _)| model.starts_with(id.as_str()))
            .max_by_key(|(id, _)| id.len())
            .map(|(_, rate)| *rate)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Calculates call costs from token usage.
#[derive(Debug, Clone, Default)]
pub struct CostCalculator {
    table: PricingTable,
}

impl CostCalculator {
    /// Calculator over the fallback table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator over a specific table.
    #[must_use]
    pub fn with_table(table: PricingTable) -> Self {
        Self { table }
    }

    /// Calculator loading rates from a JSON file, falling back to the
    /// built-in table on any failure.
    #[must_use]
    pub fn from_file_or_fallback(path: &Path) -> Self {
        match PricingTable::from_json_file(path) {
            Ok(table) => Self { table },
            Err(e) => {
                warn!(error = %e, "Failed to load pricing file, using fallback table");
                Self::default()
            },
        }
    }

    /// Cost in USD for one call: `tokens / 1e6 * rate`, summed over
    /// input and output. Unknown models cost zero (and are logged).
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // float rate math
    pub fn cost(&self, model: &str, usage: &Usage) -> f64 {
        let Some(rate) = self.table.rate_for(model) else {
            debug!(model, "No pricing entry for model; reporting zero cost");
            return 0.0;
        };

        #[allow(clippy::cast_precision_loss)]
        let input_cost = usage.input_tokens as f64 / 1_000_000.0 * rate.input_rate;
        #[allow(clippy::cast_precision_loss)]
        let output_cost = usage.output_tokens as f64 / 1_000_000.0 * rate.output_rate;
        input_cost + output_cost
    }
}
