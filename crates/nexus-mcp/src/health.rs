//! Health checking for MCP client connections.
//!
//! The checker serves two purposes: it keeps serverless upstreams warm
//! with periodic cheap requests, and it detects dead connections by
//! counting consecutive probe failures.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Which listing operation the health probe uses.
///
/// All three are cheap, idempotent MCP calls; `ListTools` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthProbeOperation {
    /// Probe via `tools/list`.
    #[default]
    ListTools,
    /// Probe via `prompts/list`.
    ListPrompts,
    /// Probe via `resources/list`.
    ListResources,
}

impl std::fmt::Display for HealthProbeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ListTools => "list_tools",
            Self::ListPrompts => "list_prompts",
            Self::ListResources => "list_resources",
        };
        f.write_str(s)
    }
}

/// Configuration for the health checker.
#[derive(Debug, Clone)]
pub struct HealthCheckerConfig {
    /// Seconds between health checks. Short by default to double as a
    /// keep-alive for serverless upstreams.
    pub check_interval: Duration,
    /// Per-probe deadline.
    pub probe_timeout: Duration,
    /// Consecutive failures before the connection is declared unhealthy.
    pub failure_threshold: u32,
    /// Which operation to probe with.
    pub operation: HealthProbeOperation,
    /// Whether the probe is also meant to keep the upstream warm.
    pub keep_alive: bool,
}

impl Default for HealthCheckerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            failure_threshold: 2,
            operation: HealthProbeOperation::default(),
            keep_alive: true,
        }
    }
}

/// Periodic health monitor for one connection.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    config: HealthCheckerConfig,
}

impl HealthChecker {
    /// Create a health checker with the given configuration.
    #[must_use]
    pub fn new(config: HealthCheckerConfig) -> Self {
        Self { config }
    }

    /// The checker's configuration.
    #[must_use]
    pub fn config(&self) -> &HealthCheckerConfig {
        &self.config
    }

    /// Spawn the monitoring loop.
    ///
    /// On each tick the `probe` future runs under the configured deadline.
    /// A successful probe resets the consecutive-failure counter; a failed
    /// or timed-out probe increments it. When the counter reaches the
    /// failure threshold, `on_unhealthy` is invoked once per crossing.
    /// The loop exits when `cancel` fires.
    pub fn spawn<P, F, U>(
        &self,
        probe: P,
        on_unhealthy: U,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        P: Fn(HealthProbeOperation) -> F + Send + Sync + 'static,
        F: Future<Output = bool> + Send,
        U: Fn() + Send + Sync + 'static,
    {
        let config = self.config.clone();
        let mode = if config.keep_alive {
            "keep-alive + health monitoring"
        } else {
            "health monitoring only"
        };
        info!(
            interval_secs = config.check_interval.as_secs_f64(),
            operation = %config.operation,
            mode,
            "Health checker started"
        );

        tokio::spawn(async move {
            let mut consecutive_failures: u32 = 0;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Health checker stopped");
                        break;
                    },
                    () = tokio::time::sleep(config.check_interval) => {},
                }

                if cancel.is_cancelled() {
                    break;
                }

                let healthy = match tokio::time::timeout(
                    config.probe_timeout,
                    probe(config.operation),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            timeout_secs = config.probe_timeout.as_secs_f64(),
                            "Health check timed out"
                        );
                        false
                    },
                };

                if healthy {
                    if consecutive_failures > 0 {
                        info!(
                            failures = consecutive_failures,
                            "Connection recovered"
                        );
                    }
                    consecutive_failures = 0;
                    debug!(operation = %config.operation, "Health check passed");
                } else {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!(
                        failures = consecutive_failures,
                        threshold = config.failure_threshold,
                        "Health check failed"
                    );

                    // Fire once per threshold crossing, not on every
                    // subsequent failure
                    if consecutive_failures == config.failure_threshold {
                        warn!("Connection unhealthy, triggering callback");
                        let result = std::panic::catch_unwind(
                            std::panic::AssertUnwindSafe(&on_unhealthy),
                        );
                        if result.is_err() {
                            error!("Unhealthy callback panicked");
                        }
                    }
                }
            }
        })
    }
}
