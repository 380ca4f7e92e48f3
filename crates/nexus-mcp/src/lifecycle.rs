//! Per-client connection lifecycle.
//!
//! Tracks the state machine:
//!
//! ```text
//!        connect()                success              failure
//! DISCONNECTED ────► CONNECTING ───────► CONNECTED ───┬──► ERROR
//!         ▲              │failure                     │
//!         │              ▼                            │loss
//!         │            ERROR ◄───────────RECONNECTING ┘
//!         │                        │ retries exhausted
//!         └─────── disconnect() ◄──┘
//! ```
//!
//! Every transition invokes the registered status callback with the new
//! and previous status, which the connection manager turns into
//! `ConnectionStatusChanged` events. A watch channel backs the "ready"
//! signal that first-use callers block on.

use nexus_core::ConnectionStatus;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::debug;

/// Callback invoked on every transition: `(new_status, previous_status)`.
pub type StatusCallback = Arc<dyn Fn(ConnectionStatus, Option<ConnectionStatus>) + Send + Sync>;

/// Connection state machine for a single client.
pub struct ConnectionLifecycle {
    status_tx: watch::Sender<ConnectionStatus>,
    on_status_change: RwLock<Option<StatusCallback>>,
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Default for ConnectionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionLifecycle {
    /// Create a lifecycle in the `Disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            status_tx,
            on_status_change: RwLock::new(None),
        }
    }

    /// Register the status-change callback.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_status_callback(&self, callback: StatusCallback) {
        *self.on_status_change.write().expect("lock poisoned") = Some(callback);
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Whether a session is currently usable.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Transition to a new status, notifying the callback and watchers.
    ///
    /// Transitioning to the current status is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn transition(&self, new_status: ConnectionStatus) {
        let previous = self.status();
        if previous == new_status {
            return;
        }

        debug!(from = %previous, to = %new_status, "Connection status transition");
        // send_replace never fails; watchers may or may not exist
        self.status_tx.send_replace(new_status);

        let callback = self.on_status_change.read().expect("lock poisoned").clone();
        if let Some(cb) = callback {
            cb(new_status, Some(previous));
        }
    }

    /// Block until the session is `Connected`.
    ///
    /// Callers awaiting first use block on this; it resolves immediately
    /// when already connected.
    pub async fn wait_ready(&self) {
        let mut rx = self.status_tx.subscribe();
        loop {
            if rx.borrow().is_connected() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender dropped; nothing more will change
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_initial_state() {
        let lifecycle = ConnectionLifecycle::new();
        assert_eq!(lifecycle.status(), ConnectionStatus::Disconnected);
        assert!(!lifecycle.is_connected());
    }

    #[test]
    fn test_transitions_invoke_callback_with_previous() {
        let lifecycle = ConnectionLifecycle::new();
        let log: Arc<Mutex<Vec<(ConnectionStatus, Option<ConnectionStatus>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);

        lifecycle.set_status_callback(Arc::new(move |new, prev| {
            log_clone.lock().unwrap().push((new, prev));
        }));

        lifecycle.transition(ConnectionStatus::Connecting);
        lifecycle.transition(ConnectionStatus::Connected);
        lifecycle.transition(ConnectionStatus::Reconnecting);
        lifecycle.transition(ConnectionStatus::Error);

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                (
                    ConnectionStatus::Connecting,
                    Some(ConnectionStatus::Disconnected)
                ),
                (
                    ConnectionStatus::Connected,
                    Some(ConnectionStatus::Connecting)
                ),
                (
                    ConnectionStatus::Reconnecting,
                    Some(ConnectionStatus::Connected)
                ),
                (
                    ConnectionStatus::Error,
                    Some(ConnectionStatus::Reconnecting)
                ),
            ]
        );
    }

    #[test]
    fn test_same_status_is_noop() {
        let lifecycle = ConnectionLifecycle::new();
        let count = Arc::new(Mutex::new(0u32));
        let count_clone = Arc::clone(&count);

        lifecycle.set_status_callback(Arc::new(move |_, _| {
            *count_clone.lock().unwrap() += 1;
        }));

        lifecycle.transition(ConnectionStatus::Connecting);
        lifecycle.transition(ConnectionStatus::Connecting);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wait_ready_resolves_on_connect() {
        let lifecycle = Arc::new(ConnectionLifecycle::new());
        let waiter = Arc::clone(&lifecycle);

        let handle = tokio::spawn(async move {
            waiter.wait_ready().await;
        });

        lifecycle.transition(ConnectionStatus::Connecting);
        lifecycle.transition(ConnectionStatus::Connected);

        handle.await.unwrap();
        assert!(lifecycle.is_connected());
    }

    #[tokio::test]
    async fn test_wait_ready_immediate_when_connected() {
        let lifecycle = ConnectionLifecycle::new();
        lifecycle.transition(ConnectionStatus::Connected);
        // Must not hang
        lifecycle.wait_ready().await;
    }
}
