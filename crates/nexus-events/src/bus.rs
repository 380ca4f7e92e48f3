//! Event bus wiring fleet and artifact events to their audiences.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::event::NexusEvent;
use crate::subscriber::SubscriberRegistry;

/// Default broadcast capacity before slow receivers start lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for fleet and artifact events.
///
/// Two audiences hang off the bus: synchronous [`crate::EventSubscriber`]s
/// in the shared registry, notified inline in registration order, and
/// async [`EventReceiver`]s fed through a broadcast channel afterwards.
/// Inter-event ordering follows publish order for both.
///
/// Clones share the channel AND the registry. The connection manager
/// hands bus clones to per-client callbacks, so a subscriber registered
/// on the original must still hear events published through a clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<NexusEvent>>,
    registry: Arc<SubscriberRegistry>,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(SubscriberRegistry::new()),
        }
    }

    /// Publish an event to both audiences.
    ///
    /// Returns how many subscribers saw the event: synchronous
    /// subscribers notified plus async receivers the broadcast reached.
    /// Zero means the event fell on deaf ears, which is fine.
    pub fn publish(&self, event: NexusEvent) -> usize {
        let event = Arc::new(event);
        trace!(
            event_type = %event.event_type(),
            server = %event.server_name(),
            "Publishing event"
        );

        let notified = self.registry.notify(&event);
        let receivers = self.sender.send(Arc::clone(&event)).unwrap_or(0);
        notified.saturating_add(receivers)
    }

    /// Subscribe to every event on the bus.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            server: None,
        }
    }

    /// Subscribe to events for a single server.
    ///
    /// Events carrying any other `server_name` are skipped inside the
    /// receiver; a per-server status pane never sees its neighbours'
    /// traffic.
    #[must_use]
    pub fn subscribe_server(&self, server_name: impl Into<String>) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            server: Some(server_name.into()),
        }
    }

    /// The shared synchronous subscriber registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver for bus events, optionally scoped to one server.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<NexusEvent>>,
    server: Option<String>,
}

impl EventReceiver {
    fn wants(&self, event: &NexusEvent) -> bool {
        self.server
            .as_deref()
            .map_or(true, |server| event.server_name() == server)
    }

    /// Receive the next matching event.
    ///
    /// Returns `None` once the bus is dropped. Lagged events are skipped
    /// with a warning; events outside this receiver's server scope are
    /// skipped silently.
    pub async fn recv(&mut self) -> Option<Arc<NexusEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next matching event without blocking, if one is
    /// already queued.
    pub fn try_recv(&mut self) -> Option<Arc<NexusEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}
