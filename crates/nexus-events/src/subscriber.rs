//! Event subscriber trait and registry.

use std::sync::{Arc, RwLock};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::event::NexusEvent;

/// Trait for synchronous event subscribers.
///
/// Implement this trait to receive events synchronously. Subscribers
/// should not perform heavy work in `on_event` as it runs inline with
/// the publisher.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event is published.
    fn on_event(&self, event: &NexusEvent);

    /// Optional filter for event types.
    ///
    /// Return `true` to receive the event, `false` to skip it.
    /// The default accepts all events.
    fn accepts(&self, event: &NexusEvent) -> bool {
        let _ = event;
        true
    }

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Registration handle for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Registry for managing synchronous event subscribers.
///
/// Subscribers are notified in registration order. Registering the same
/// `Arc` twice is idempotent: the existing handle is returned instead of
/// adding a duplicate entry.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn EventSubscriber>)>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.subscribers.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &count)
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a subscriber.
    ///
    /// Returns a handle that can be used to unregister the subscriber.
    /// Re-registering an `Arc` that is already present returns the
    /// existing handle.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let mut subs = self.subscribers.write().expect("lock poisoned");

        if let Some((id, _)) = subs
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &subscriber))
        {
            debug!(subscriber_name = %subscriber.name(), "Subscriber already registered");
            return *id;
        }

        let id = SubscriberId::new();
        debug!(subscriber_name = %subscriber.name(), "Subscriber registered");
        subs.push((id, subscriber));
        id
    }

    /// Unregister a subscriber.
    ///
    /// Returns `true` if the subscriber was found and removed; a no-op
    /// for unknown handles.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut subs = self.subscribers.write().expect("lock poisoned");
        let before = subs.len();
        subs.retain(|(existing, _)| *existing != id);
        let removed = subs.len() < before;

        if removed {
            debug!("Subscriber unregistered");
        }

        removed
    }

    /// Notify all subscribers of an event, in registration order.
    ///
    /// Returns how many subscribers accepted the event. A subscriber
    /// that panics still counts: it was notified, it just failed.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn notify(&self, event: &NexusEvent) -> usize {
        let subs = self.subscribers.read().expect("lock poisoned");
        let mut notified: usize = 0;

        for (id, subscriber) in subs.iter() {
            if !subscriber.accepts(event) {
                continue;
            }
            notified = notified.saturating_add(1);

            trace!(
                subscriber_name = %subscriber.name(),
                event_type = %event.event_type(),
                "Notifying subscriber"
            );

            // Catch panics so one subscriber cannot starve the rest
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscriber.on_event(event);
            }));

            if let Err(e) = result {
                warn!(
                    subscriber_id = ?id,
                    subscriber_name = %subscriber.name(),
                    error = ?e,
                    "Subscriber panicked"
                );
            }
        }

        notified
    }

    /// Number of registered subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().expect("lock poisoned").len()
    }

    /// Whether the registry is empty.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().expect("lock poisoned").is_empty()
    }

    /// Clear all subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self) {
        let mut subs = self.subscribers.write().expect("lock poisoned");
        subs.clear();
        debug!("All subscribers cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventMetadata;
    use nexus_core::ConnectionStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSubscriber {
        name: String,
        count: AtomicUsize,
    }

    impl CountingSubscriber {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                count: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }
    }

    impl EventSubscriber for CountingSubscriber {
        fn on_event(&self, _event: &NexusEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn status_event(server: &str) -> NexusEvent {
        NexusEvent::ConnectionStatusChanged {
            metadata: EventMetadata::new("test"),
            server_name: server.to_string(),
            status: ConnectionStatus::Connected,
            previous_status: None,
        }
    }

    #[test]
    fn test_register_unregister() {
        let registry = SubscriberRegistry::new();
        assert!(registry.is_empty());

        let subscriber = Arc::new(CountingSubscriber::new("test"));
        let id = registry.register(subscriber);

        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_registration_collapses() {
        let registry = SubscriberRegistry::new();
        let subscriber: Arc<dyn EventSubscriber> = Arc::new(CountingSubscriber::new("dup"));

        let id1 = registry.register(Arc::clone(&subscriber));
        let id2 = registry.register(Arc::clone(&subscriber));

        assert_eq!(id1, id2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let registry = SubscriberRegistry::new();
        let id = {
            let subscriber = Arc::new(CountingSubscriber::new("gone"));
            let id = registry.register(subscriber);
            registry.unregister(id);
            id
        };
        assert!(!registry.unregister(id));
    }

    #[test]
    fn test_notify_in_registration_order() {
        struct OrderSubscriber {
            tag: usize,
            log: Arc<Mutex<Vec<usize>>>,
        }

        impl EventSubscriber for OrderSubscriber {
            fn on_event(&self, _event: &NexusEvent) {
                self.log.lock().unwrap().push(self.tag);
            }
        }

        let registry = SubscriberRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..4 {
            registry.register(Arc::new(OrderSubscriber {
                tag,
                log: Arc::clone(&log),
            }));
        }

        registry.notify(&status_event("docs"));
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_others() {
        struct PanickingSubscriber;

        impl EventSubscriber for PanickingSubscriber {
            fn on_event(&self, _event: &NexusEvent) {
                panic!("boom");
            }
        }

        let registry = SubscriberRegistry::new();
        registry.register(Arc::new(PanickingSubscriber));
        let counter = Arc::new(CountingSubscriber::new("after"));
        registry.register(Arc::clone(&counter) as Arc<dyn EventSubscriber>);

        // Both count as notified, even though the first one blew up
        let notified = registry.notify(&status_event("docs"));
        assert_eq!(notified, 2);
        assert_eq!(counter.count(), 1);
    }
}
