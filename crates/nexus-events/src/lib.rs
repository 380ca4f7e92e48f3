//! Nexus Events - event bus for the Nexus agent runtime.
//!
//! This crate provides:
//! - Event types for connection lifecycle and artifact refreshes
//! - Broadcast-based event bus for async subscribers
//! - Subscriber registry for synchronous handlers
//!
//! # Architecture
//!
//! Events are published to an [`EventBus`] which notifies synchronous
//! subscribers in registration order and then broadcasts to async
//! receivers. There are two ways to subscribe:
//!
//! 1. **Async receivers**: use `bus.subscribe()` for an [`EventReceiver`]
//!    over everything, or `bus.subscribe_server(name)` for a receiver
//!    scoped to one server's events.
//!
//! 2. **Synchronous subscribers**: register implementations of
//!    [`EventSubscriber`] with the registry for immediate callback-based
//!    notification.
//!
//! Bus clones share the channel and the registry: the connection
//! manager hands clones to per-client callbacks, and subscribers on the
//! original still hear everything published through them. A subscriber
//! that panics is caught and logged; the remaining subscribers still
//! run. There is no replay and no persistence.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EventMetadata, NexusEvent};
pub use subscriber::{EventSubscriber, SubscriberId, SubscriberRegistry};
