//! Nexus Core - shared domain types for the Nexus agent runtime.
//!
//! This crate holds the small set of value types that cross crate
//! boundaries: connection status, and the artifact records used by both
//! the event bus and the artifact cache. It deliberately has no async
//! or I/O dependencies.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod types;

pub use types::{ArtifactCollection, ArtifactRecord, ConnectionStatus};
