//! Nexus Artifacts - unified view of tools, prompts, and resources
//! across the MCP fleet.
//!
//! The [`ArtifactRepository`] fetches listings from connected clients
//! with retry and timeout discipline; the [`ArtifactCache`] stores deep
//! copies and answers structural change-detection queries; the
//! [`ArtifactManager`] facade ties both together and publishes
//! `ArtifactsFetched` events on every refresh.
//!
//! Timeouts and per-server failures downgrade to empty collections:
//! a slow or broken server never takes the aggregate view down.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cache;
mod manager;
mod repository;
mod types;

pub use cache::ArtifactCache;
pub use manager::ArtifactManager;
pub use repository::{ArtifactRepository, FetchRetryPolicy};
pub use types::{ArtifactSource, Prompt, Resource, Tool};

pub use nexus_core::{ArtifactCollection, ArtifactRecord};
