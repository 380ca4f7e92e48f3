//! Nexus Storage - pluggable persistence for session snapshots.
//!
//! A [`StateProvider`] abstracts the storage backend behind a uniform
//! async interface: `save`, `load`, `exists`, `delete`, `list_keys`.
//! Two implementations ship with the runtime:
//!
//! - [`MemoryStateProvider`]: dictionary-backed, for tests and
//!   development. Values are deep-copied in both directions.
//! - [`FileStateProvider`]: one JSON file per key with atomic
//!   temp-then-rename writes and filesystem-safe key sanitization.
//!
//! Corrupt data surfaces as [`StorageError::Corrupt`] at load time; the
//! session layer decides whether to fall back to fresh state.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod file;
mod memory;
mod provider;

pub use error::{StorageError, StorageResult};
pub use file::FileStateProvider;
pub use memory::MemoryStateProvider;
pub use provider::StateProvider;
