//! Integration tests for the Nexus agent runtime.
//!
//! All tests live under `tests/`; this library target is intentionally
//! empty.
