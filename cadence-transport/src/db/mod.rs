//! Session persistence
//!
//! The transport persists one record: the snapshot of the current session.
//! `SnapshotStore` abstracts where it lives so the service can run against
//! SQLite in production and memory in tests.

pub mod snapshots;

pub use snapshots::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
