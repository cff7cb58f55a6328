//! Local persistence for FocusPond.
//!
//! Everything the client keeps between launches lives in a string-keyed
//! store behind the [`KeyValueStore`] trait:
//!
//! - [`SnapshotCache`] holds the last-known-good value of each server-backed
//!   resource, with a last-updated timestamp per value.
//! - [`PendingOperationLog`] holds writes that failed to reach the backend,
//!   in the order they were issued.
//!
//! # Key layout
//!
//! Every key is namespaced by account: `"{base}_user{id}"`, or the bare base
//! key when no account is attached. Timestamps live under
//! `"{key}_timestamp"` as integer epoch seconds. See [`keys`].

mod error;
pub mod keys;
mod kv;
mod outbox;
mod snapshot;

pub use error::{StorageError, StorageResult};
pub use kv::{KeyValueStore, MemoryStore, SqliteStore};
pub use outbox::{DrainOutcome, DrainReport, PendingOperationLog};
pub use snapshot::{SnapshotCache, SnapshotDelta};
