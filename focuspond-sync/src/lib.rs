//! Offline-tolerant synchronization for FocusPond.
//!
//! # Architecture
//!
//! The backend is the single source of truth. The client keeps a local
//! snapshot of each resource and a queue of writes the backend has not
//! seen yet, so every action works offline and the device converges once
//! the backend is reachable again.
//!
//! ## Components
//!
//! - **Reachability**: folds OS path changes and health probes into edge
//!   events
//! - **Monitor**: probes the backend on an interval and publishes those
//!   events
//! - **Orchestrator**: optimistic writes, cache-fallback reads, queue
//!   replay, refresh and account switching
//! - **Keeper**: game rules built on the orchestrator
//!
//! ## Sync Process
//!
//! 1. **Write**: apply to the cache, send, queue on failure
//! 2. **Detect**: a probe succeeds after the backend was marked offline
//! 3. **Drain**: replay the queue in FIFO order, keep what still fails
//! 4. **Refresh**: after a short grace period, re-fetch every resource
//!
//! # Example
//!
//! ```
//! use focuspond_sync::{MonitorConfig, SyncConfig};
//!
//! let config = SyncConfig {
//!     call_timeout_secs: 5,
//!     ..Default::default()
//! };
//! assert_eq!(config.refresh_grace_ms, 500);
//! assert_eq!(MonitorConfig::default().probe_interval_secs, 5);
//! ```

mod error;
mod keeper;
mod monitor;
mod orchestrator;
pub mod reachability;

pub use error::{SyncError, SyncResult};
pub use keeper::{PondKeeper, StudyOutcome};
pub use monitor::{ConnectivityMonitor, MonitorConfig, MonitorHandle};
pub use orchestrator::{
    Loaded, ReconcileReport, RefreshReport, SyncConfig, SyncOrchestrator, SyncStatus,
    WriteOutcome,
};
pub use reachability::{ReachabilityEvent, ReachabilityState};
