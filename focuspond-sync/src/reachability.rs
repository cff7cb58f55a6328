//! Reachability state tracking.
//!
//! Network-level reachability (the OS reports a usable path) and
//! application-level reachability (the backend answers its health probe)
//! fail independently. This module folds both signals into one small state
//! machine and detects the edges the rest of the sync layer reacts to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reachability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReachabilityEvent {
    /// The backend answered after having been marked offline.
    BecameReachable,
    /// The backend stopped answering, or the network path went away.
    BecameUnreachable,
}

impl fmt::Display for ReachabilityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReachabilityEvent::BecameReachable => f.write_str("became reachable"),
            ReachabilityEvent::BecameUnreachable => f.write_str("became unreachable"),
        }
    }
}

/// Combined network and backend reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachabilityState {
    /// Whether the OS reports a usable network path.
    pub is_online: bool,
    /// Set by a failed probe or a lost path; cleared by the next successful
    /// probe, which is the only thing that reports `BecameReachable`.
    pub was_backend_offline_since_last_check: bool,
}

impl Default for ReachabilityState {
    fn default() -> Self {
        Self {
            is_online: true,
            was_backend_offline_since_last_check: false,
        }
    }
}

impl ReachabilityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a health probe result.
    ///
    /// Returns `BecameReachable` exactly once per offline to online
    /// transition and `BecameUnreachable` exactly once per online to offline
    /// transition. Repeated results of the same kind return `None`.
    pub fn record_probe(&mut self, reachable: bool) -> Option<ReachabilityEvent> {
        let was_offline = self.was_backend_offline_since_last_check;
        self.was_backend_offline_since_last_check = !reachable;
        match (was_offline, reachable) {
            (true, true) => Some(ReachabilityEvent::BecameReachable),
            (false, false) => Some(ReachabilityEvent::BecameUnreachable),
            _ => None,
        }
    }

    /// Records an OS network path change.
    ///
    /// Losing the path marks the backend offline, so the next successful
    /// probe reports `BecameReachable`. Regaining it never reports anything
    /// by itself: only a probe proves the backend is back.
    pub fn record_path_change(&mut self, satisfied: bool) -> Option<ReachabilityEvent> {
        self.is_online = satisfied;
        if satisfied {
            return None;
        }
        let was_offline = self.was_backend_offline_since_last_check;
        self.was_backend_offline_since_last_check = true;
        (!was_offline).then_some(ReachabilityEvent::BecameUnreachable)
    }
}
