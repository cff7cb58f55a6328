//! Connectivity & reachability monitor.
//!
//! Runs on its own task: probes the backend health endpoint on a fixed
//! interval whether or not the OS reports connectivity, and re-probes at
//! once when the OS reports a regained network path. Transitions are
//! published on a broadcast channel; the OS-level online flag is published
//! on a watch channel.

use crate::reachability::{ReachabilityEvent, ReachabilityState};
use focuspond_client::RemoteResources;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Configuration for the connectivity monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between health probes.
    pub probe_interval_secs: u64,
    /// Capacity of the event channel before slow subscribers lag.
    pub event_capacity: usize,
}

impl MonitorConfig {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 5,
            event_capacity: 16,
        }
    }
}

/// Tracks network and backend reachability.
pub struct ConnectivityMonitor {
    remote: Arc<dyn RemoteResources>,
    config: MonitorConfig,
    state: Mutex<ReachabilityState>,
    online_tx: watch::Sender<bool>,
    events_tx: broadcast::Sender<ReachabilityEvent>,
    path_restored: Notify,
}

impl ConnectivityMonitor {
    pub fn new(remote: Arc<dyn RemoteResources>, config: MonitorConfig) -> Self {
        let state = ReachabilityState::new();
        let (online_tx, _) = watch::channel(state.is_online);
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            remote,
            config,
            state: Mutex::new(state),
            online_tx,
            events_tx,
            path_restored: Notify::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Subscribes to reachability transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ReachabilityEvent> {
        self.events_tx.subscribe()
    }

    /// Observes the OS-level online flag.
    pub fn watch_online(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.lock_state().is_online
    }

    /// A copy of the current state.
    pub fn state(&self) -> ReachabilityState {
        *self.lock_state()
    }

    /// Probes the backend once and publishes any resulting transition.
    pub async fn probe(&self) -> bool {
        let reachable = match self.remote.check_health().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Backend not reachable: {}", e);
                false
            }
        };
        let event = self.lock_state().record_probe(reachable);
        if let Some(event) = event {
            self.publish(event);
        }
        reachable
    }

    /// Reports an OS network path change.
    ///
    /// Never blocks; a regained path wakes the monitor task for an
    /// immediate probe.
    pub fn report_path(&self, satisfied: bool) {
        let event = self.lock_state().record_path_change(satisfied);
        self.online_tx.send_replace(satisfied);
        debug!("Network path {}", if satisfied { "satisfied" } else { "lost" });
        if let Some(event) = event {
            self.publish(event);
        }
        if satisfied {
            self.path_restored.notify_one();
        }
    }

    /// Starts the probe loop on a new task.
    pub fn spawn(self: &Arc<Self>) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move {
            monitor.run(shutdown_rx).await;
        });
        info!(
            "Connectivity monitor started, probing every {:?}",
            self.config.probe_interval()
        );
        MonitorHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn run(&self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.probe_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Connectivity monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.probe().await;
                }
                _ = self.path_restored.notified() => {
                    self.probe().await;
                    ticker.reset();
                }
            }
        }
    }

    fn publish(&self, event: ReachabilityEvent) {
        info!("Backend {}", event);
        if self.events_tx.send(event).is_err() {
            debug!("No subscribers for reachability event");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ReachabilityState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Owns the monitor task. Dropping the handle stops the task.
pub struct MonitorHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stops the probe loop and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
