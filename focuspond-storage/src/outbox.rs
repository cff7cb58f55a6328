//! Pending operation log.
//!
//! An ordered, per-account queue of writes that failed to reach the backend.
//! Each enqueue is persisted before it returns. A drain replays the queue in
//! FIFO order, removes exactly the entries that replayed successfully and
//! persists the result once at the end of the pass.
//!
//! Entries that cannot be decoded (unknown kind, malformed payload) are
//! logged and dropped when the log is loaded, so a bad record can never wedge
//! the queue. A failed store read is different: the persisted list is left
//! exactly as it was and the error is reported to the caller.

use crate::error::{StorageError, StorageResult};
use crate::keys;
use crate::kv::KeyValueStore;
use focuspond_types::{AccountId, Operation, OperationId, PendingOperation};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Result of a completed drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries whose replay succeeded and were removed.
    pub succeeded: usize,
    /// Entries whose replay failed and were kept.
    pub failed: usize,
    /// Undecodable entries discarded while loading.
    pub dropped: usize,
    /// Entries left in the log after the pass, including any enqueued while
    /// the pass was running.
    pub remaining: usize,
}

/// Outcome of a drain request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The pass ran to completion.
    Completed(DrainReport),
    /// Another drain of the same namespace was in flight; nothing was done.
    AlreadyRunning,
    /// The store could not be read or written, so the persisted log was left
    /// as it was. `succeeded` entries reached the backend but are still
    /// queued and will be replayed again.
    StoreUnavailable { succeeded: usize },
}

impl DrainOutcome {
    /// The report, if the pass ran.
    pub fn report(&self) -> Option<DrainReport> {
        match self {
            DrainOutcome::Completed(report) => Some(*report),
            DrainOutcome::AlreadyRunning | DrainOutcome::StoreUnavailable { .. } => None,
        }
    }

    /// Number of operations delivered by this pass.
    pub fn succeeded(&self) -> usize {
        match self {
            DrainOutcome::Completed(report) => report.succeeded,
            DrainOutcome::AlreadyRunning => 0,
            DrainOutcome::StoreUnavailable { succeeded } => *succeeded,
        }
    }
}

/// Per-account FIFO of undelivered writes.
pub struct PendingOperationLog {
    store: Arc<dyn KeyValueStore>,
    /// Serializes load-modify-save cycles on the persisted list.
    write_lock: Mutex<()>,
    /// Namespaces with a drain in flight.
    draining: Mutex<HashSet<String>>,
}

/// Releases a namespace's drain slot when the pass ends, even on panic or
/// cancellation of the drain future.
struct DrainSlot<'a> {
    draining: &'a Mutex<HashSet<String>>,
    key: String,
}

impl Drop for DrainSlot<'_> {
    fn drop(&mut self) {
        let mut draining = match self.draining.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        draining.remove(&self.key);
    }
}

impl PendingOperationLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            draining: Mutex::new(HashSet::new()),
        }
    }

    /// Appends an operation and persists the log before returning.
    pub fn enqueue(
        &self,
        account: Option<AccountId>,
        operation: Operation,
    ) -> StorageResult<PendingOperation> {
        let pending = PendingOperation::new(operation);
        let key = keys::pending_key(account);

        let _guard = self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        let (mut queue, _) = self.load(&key)?;
        queue.push(pending.clone());
        self.save(&key, &queue)?;

        info!(
            "Queued {} for later sync ({} pending at '{}')",
            pending.operation,
            queue.len(),
            key
        );
        Ok(pending)
    }

    /// The queued operations for an account, oldest first. Empty when the
    /// store cannot be read.
    pub fn pending(&self, account: Option<AccountId>) -> Vec<PendingOperation> {
        let key = keys::pending_key(account);
        match self.load(&key) {
            Ok((queue, _)) => queue,
            Err(e) => {
                warn!("Failed to read pending operations at '{}': {}", key, e);
                Vec::new()
            }
        }
    }

    pub fn count(&self, account: Option<AccountId>) -> usize {
        self.pending(account).len()
    }

    /// Whether a drain of the account's log is in flight.
    pub fn is_draining(&self, account: Option<AccountId>) -> bool {
        let key = keys::pending_key(account);
        self.draining
            .lock()
            .map(|d| d.contains(&key))
            .unwrap_or(false)
    }

    /// Removes every queued operation for an account.
    pub fn clear(&self, account: Option<AccountId>) -> StorageResult<()> {
        let key = keys::pending_key(account);
        let _guard = self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        self.store.remove(&key)?;
        info!("Cleared pending operations at '{}'", key);
        Ok(())
    }

    /// Replays every queued operation in FIFO order.
    ///
    /// `replay` returns `true` when the backend accepted the operation. Each
    /// entry is attempted independently: a failure does not stop the pass.
    /// Successful entries are removed and the rest keep their relative order.
    /// Returns [`DrainOutcome::AlreadyRunning`] without touching the log when
    /// another drain of the same account is in flight, and
    /// [`DrainOutcome::StoreUnavailable`] when the log could not be read or
    /// saved.
    pub async fn drain<F, Fut>(&self, account: Option<AccountId>, mut replay: F) -> DrainOutcome
    where
        F: FnMut(PendingOperation) -> Fut,
        Fut: Future<Output = bool>,
    {
        let key = keys::pending_key(account);
        let Some(_slot) = self.claim_drain(&key) else {
            debug!("Drain of '{}' already in flight, skipping", key);
            return DrainOutcome::AlreadyRunning;
        };

        let loaded = {
            let _guard = match self.write_lock.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.load(&key)
        };
        let (queue, dropped) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Cannot read pending operations at '{}', skipping sync: {}", key, e);
                return DrainOutcome::StoreUnavailable { succeeded: 0 };
            }
        };

        if queue.is_empty() && dropped == 0 {
            debug!("No pending operations at '{}'", key);
            return DrainOutcome::Completed(DrainReport::default());
        }

        info!("Starting sync of {} pending operations from '{}'", queue.len(), key);

        let mut delivered: HashSet<OperationId> = HashSet::new();
        let mut failed = 0;
        for pending in queue {
            let id = pending.id;
            let label = pending.operation.to_string();
            if replay(pending).await {
                debug!("Replayed {}", label);
                delivered.insert(id);
            } else {
                warn!("Failed to replay {}, keeping it queued", label);
                failed += 1;
            }
        }

        // Reload so operations enqueued during the pass are preserved.
        let saved = {
            let _guard = match self.write_lock.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.load(&key).and_then(|(current, _)| {
                let rest: Vec<PendingOperation> = current
                    .into_iter()
                    .filter(|p| !delivered.contains(&p.id))
                    .collect();
                self.save(&key, &rest)?;
                Ok(rest.len())
            })
        };
        let remaining = match saved {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(
                    "Failed to update pending operations at '{}', {} delivered entries stay queued: {}",
                    key,
                    delivered.len(),
                    e
                );
                return DrainOutcome::StoreUnavailable {
                    succeeded: delivered.len(),
                };
            }
        };

        let report = DrainReport {
            succeeded: delivered.len(),
            failed,
            dropped,
            remaining,
        };
        info!(
            "Sync complete: {} operations synced, {} failed, {} dropped, {} remaining",
            report.succeeded, report.failed, report.dropped, report.remaining
        );
        DrainOutcome::Completed(report)
    }

    fn claim_drain(&self, key: &str) -> Option<DrainSlot<'_>> {
        let mut draining = match self.draining.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !draining.insert(key.to_string()) {
            return None;
        }
        Some(DrainSlot {
            draining: &self.draining,
            key: key.to_string(),
        })
    }

    /// Loads and decodes the log, returning the decodable entries and the
    /// number of entries discarded. Store failures propagate; only decode
    /// failures drop entries.
    fn load(&self, key: &str) -> StorageResult<(Vec<PendingOperation>, usize)> {
        let Some(raw) = self.store.get(key)? else {
            return Ok((Vec::new(), 0));
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Pending operation log at '{}' is corrupt, discarding: {}", key, e);
                return Ok((Vec::new(), 1));
            }
        };

        let mut dropped = 0;
        let queue = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<PendingOperation>(entry) {
                Ok(pending) => Some(pending),
                Err(e) => {
                    warn!("Dropping undecodable pending operation at '{}': {}", key, e);
                    dropped += 1;
                    None
                }
            })
            .collect();
        Ok((queue, dropped))
    }

    fn save(&self, key: &str, queue: &[PendingOperation]) -> StorageResult<()> {
        if queue.is_empty() {
            return self.store.remove(key);
        }
        let encoded = serde_json::to_string(queue)?;
        self.store.set(key, &encoded)
    }
}
