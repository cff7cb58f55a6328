//! Local snapshot cache.
//!
//! Holds the last-known-good value of each server-backed resource, per
//! account. A read returns either a fully decoded value or `None`: missing
//! keys, store failures and decode failures all look like a cache miss to
//! the caller. Writes never fail outward either; problems are logged.

use crate::keys;
use crate::kv::KeyValueStore;
use focuspond_types::{
    AccountId, CreatureId, Currency, OwnedCreature, OwnedCreatures, PondCreature, PondCreatures,
    Resource, ResourceKind, Timestamp,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// An optimistic local change to a cached resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotDelta {
    /// Replaces the coin balance.
    SetCurrency { amount: i64 },
    /// Bumps the quantity of an owned creature, or adds it with no progress.
    AddOwnedCreature {
        creature_id: CreatureId,
        minutes_required: u32,
    },
    /// Credits study minutes to an owned creature already in the cache.
    AddStudyMinutes { creature_id: CreatureId, minutes: u32 },
    /// Drops an owned creature from the inventory.
    RemoveOwnedCreature { creature_id: CreatureId },
    /// Appends a pond creature with the next free local ID.
    AddPondCreature { creature_id: CreatureId },
}

impl SnapshotDelta {
    /// The resource this delta modifies.
    pub const fn resource(&self) -> ResourceKind {
        match self {
            SnapshotDelta::SetCurrency { .. } => ResourceKind::Currency,
            SnapshotDelta::AddOwnedCreature { .. }
            | SnapshotDelta::AddStudyMinutes { .. }
            | SnapshotDelta::RemoveOwnedCreature { .. } => ResourceKind::OwnedCreatures,
            SnapshotDelta::AddPondCreature { .. } => ResourceKind::PondCreatures,
        }
    }
}

/// Per-account cache of resource snapshots.
pub struct SnapshotCache {
    store: Arc<dyn KeyValueStore>,
    /// Serializes writes so a delta's read-modify-write is never interleaved
    /// with another write.
    write_lock: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Reads a snapshot. Any failure is reported as `None`.
    pub fn get<R: Resource>(&self, account: Option<AccountId>) -> Option<R> {
        let key = keys::snapshot_key(R::KIND, account);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Cache miss for {} at '{}'", R::KIND, key);
                return None;
            }
            Err(e) => {
                warn!("Failed to read {} snapshot '{}': {}", R::KIND, key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable {} snapshot '{}': {}", R::KIND, key, e);
                None
            }
        }
    }

    /// Writes a snapshot and stamps its last-updated time.
    pub fn put<R: Resource>(&self, account: Option<AccountId>, value: &R) {
        let _guard = self.lock_writes();
        self.put_unlocked(account, value);
    }

    fn put_unlocked<R: Resource>(&self, account: Option<AccountId>, value: &R) {
        let key = keys::snapshot_key(R::KIND, account);
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode {} snapshot for '{}': {}", R::KIND, key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(&key, &encoded) {
            warn!("Failed to write {} snapshot '{}': {}", R::KIND, key, e);
            return;
        }

        let now = Timestamp::now().as_secs().to_string();
        if let Err(e) = self.store.set(&keys::timestamp_key(&key), &now) {
            warn!("Failed to stamp {} snapshot '{}': {}", R::KIND, key, e);
        }
        debug!("Cached {} under '{}'", R::KIND, key);
    }

    /// When a snapshot was last written, if ever.
    pub fn last_updated(&self, account: Option<AccountId>, kind: ResourceKind) -> Option<Timestamp> {
        let key = keys::timestamp_key(&keys::snapshot_key(kind, account));
        match self.store.get(&key) {
            Ok(Some(raw)) => raw.parse::<i64>().ok().filter(|s| *s > 0).map(Timestamp::from_secs),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read timestamp '{}': {}", key, e);
                None
            }
        }
    }

    /// Applies an optimistic change on top of the cached value.
    pub fn apply_delta(&self, account: Option<AccountId>, delta: SnapshotDelta) {
        let _guard = self.lock_writes();

        match delta {
            SnapshotDelta::SetCurrency { amount } => {
                self.put_unlocked(account, &Currency::new(amount));
            }
            SnapshotDelta::AddOwnedCreature {
                creature_id,
                minutes_required,
            } => {
                let mut owned: OwnedCreatures = self.get(account).unwrap_or_default();
                match owned.iter_mut().find(|c| c.creature_id == creature_id) {
                    Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
                    None => owned.push(OwnedCreature::new(creature_id, minutes_required)),
                }
                self.put_unlocked(account, &owned);
            }
            SnapshotDelta::AddStudyMinutes {
                creature_id,
                minutes,
            } => {
                let Some(mut owned) = self.get::<OwnedCreatures>(account) else {
                    debug!("No cached creatures to credit {} minutes to", minutes);
                    return;
                };
                let Some(creature) = owned.iter_mut().find(|c| c.creature_id == creature_id) else {
                    debug!("Creature {} not in cache, skipping study minutes", creature_id);
                    return;
                };
                creature.minutes_studied = creature.minutes_studied.saturating_add(minutes);
                self.put_unlocked(account, &owned);
            }
            SnapshotDelta::RemoveOwnedCreature { creature_id } => {
                let Some(mut owned) = self.get::<OwnedCreatures>(account) else {
                    return;
                };
                owned.retain(|c| c.creature_id != creature_id);
                self.put_unlocked(account, &owned);
            }
            SnapshotDelta::AddPondCreature { creature_id } => {
                let mut pond: PondCreatures = self.get(account).unwrap_or_default();
                let next_id = pond.iter().map(|p| p.id).max().unwrap_or(0) + 1;
                pond.push(PondCreature {
                    id: next_id,
                    creature_id,
                });
                self.put_unlocked(account, &pond);
            }
        }
    }

    /// Removes every snapshot and timestamp stored for an account.
    ///
    /// Idempotent: clearing an already-empty namespace changes nothing.
    pub fn clear_for_account(&self, account: Option<AccountId>) {
        let _guard = self.lock_writes();
        let keys = keys::snapshot_keys_for(account);
        for key in &keys {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to remove cached key '{}': {}", key, e);
            }
        }
        match account {
            Some(id) => info!("Cleared cached snapshots for account {}", id),
            None => info!("Cleared shared cached snapshots"),
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
