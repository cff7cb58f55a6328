//! Synchronization orchestrator.
//!
//! Binds the snapshot cache, the pending operation log and the remote
//! client. Every write is applied to the cache first, then sent; a send
//! that fails is queued for replay. Reads go to the remote and fall back to
//! the cache. When the backend becomes reachable again the queue is drained
//! and every resource is re-fetched, so the cache converges on what the
//! server actually holds.
//!
//! The account a call is for is always an explicit argument. A session
//! generation, bumped on every account switch, is captured when a call
//! starts; a call that finishes after a switch writes nothing.

use crate::error::{SyncError, SyncResult};
use crate::reachability::ReachabilityEvent;
use focuspond_client::{ClientError, ClientResult, RemoteResources};
use focuspond_storage::{
    keys, DrainOutcome, KeyValueStore, PendingOperationLog, SnapshotCache, SnapshotDelta,
    StorageResult,
};
use focuspond_types::{
    AccountId, Catalog, CreatureId, CreatureImages, Currency, Operation, OwnedCreatures,
    PondCreatures, Resource, ResourceKind, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Deadline for each remote call (seconds).
    pub call_timeout_secs: u64,
    /// Pause between a drain that delivered something and the follow-up
    /// refresh (milliseconds).
    pub refresh_grace_ms: u64,
}

impl SyncConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn refresh_grace(&self) -> Duration {
        Duration::from_millis(self.refresh_grace_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            refresh_grace_ms: 500,
        }
    }
}

/// What happened to a write.
///
/// The cache reflects the write in every case; this only says whether the
/// server has seen it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WriteOutcome {
    /// The backend accepted the write.
    Synced,
    /// The backend call failed; the write is queued for replay.
    Queued,
    /// The call failed and the write could not be queued, or the session
    /// changed while it was in flight.
    Discarded,
}

impl WriteOutcome {
    /// The less settled of two outcomes.
    #[must_use]
    pub fn and(self, other: WriteOutcome) -> WriteOutcome {
        self.max(other)
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, WriteOutcome::Synced)
    }
}

/// A resource read with cache fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded<T> {
    /// Fetched from the backend just now.
    Fresh(T),
    /// The backend was unreachable; this is the cached snapshot.
    Cached(T),
    /// The backend was unreachable and nothing is cached.
    Unavailable,
}

impl<T> Loaded<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Loaded::Fresh(v) | Loaded::Cached(v) => Some(v),
            Loaded::Unavailable => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Loaded::Fresh(v) | Loaded::Cached(v) => Some(v),
            Loaded::Unavailable => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Loaded::Fresh(_))
    }
}

/// Which resources a refresh re-fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: Vec<ResourceKind>,
    pub failed: Vec<ResourceKind>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, kind: ResourceKind, fresh: bool) {
        if fresh {
            self.updated.push(kind);
        } else {
            self.failed.push(kind);
        }
    }
}

/// Result of draining the queue and, if anything was delivered, refreshing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub drain: DrainOutcome,
    pub refresh: Option<RefreshReport>,
}

/// Snapshot of sync health for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub account: Option<AccountId>,
    /// OS-level connectivity, when a monitor is attached.
    pub is_online: Option<bool>,
    pub is_draining: bool,
    pub pending_operations: usize,
    pub last_updated: Vec<(ResourceKind, Option<Timestamp>)>,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    account: Option<AccountId>,
    generation: u64,
}

/// The session a call was started under.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
}

/// Coordinates cache, queue and remote for all reads and writes.
pub struct SyncOrchestrator {
    store: Arc<dyn KeyValueStore>,
    remote: Arc<dyn RemoteResources>,
    cache: SnapshotCache,
    log: PendingOperationLog,
    catalog: Catalog,
    config: SyncConfig,
    session: RwLock<Session>,
    online: Option<watch::Receiver<bool>>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator with no account attached.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteResources>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            cache: SnapshotCache::new(Arc::clone(&store)),
            log: PendingOperationLog::new(Arc::clone(&store)),
            store,
            catalog: Catalog::default(),
            config,
            session: RwLock::new(Session {
                account: None,
                generation: 0,
            }),
            online: None,
        }
    }

    /// Replaces the creature catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Reports OS connectivity in [`SyncStatus`] from a monitor's flag.
    #[must_use]
    pub fn with_online_status(mut self, online: watch::Receiver<bool>) -> Self {
        self.online = Some(online);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ── Session ──────────────────────────────────────────────────

    /// The account currently attached.
    pub fn current_account(&self) -> Option<AccountId> {
        self.read_session().account
    }

    /// Attaches the account a new process runs as.
    ///
    /// Resumes when it matches the account recorded by the previous run and
    /// switches (clearing the recorded account's data) when it does not. On
    /// a first run nothing is recorded yet and the account is resumed.
    pub async fn attach(&self, account: Option<AccountId>) -> SyncResult<Option<ReconcileReport>> {
        match self.recorded_account() {
            Some(previous) if previous == account => {
                self.resume_session(account);
                Ok(None)
            }
            Some(previous) => {
                self.resume_session(previous);
                self.switch_account(account).await
            }
            None => {
                self.resume_session(account);
                self.record_account(account)?;
                Ok(None)
            }
        }
    }

    /// Attaches an account restored at startup, keeping every namespace.
    pub fn resume_session(&self, account: Option<AccountId>) {
        let mut session = self.write_session();
        session.account = account;
        session.generation += 1;
        debug!("Resumed session for {:?}", account);
    }

    /// Switches to another account.
    ///
    /// Calls in flight are invalidated, then the previous account's
    /// snapshots and pending operations are removed. A newly attached
    /// account gets its own leftover queue drained and a full refresh.
    pub async fn switch_account(
        &self,
        account: Option<AccountId>,
    ) -> SyncResult<Option<ReconcileReport>> {
        let (previous, ticket) = {
            let mut session = self.write_session();
            let previous = session.account;
            session.account = account;
            session.generation += 1;
            (
                previous,
                Ticket {
                    generation: session.generation,
                },
            )
        };

        if previous != account {
            let discarded = self.log.count(previous);
            if discarded > 0 {
                warn!(
                    "Discarding {} pending operations for {:?} on account switch",
                    discarded, previous
                );
            }
            self.log.clear(previous)?;
            self.cache.clear_for_account(previous);
        }
        self.record_account(account)?;
        info!("Switched account from {:?} to {:?}", previous, account);

        if account.is_none() {
            return Ok(None);
        }

        Ok(Some(self.reconcile_with(ticket, account, Duration::ZERO).await))
    }

    /// Detaches the current account and removes its local state.
    pub async fn logout(&self) -> SyncResult<()> {
        self.switch_account(None).await?;
        Ok(())
    }

    // ── Writes ───────────────────────────────────────────────────

    pub async fn update_currency(&self, account: Option<AccountId>, amount: i64) -> WriteOutcome {
        self.submit(account, Operation::UpdateCurrency { amount }).await
    }

    pub async fn add_owned_creature(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> WriteOutcome {
        self.submit(account, Operation::AddOwnedCreature { creature_id })
            .await
    }

    pub async fn add_study_minutes(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
        minutes: u32,
    ) -> WriteOutcome {
        self.submit(
            account,
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            },
        )
        .await
    }

    pub async fn reset_creature_progress(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> WriteOutcome {
        self.submit(account, Operation::ResetCreatureProgress { creature_id })
            .await
    }

    pub async fn add_creature_to_pond(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> WriteOutcome {
        self.submit(account, Operation::AddCreatureToPond { creature_id })
            .await
    }

    /// Applies a write to the cache, sends it, and queues it if the send
    /// fails.
    pub async fn submit(&self, account: Option<AccountId>, operation: Operation) -> WriteOutcome {
        let ticket = self.ticket();
        self.cache.apply_delta(account, self.delta_for(&operation));

        let error = match self.call(self.remote.apply(account, &operation)).await {
            Ok(()) => {
                debug!("Synced {}", operation);
                return WriteOutcome::Synced;
            }
            Err(e) => e,
        };

        if !self.is_current(ticket) {
            warn!(
                "Session changed while {} was in flight, not queueing it",
                operation
            );
            return WriteOutcome::Discarded;
        }

        debug!("Failed to send {}: {}", operation, error);
        match self.log.enqueue(account, operation) {
            Ok(_) => WriteOutcome::Queued,
            Err(e) => {
                warn!("Failed to queue operation: {}", e);
                WriteOutcome::Discarded
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    pub async fn load_currency(&self, account: Option<AccountId>) -> Loaded<Currency> {
        self.load(self.ticket(), account, self.remote.get_currency(account))
            .await
    }

    pub async fn load_owned_creatures(&self, account: Option<AccountId>) -> Loaded<OwnedCreatures> {
        self.load(self.ticket(), account, self.remote.get_owned_creatures(account))
            .await
    }

    pub async fn load_pond_creatures(&self, account: Option<AccountId>) -> Loaded<PondCreatures> {
        self.load(self.ticket(), account, self.remote.get_pond_creatures(account))
            .await
    }

    pub async fn load_creature_images(&self, account: Option<AccountId>) -> Loaded<CreatureImages> {
        self.load(self.ticket(), account, self.remote.get_creature_images(account))
            .await
    }

    /// The cached snapshot, without touching the network.
    pub fn cached<R: Resource>(&self, account: Option<AccountId>) -> Option<R> {
        self.cache.get(account)
    }

    /// Re-fetches every resource and overwrites the cache with whatever
    /// arrives.
    pub async fn refresh(&self, account: Option<AccountId>) -> RefreshReport {
        self.refresh_with(self.ticket(), account).await
    }

    async fn refresh_with(&self, ticket: Ticket, account: Option<AccountId>) -> RefreshReport {
        let (currency, owned, pond, images) = futures::join!(
            self.load(ticket, account, self.remote.get_currency(account)),
            self.load(ticket, account, self.remote.get_owned_creatures(account)),
            self.load(ticket, account, self.remote.get_pond_creatures(account)),
            self.load(ticket, account, self.remote.get_creature_images(account)),
        );

        let mut report = RefreshReport::default();
        report.record(ResourceKind::Currency, currency.is_fresh());
        report.record(ResourceKind::OwnedCreatures, owned.is_fresh());
        report.record(ResourceKind::PondCreatures, pond.is_fresh());
        report.record(ResourceKind::CreatureImages, images.is_fresh());

        if report.is_complete() {
            info!("Refreshed all cached resources for {:?}", account);
        } else {
            warn!(
                "Refresh for {:?} incomplete: {} of {} resources failed",
                account,
                report.failed.len(),
                ResourceKind::ALL.len()
            );
        }
        report
    }

    /// Full refresh on explicit request; fails fast when the backend is down.
    pub async fn manual_refresh(&self, account: Option<AccountId>) -> SyncResult<RefreshReport> {
        if let Err(e) = self.call(self.remote.check_health()).await {
            debug!("Manual refresh skipped: {}", e);
            return Err(SyncError::BackendUnreachable);
        }
        Ok(self.refresh(account).await)
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Replays the account's queued operations in order.
    pub async fn drain(&self, account: Option<AccountId>) -> DrainOutcome {
        self.log
            .drain(account, |pending| async move {
                match self.call(self.remote.apply(account, &pending.operation)).await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("Replay of {} failed: {}", pending.operation, e);
                        false
                    }
                }
            })
            .await
    }

    /// Drains the queue and, if anything was delivered, waits the grace
    /// period and refreshes. The refresh is skipped when the session changes
    /// before it starts.
    pub async fn reconcile(&self, account: Option<AccountId>) -> ReconcileReport {
        self.reconcile_under(self.ticket(), account).await
    }

    async fn reconcile_under(&self, ticket: Ticket, account: Option<AccountId>) -> ReconcileReport {
        let drain = self.drain(account).await;
        if drain.succeeded() == 0 {
            return ReconcileReport {
                drain,
                refresh: None,
            };
        }
        self.settle_and_refresh(ticket, account, drain, self.config.refresh_grace())
            .await
    }

    /// Drain then refresh unconditionally, both under `ticket`.
    async fn reconcile_with(
        &self,
        ticket: Ticket,
        account: Option<AccountId>,
        grace: Duration,
    ) -> ReconcileReport {
        let drain = self.drain(account).await;
        self.settle_and_refresh(ticket, account, drain, grace).await
    }

    async fn settle_and_refresh(
        &self,
        ticket: Ticket,
        account: Option<AccountId>,
        drain: DrainOutcome,
        grace: Duration,
    ) -> ReconcileReport {
        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }
        if !self.is_current(ticket) {
            debug!("Session changed before refreshing {:?}, skipping", account);
            return ReconcileReport {
                drain,
                refresh: None,
            };
        }
        let refresh = self.refresh_with(ticket, account).await;
        ReconcileReport {
            drain,
            refresh: Some(refresh),
        }
    }

    /// Reconciles the attached account each time the backend becomes
    /// reachable, until the event channel closes.
    pub fn spawn_reconciler(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<ReachabilityEvent>,
    ) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ReachabilityEvent::BecameReachable) => {}
                    Ok(ReachabilityEvent::BecameUnreachable) => continue,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Missed {} reachability events, reconciling once", missed);
                        while events.try_recv().is_ok() {}
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                let (account, ticket) = sync.attached();
                sync.reconcile_under(ticket, account).await;
            }
            debug!("Reconciler stopped");
        })
    }

    // ── Diagnostics ──────────────────────────────────────────────

    pub fn pending_count(&self, account: Option<AccountId>) -> usize {
        self.log.count(account)
    }

    pub fn last_updated(&self, account: Option<AccountId>, kind: ResourceKind) -> Option<Timestamp> {
        self.cache.last_updated(account, kind)
    }

    pub fn status(&self, account: Option<AccountId>) -> SyncStatus {
        SyncStatus {
            account,
            is_online: self.online.as_ref().map(|rx| *rx.borrow()),
            is_draining: self.log.is_draining(account),
            pending_operations: self.log.count(account),
            last_updated: ResourceKind::ALL
                .iter()
                .map(|kind| (*kind, self.cache.last_updated(account, *kind)))
                .collect(),
        }
    }

    // ── Internals ────────────────────────────────────────────────

    async fn load<R, F>(&self, ticket: Ticket, account: Option<AccountId>, fetch: F) -> Loaded<R>
    where
        R: Resource,
        F: Future<Output = ClientResult<R>>,
    {
        match self.call(fetch).await {
            Ok(value) => {
                if !self.is_current(ticket) {
                    debug!("Session changed during {} fetch, not caching", R::KIND);
                    return Loaded::Fresh(value);
                }
                self.cache.put(account, &value);
                if self.overlay_pending(account, R::KIND) {
                    if let Some(merged) = self.cache.get(account) {
                        return Loaded::Fresh(merged);
                    }
                }
                Loaded::Fresh(value)
            }
            Err(e) => {
                debug!("Falling back to cached {}: {}", R::KIND, e);
                match self.cache.get(account) {
                    Some(value) => Loaded::Cached(value),
                    None => Loaded::Unavailable,
                }
            }
        }
    }

    /// Re-applies queued writes for a resource on top of a fresh snapshot,
    /// so writes the server has not seen yet stay visible. Returns whether
    /// anything was applied.
    ///
    /// Skipped while the queue is draining: entries the backend has already
    /// accepted are still in the log until the pass ends.
    fn overlay_pending(&self, account: Option<AccountId>, kind: ResourceKind) -> bool {
        if self.log.is_draining(account) {
            debug!("Queue for {:?} is draining, not overlaying {}", account, kind);
            return false;
        }
        let mut applied = false;
        for pending in self.log.pending(account) {
            let delta = self.delta_for(&pending.operation);
            if delta.resource() == kind {
                self.cache.apply_delta(account, delta);
                applied = true;
            }
        }
        applied
    }

    fn delta_for(&self, operation: &Operation) -> SnapshotDelta {
        match *operation {
            Operation::UpdateCurrency { amount } => SnapshotDelta::SetCurrency { amount },
            Operation::AddOwnedCreature { creature_id } => SnapshotDelta::AddOwnedCreature {
                creature_id,
                minutes_required: self.catalog.minutes_required(creature_id),
            },
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            } => SnapshotDelta::AddStudyMinutes {
                creature_id,
                minutes,
            },
            Operation::ResetCreatureProgress { creature_id } => {
                SnapshotDelta::RemoveOwnedCreature { creature_id }
            }
            Operation::AddCreatureToPond { creature_id } => {
                SnapshotDelta::AddPondCreature { creature_id }
            }
        }
    }

    async fn call<T, F>(&self, fut: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let timeout = self.config.call_timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(timeout)),
        }
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.read_session().generation,
        }
    }

    /// The account recorded by the last attach or switch; `None` when
    /// nothing usable is recorded.
    fn recorded_account(&self) -> Option<Option<AccountId>> {
        let raw = match self.store.get(keys::CURRENT_ACCOUNT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read the recorded account: {}", e);
                return None;
            }
        };
        if raw == keys::ANONYMOUS_ACCOUNT {
            return Some(None);
        }
        match AccountId::parse(&raw) {
            Ok(id) => Some(Some(id)),
            Err(e) => {
                warn!("Ignoring unreadable recorded account '{}': {}", raw, e);
                None
            }
        }
    }

    fn record_account(&self, account: Option<AccountId>) -> StorageResult<()> {
        let value = account.map_or_else(|| keys::ANONYMOUS_ACCOUNT.to_string(), |id| id.to_string());
        self.store.set(keys::CURRENT_ACCOUNT_KEY, &value)
    }

    /// The attached account and a ticket for its session, read together.
    fn attached(&self) -> (Option<AccountId>, Ticket) {
        let session = self.read_session();
        (
            session.account,
            Ticket {
                generation: session.generation,
            },
        )
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.read_session().generation == ticket.generation
    }

    fn read_session(&self) -> Session {
        match self.session.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        match self.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
