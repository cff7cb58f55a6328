//! Scriptable in-memory backend for sync tests.

#![allow(dead_code)]

use async_trait::async_trait;
use focuspond_client::{ClientError, ClientResult, RemoteResources};
use focuspond_types::{
    AccountId, Catalog, CreatureId, CreatureImageSet, CreatureImages, Currency, Operation,
    OperationKind, OwnedCreature, OwnedCreatures, PondCreature, PondCreatures,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Routes sync logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Server-side data for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountData {
    pub currency: i64,
    pub owned: OwnedCreatures,
    pub pond: PondCreatures,
}

/// A fake backend holding per-account state.
pub struct FakeBackend {
    accounts: Mutex<HashMap<Option<AccountId>, AccountData>>,
    online: AtomicBool,
    failing: Mutex<HashSet<OperationKind>>,
    health_script: Mutex<VecDeque<bool>>,
    delay: Mutex<Option<Duration>>,
    applied: Mutex<Vec<(Option<AccountId>, Operation)>>,
    health_calls: AtomicUsize,
    next_pond_id: AtomicUsize,
    catalog: Catalog,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            failing: Mutex::new(HashSet::new()),
            health_script: Mutex::new(VecDeque::new()),
            delay: Mutex::new(None),
            applied: Mutex::new(Vec::new()),
            health_calls: AtomicUsize::new(0),
            next_pond_id: AtomicUsize::new(100),
            catalog: Catalog::default(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Makes every call of this kind fail until cleared.
    pub fn fail_kind(&self, kind: OperationKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Queues health probe answers; once exhausted, probes follow `online`.
    pub fn script_health(&self, answers: &[bool]) {
        self.health_script.lock().unwrap().extend(answers.iter().copied());
    }

    /// Delays every data call (not the health probe).
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn seed(&self, account: Option<AccountId>, data: AccountData) {
        self.accounts.lock().unwrap().insert(account, data);
    }

    pub fn data(&self, account: Option<AccountId>) -> AccountData {
        self.accounts
            .lock()
            .unwrap()
            .get(&account)
            .cloned()
            .unwrap_or_default()
    }

    /// Writes the backend accepted, in arrival order.
    pub fn applied(&self) -> Vec<(Option<AccountId>, Operation)> {
        self.applied.lock().unwrap().clone()
    }

    pub fn applied_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    async fn gate(&self, kind: Option<OperationKind>) -> ClientResult<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if let Some(kind) = kind {
            if self.failing.lock().unwrap().contains(&kind) {
                return Err(ClientError::Status {
                    status: 500,
                    body: format!("{kind} rejected"),
                });
            }
        }
        Ok(())
    }

    /// Applies a write to the server state the way the real backend does.
    fn write(&self, account: Option<AccountId>, operation: Operation) -> ClientResult<()> {
        let mut accounts = self.accounts.lock().unwrap();
        let data = accounts.entry(account).or_default();
        match operation {
            Operation::UpdateCurrency { amount } => data.currency = amount,
            Operation::AddOwnedCreature { creature_id } => {
                match data.owned.iter_mut().find(|c| c.creature_id == creature_id) {
                    Some(existing) => existing.quantity += 1,
                    None => data.owned.push(OwnedCreature::new(
                        creature_id,
                        self.catalog.minutes_required(creature_id),
                    )),
                }
            }
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            } => {
                let creature = data
                    .owned
                    .iter_mut()
                    .find(|c| c.creature_id == creature_id)
                    .ok_or_else(not_found)?;
                creature.minutes_studied += minutes;
            }
            Operation::ResetCreatureProgress { creature_id } => {
                let before = data.owned.len();
                data.owned.retain(|c| c.creature_id != creature_id);
                if data.owned.len() == before {
                    return Err(not_found());
                }
            }
            Operation::AddCreatureToPond { creature_id } => {
                let id = self.next_pond_id.fetch_add(1, Ordering::SeqCst) as i64;
                data.pond.push(PondCreature { id, creature_id });
            }
        }
        drop(accounts);
        self.applied.lock().unwrap().push((account, operation));
        Ok(())
    }

    async fn mutate(&self, account: Option<AccountId>, operation: Operation) -> ClientResult<()> {
        self.gate(Some(operation.kind())).await?;
        self.write(account, operation)
    }
}

pub fn unavailable() -> ClientError {
    ClientError::Status {
        status: 503,
        body: "backend offline".to_string(),
    }
}

fn not_found() -> ClientError {
    ClientError::Status {
        status: 404,
        body: "not found".to_string(),
    }
}

pub fn images() -> CreatureImages {
    vec![CreatureImageSet {
        creature_id: CreatureId::new(1),
        egg_url: "https://img/1/egg.png".to_string(),
        juvenile_url: "https://img/1/fry.png".to_string(),
        adult_url: "https://img/1/fish.png".to_string(),
    }]
}

#[async_trait]
impl RemoteResources for FakeBackend {
    async fn get_currency(&self, account: Option<AccountId>) -> ClientResult<Currency> {
        self.gate(None).await?;
        Ok(Currency::new(self.data(account).currency))
    }

    async fn set_currency(&self, account: Option<AccountId>, amount: i64) -> ClientResult<()> {
        self.mutate(account, Operation::UpdateCurrency { amount })
            .await
    }

    async fn get_owned_creatures(&self, account: Option<AccountId>) -> ClientResult<OwnedCreatures> {
        self.gate(None).await?;
        Ok(self.data(account).owned)
    }

    async fn add_owned_creature(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()> {
        self.mutate(account, Operation::AddOwnedCreature { creature_id })
            .await
    }

    async fn add_study_minutes(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
        minutes: u32,
    ) -> ClientResult<()> {
        self.mutate(
            account,
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            },
        )
        .await
    }

    async fn reset_progress(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()> {
        self.mutate(account, Operation::ResetCreatureProgress { creature_id })
            .await
    }

    async fn get_pond_creatures(&self, account: Option<AccountId>) -> ClientResult<PondCreatures> {
        self.gate(None).await?;
        Ok(self.data(account).pond)
    }

    async fn add_to_pond(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()> {
        self.mutate(account, Operation::AddCreatureToPond { creature_id })
            .await
    }

    async fn get_creature_images(&self, _account: Option<AccountId>) -> ClientResult<CreatureImages> {
        self.gate(None).await?;
        Ok(images())
    }

    async fn check_health(&self) -> ClientResult<()> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.health_script.lock().unwrap().pop_front();
        let up = scripted.unwrap_or_else(|| self.online.load(Ordering::SeqCst));
        if up { Ok(()) } else { Err(unavailable()) }
    }
}
