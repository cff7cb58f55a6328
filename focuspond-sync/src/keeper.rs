//! Domain façade over the orchestrator.
//!
//! Game rules (coins, purchases, study sessions) expressed purely as
//! orchestrator reads and writes. Balances and inventories come from the
//! cache, which already includes optimistic writes.

use crate::error::{SyncError, SyncResult};
use crate::orchestrator::{SyncOrchestrator, WriteOutcome};
use focuspond_types::{AccountId, CreatureId, Currency, OwnedCreature, OwnedCreatures};
use std::sync::Arc;
use tracing::info;

/// Result of recording a study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyOutcome {
    /// Combined outcome of every write the session issued.
    pub write: WriteOutcome,
    /// The creature's state after the minutes were credited.
    pub creature: Option<OwnedCreature>,
    /// Whether the creature grew up and was released into the pond.
    pub released_to_pond: bool,
}

/// Game actions for one device.
pub struct PondKeeper {
    sync: Arc<SyncOrchestrator>,
}

impl PondKeeper {
    pub fn new(sync: Arc<SyncOrchestrator>) -> Self {
        Self { sync }
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.sync
    }

    /// Cached coin balance; zero when nothing is cached.
    pub fn balance(&self, account: Option<AccountId>) -> i64 {
        self.sync
            .cached::<Currency>(account)
            .map_or(0, |c| c.amount)
    }

    /// Cached inventory entry for a creature.
    pub fn owned(&self, account: Option<AccountId>, creature_id: CreatureId) -> Option<OwnedCreature> {
        self.sync
            .cached::<OwnedCreatures>(account)
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.creature_id == creature_id)
    }

    /// Adds coins to the balance.
    pub async fn earn(&self, account: Option<AccountId>, coins: i64) -> SyncResult<WriteOutcome> {
        if coins <= 0 {
            return Err(SyncError::InvalidAmount(coins));
        }
        let amount = self.balance(account).saturating_add(coins);
        Ok(self.sync.update_currency(account, amount).await)
    }

    /// Removes coins from the balance; fails if the balance is too low.
    pub async fn spend(&self, account: Option<AccountId>, coins: i64) -> SyncResult<WriteOutcome> {
        if coins < 0 {
            return Err(SyncError::InvalidAmount(coins));
        }
        let balance = self.balance(account);
        if balance < coins {
            return Err(SyncError::InsufficientFunds {
                balance,
                required: coins,
            });
        }
        Ok(self.sync.update_currency(account, balance - coins).await)
    }

    /// Buys one creature of a species.
    pub async fn purchase(
        &self,
        account: Option<AccountId>,
        species_id: CreatureId,
    ) -> SyncResult<WriteOutcome> {
        let species = self
            .sync
            .catalog()
            .get(species_id)
            .ok_or(SyncError::UnknownSpecies(species_id))?;
        if self.owned(account, species_id).is_some() {
            return Err(SyncError::AlreadyOwned(species_id));
        }

        let cost = species.cost;
        let name = species.name.clone();
        let paid = if cost > 0 {
            self.spend(account, cost).await?
        } else {
            WriteOutcome::Synced
        };
        let added = self.sync.add_owned_creature(account, species_id).await;
        info!("Purchased {} for {} coins", name, cost);
        Ok(paid.and(added))
    }

    /// Credits a finished study session to a creature.
    ///
    /// A creature that reaches its growth target is added to the pond and
    /// then has its progress reset. The order matters: replaying the queue
    /// must see the pond write before the reset.
    pub async fn complete_study_session(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
        minutes: u32,
    ) -> SyncResult<StudyOutcome> {
        if minutes == 0 {
            return Err(SyncError::InvalidAmount(0));
        }
        if self.owned(account, creature_id).is_none() {
            return Err(SyncError::NotOwned(creature_id));
        }

        let mut write = self
            .sync
            .add_study_minutes(account, creature_id, minutes)
            .await;
        let creature = self.owned(account, creature_id);

        let grown = creature.as_ref().is_some_and(OwnedCreature::is_fully_grown);
        if grown {
            write = write.and(self.sync.add_creature_to_pond(account, creature_id).await);
            write = write.and(self.sync.reset_creature_progress(account, creature_id).await);
            info!("Creature {} is fully grown and joined the pond", creature_id);
        }

        Ok(StudyOutcome {
            write,
            creature,
            released_to_pond: grown,
        })
    }
}
