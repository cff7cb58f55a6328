//! The remote resource seam.

use crate::error::ClientResult;
use async_trait::async_trait;
use focuspond_types::{
    AccountId, CreatureId, CreatureImages, Currency, Operation, OwnedCreatures, PondCreatures,
};

/// Backend operations the sync layer depends on.
///
/// Implementations report any non-2xx answer, transport error or timeout as
/// an `Err`; callers treat all of them alike.
#[async_trait]
pub trait RemoteResources: Send + Sync {
    async fn get_currency(&self, account: Option<AccountId>) -> ClientResult<Currency>;

    async fn set_currency(&self, account: Option<AccountId>, amount: i64) -> ClientResult<()>;

    async fn get_owned_creatures(&self, account: Option<AccountId>) -> ClientResult<OwnedCreatures>;

    async fn add_owned_creature(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()>;

    async fn add_study_minutes(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
        minutes: u32,
    ) -> ClientResult<()>;

    async fn reset_progress(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()>;

    async fn get_pond_creatures(&self, account: Option<AccountId>) -> ClientResult<PondCreatures>;

    async fn add_to_pond(
        &self,
        account: Option<AccountId>,
        creature_id: CreatureId,
    ) -> ClientResult<()>;

    async fn get_creature_images(&self, account: Option<AccountId>) -> ClientResult<CreatureImages>;

    /// Lightweight reachability probe.
    async fn check_health(&self) -> ClientResult<()>;

    /// Sends a queued operation to the matching endpoint.
    async fn apply(&self, account: Option<AccountId>, operation: &Operation) -> ClientResult<()> {
        match *operation {
            Operation::UpdateCurrency { amount } => self.set_currency(account, amount).await,
            Operation::AddOwnedCreature { creature_id } => {
                self.add_owned_creature(account, creature_id).await
            }
            Operation::AddStudyMinutes {
                creature_id,
                minutes,
            } => self.add_study_minutes(account, creature_id, minutes).await,
            Operation::ResetCreatureProgress { creature_id } => {
                self.reset_progress(account, creature_id).await
            }
            Operation::AddCreatureToPond { creature_id } => {
                self.add_to_pond(account, creature_id).await
            }
        }
    }
}
