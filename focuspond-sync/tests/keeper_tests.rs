mod common;

use common::{AccountData, FakeBackend};
use focuspond_storage::MemoryStore;
use focuspond_sync::{PondKeeper, SyncConfig, SyncError, SyncOrchestrator, WriteOutcome};
use focuspond_types::{AccountId, CreatureId, Currency, Operation, OwnedCreature};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const ALICE: Option<AccountId> = Some(AccountId::new(1));

const GOLD_FISH: CreatureId = CreatureId::new(1);
const CARP: CreatureId = CreatureId::new(2);
const BETA: CreatureId = CreatureId::new(3);

async fn setup(data: AccountData) -> (Arc<FakeBackend>, PondKeeper) {
    let backend = Arc::new(FakeBackend::new());
    backend.seed(ALICE, data);
    let sync = Arc::new(SyncOrchestrator::new(
        Arc::new(MemoryStore::new()),
        backend.clone(),
        SyncConfig::default(),
    ));
    sync.refresh(ALICE).await;
    (backend, PondKeeper::new(sync))
}

fn coins(amount: i64) -> AccountData {
    AccountData {
        currency: amount,
        ..Default::default()
    }
}

// ── Coins ────────────────────────────────────────────────────────

#[tokio::test]
async fn earn_adds_to_cached_balance() {
    let (backend, keeper) = setup(coins(40)).await;

    let outcome = keeper.earn(ALICE, 25).await.unwrap();

    assert_eq!(outcome, WriteOutcome::Synced);
    assert_eq!(keeper.balance(ALICE), 65);
    assert_eq!(backend.data(ALICE).currency, 65);
}

#[tokio::test]
async fn earn_rejects_non_positive_amounts() {
    let (_backend, keeper) = setup(coins(0)).await;
    assert!(matches!(
        keeper.earn(ALICE, 0).await,
        Err(SyncError::InvalidAmount(0))
    ));
}

#[tokio::test]
async fn spend_rejects_insufficient_balance() {
    let (backend, keeper) = setup(coins(30)).await;

    let err = keeper.spend(ALICE, 50).await.unwrap_err();

    assert!(matches!(
        err,
        SyncError::InsufficientFunds {
            balance: 30,
            required: 50
        }
    ));
    assert_eq!(backend.applied_count(), 0);
    assert_eq!(keeper.balance(ALICE), 30);
}

#[tokio::test]
async fn offline_balance_changes_are_queued() {
    let (backend, keeper) = setup(coins(100)).await;
    backend.set_online(false);

    assert_eq!(keeper.spend(ALICE, 40).await.unwrap(), WriteOutcome::Queued);
    assert_eq!(keeper.earn(ALICE, 5).await.unwrap(), WriteOutcome::Queued);

    assert_eq!(keeper.balance(ALICE), 65);
    assert_eq!(keeper.orchestrator().pending_count(ALICE), 2);
}

// ── Purchases ────────────────────────────────────────────────────

#[tokio::test]
async fn purchase_spends_cost_and_adds_creature() {
    let (backend, keeper) = setup(coins(250)).await;

    let outcome = keeper.purchase(ALICE, BETA).await.unwrap();

    assert_eq!(outcome, WriteOutcome::Synced);
    assert_eq!(keeper.balance(ALICE), 50);
    assert_eq!(
        keeper.owned(ALICE, BETA),
        Some(OwnedCreature::new(BETA, 180))
    );
    let server = backend.data(ALICE);
    assert_eq!(server.currency, 50);
    assert_eq!(server.owned, vec![OwnedCreature::new(BETA, 180)]);
}

#[tokio::test]
async fn free_species_costs_no_currency_write() {
    let (backend, keeper) = setup(coins(10)).await;

    keeper.purchase(ALICE, GOLD_FISH).await.unwrap();

    assert_eq!(
        backend.applied(),
        vec![(
            ALICE,
            Operation::AddOwnedCreature {
                creature_id: GOLD_FISH
            }
        )]
    );
    assert_eq!(keeper.balance(ALICE), 10);
}

#[tokio::test]
async fn purchase_rejects_owned_species() {
    let (_backend, keeper) = setup(AccountData {
        currency: 500,
        owned: vec![OwnedCreature::new(CARP, 120)],
        ..Default::default()
    })
    .await;

    let err = keeper.purchase(ALICE, CARP).await.unwrap_err();
    assert!(matches!(err, SyncError::AlreadyOwned(id) if id == CARP));
    assert_eq!(keeper.balance(ALICE), 500);
}

#[tokio::test]
async fn purchase_rejects_unaffordable_species() {
    let (_backend, keeper) = setup(coins(99)).await;

    let err = keeper.purchase(ALICE, CARP).await.unwrap_err();
    assert!(matches!(err, SyncError::InsufficientFunds { .. }));
    assert_eq!(keeper.owned(ALICE, CARP), None);
}

#[tokio::test]
async fn purchase_rejects_unknown_species() {
    let (_backend, keeper) = setup(coins(1000)).await;

    let err = keeper.purchase(ALICE, CreatureId::new(42)).await.unwrap_err();
    assert!(matches!(err, SyncError::UnknownSpecies(id) if id == CreatureId::new(42)));
}

#[tokio::test]
async fn offline_purchase_is_queued_in_order() {
    let (backend, keeper) = setup(coins(150)).await;
    backend.set_online(false);

    let outcome = keeper.purchase(ALICE, CARP).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Queued);
    assert_eq!(keeper.balance(ALICE), 50);

    backend.set_online(true);
    keeper.orchestrator().drain(ALICE).await;
    assert_eq!(
        backend.applied(),
        vec![
            (ALICE, Operation::UpdateCurrency { amount: 50 }),
            (ALICE, Operation::AddOwnedCreature { creature_id: CARP }),
        ]
    );
}

// ── Study sessions ───────────────────────────────────────────────

#[tokio::test]
async fn study_session_requires_owned_creature() {
    let (_backend, keeper) = setup(coins(0)).await;

    let err = keeper
        .complete_study_session(ALICE, CARP, 25)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotOwned(id) if id == CARP));
}

#[tokio::test]
async fn partial_session_credits_minutes() {
    let (backend, keeper) = setup(AccountData {
        owned: vec![OwnedCreature::new(CARP, 120)],
        ..Default::default()
    })
    .await;

    let outcome = keeper.complete_study_session(ALICE, CARP, 25).await.unwrap();

    assert_eq!(outcome.write, WriteOutcome::Synced);
    assert!(!outcome.released_to_pond);
    assert_eq!(outcome.creature.map(|c| c.minutes_studied), Some(25));
    assert_eq!(backend.data(ALICE).owned[0].minutes_studied, 25);
    assert!(backend.data(ALICE).pond.is_empty());
}

#[tokio::test]
async fn grown_creature_joins_pond_then_resets() {
    let mut carp = OwnedCreature::new(CARP, 120);
    carp.minutes_studied = 100;
    let (backend, keeper) = setup(AccountData {
        owned: vec![carp],
        ..Default::default()
    })
    .await;

    let outcome = keeper.complete_study_session(ALICE, CARP, 25).await.unwrap();

    assert!(outcome.released_to_pond);
    assert_eq!(keeper.owned(ALICE, CARP), None);
    let server = backend.data(ALICE);
    assert!(server.owned.is_empty());
    assert_eq!(server.pond.len(), 1);
    assert_eq!(server.pond[0].creature_id, CARP);
}

#[tokio::test]
async fn offline_growth_replays_pond_before_reset() {
    let mut fish = OwnedCreature::new(GOLD_FISH, 60);
    fish.minutes_studied = 50;
    let (backend, keeper) = setup(AccountData {
        owned: vec![fish],
        ..Default::default()
    })
    .await;
    backend.set_online(false);

    let outcome = keeper
        .complete_study_session(ALICE, GOLD_FISH, 10)
        .await
        .unwrap();
    assert_eq!(outcome.write, WriteOutcome::Queued);
    assert!(outcome.released_to_pond);
    assert_eq!(keeper.orchestrator().pending_count(ALICE), 3);

    backend.set_online(true);
    assert_eq!(keeper.orchestrator().drain(ALICE).await.succeeded(), 3);
    assert_eq!(
        backend.applied(),
        vec![
            (
                ALICE,
                Operation::AddStudyMinutes {
                    creature_id: GOLD_FISH,
                    minutes: 10
                }
            ),
            (
                ALICE,
                Operation::AddCreatureToPond {
                    creature_id: GOLD_FISH
                }
            ),
            (
                ALICE,
                Operation::ResetCreatureProgress {
                    creature_id: GOLD_FISH
                }
            ),
        ]
    );
    assert_eq!(
        keeper.orchestrator().cached::<Currency>(ALICE),
        Some(Currency::new(0))
    );
}
