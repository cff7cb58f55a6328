//! Error types for the sync layer.
//!
//! Network and cache failures never show up here: the orchestrator absorbs
//! them and reports `WriteOutcome`/`Loaded` instead. What remains are
//! lifecycle problems and domain rule violations.

use focuspond_storage::StorageError;
use focuspond_types::CreatureId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The health probe failed, so a manual reload was not attempted.
    #[error("backend unreachable")]
    BackendUnreachable,

    /// Storage error while changing sessions.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Not enough coins for a purchase or spend.
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: i64, required: i64 },

    /// The account already owns this species.
    #[error("creature {0} is already owned")]
    AlreadyOwned(CreatureId),

    /// The creature is not in the account's inventory.
    #[error("creature {0} is not owned")]
    NotOwned(CreatureId),

    /// No species with this ID in the catalog.
    #[error("unknown creature species: {0}")]
    UnknownSpecies(CreatureId),

    /// Amounts and study minutes must be positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),
}
