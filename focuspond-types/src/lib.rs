//! Core type definitions for FocusPond.
//!
//! This crate defines the plain data shared by the storage, client and sync
//! layers:
//! - Account and creature identifiers
//! - Epoch-second timestamps
//! - Server-backed resource snapshots (currency, owned creatures, pond
//!   creatures, creature image sets)
//! - The closed set of mutating operations that can be queued for replay
//! - The built-in creature catalog and growth rules

mod catalog;
mod ids;
mod operation;
mod resource;
mod timestamp;

pub use catalog::{Catalog, CreatureSpecies, GrowthStage, Rarity, DEFAULT_MINUTES_REQUIRED};
pub use ids::{AccountId, CreatureId};
pub use operation::{Operation, OperationId, OperationKind, PendingOperation};
pub use resource::{
    CreatureImageSet, CreatureImages, Currency, OwnedCreature, OwnedCreatures, PondCreature,
    PondCreatures, Resource, ResourceKind,
};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid identifier: {0}")]
    InvalidId(#[from] std::num::ParseIntError),

    #[error("unknown creature species: {0}")]
    UnknownSpecies(String),
}
