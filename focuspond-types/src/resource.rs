//! Server-backed resources and their local snapshot shapes.
//!
//! Field names on the wire follow the backend's JSON (`fish_id`,
//! `time_studied`, ...); the Rust names describe what the values mean.

use crate::catalog::GrowthStage;
use crate::CreatureId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The account's coin balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub amount: i64,
}

impl Currency {
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self { amount }
    }
}

/// A creature in the account's inventory, with its study progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCreature {
    #[serde(rename = "fish_id")]
    pub creature_id: CreatureId,
    pub quantity: u32,
    #[serde(rename = "time_studied")]
    pub minutes_studied: u32,
    #[serde(rename = "total_time_needed")]
    pub minutes_required: u32,
}

impl OwnedCreature {
    /// A freshly acquired creature with no study progress.
    #[must_use]
    pub const fn new(creature_id: CreatureId, minutes_required: u32) -> Self {
        Self {
            creature_id,
            quantity: 1,
            minutes_studied: 0,
            minutes_required,
        }
    }

    /// Study progress as a percentage; zero when nothing is required.
    #[must_use]
    pub fn growth_percentage(&self) -> f32 {
        if self.minutes_required == 0 {
            return 0.0;
        }
        self.minutes_studied as f32 / self.minutes_required as f32 * 100.0
    }

    #[must_use]
    pub fn growth_stage(&self) -> GrowthStage {
        GrowthStage::from_percentage(self.growth_percentage())
    }

    #[must_use]
    pub const fn is_fully_grown(&self) -> bool {
        self.minutes_studied >= self.minutes_required
    }
}

/// A creature released into the account's pond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PondCreature {
    pub id: i64,
    #[serde(rename = "fish_id")]
    pub creature_id: CreatureId,
}

/// Artwork URLs for each growth stage of a species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureImageSet {
    #[serde(rename = "id")]
    pub creature_id: CreatureId,
    pub egg_url: String,
    #[serde(rename = "fry_url")]
    pub juvenile_url: String,
    #[serde(rename = "fish_url")]
    pub adult_url: String,
}

impl CreatureImageSet {
    /// The URL matching a growth stage.
    #[must_use]
    pub fn url_for(&self, stage: GrowthStage) -> &str {
        match stage {
            GrowthStage::Egg => &self.egg_url,
            GrowthStage::Juvenile => &self.juvenile_url,
            GrowthStage::Adult => &self.adult_url,
        }
    }
}

pub type OwnedCreatures = Vec<OwnedCreature>;
pub type PondCreatures = Vec<PondCreature>;
pub type CreatureImages = Vec<CreatureImageSet>;

/// The server-backed resource types the client keeps snapshots of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Currency,
    OwnedCreatures,
    PondCreatures,
    CreatureImages,
}

impl ResourceKind {
    /// Every resource kind, in refresh order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Currency,
        ResourceKind::OwnedCreatures,
        ResourceKind::PondCreatures,
        ResourceKind::CreatureImages,
    ];

    /// Storage key before account namespacing.
    #[must_use]
    pub const fn base_key(&self) -> &'static str {
        match self {
            ResourceKind::Currency => "cached_currency",
            ResourceKind::OwnedCreatures => "cached_owned_creatures",
            ResourceKind::PondCreatures => "cached_pond_creatures",
            ResourceKind::CreatureImages => "cached_creature_images",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            ResourceKind::Currency => "currency",
            ResourceKind::OwnedCreatures => "owned creatures",
            ResourceKind::PondCreatures => "pond creatures",
            ResourceKind::CreatureImages => "creature images",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value that can be stored as a resource snapshot.
///
/// Ties each snapshot type to its `ResourceKind`, so cache reads and writes
/// are checked at compile time rather than by key string.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;
}

impl Resource for Currency {
    const KIND: ResourceKind = ResourceKind::Currency;
}

impl Resource for OwnedCreatures {
    const KIND: ResourceKind = ResourceKind::OwnedCreatures;
}

impl Resource for PondCreatures {
    const KIND: ResourceKind = ResourceKind::PondCreatures;
}

impl Resource for CreatureImages {
    const KIND: ResourceKind = ResourceKind::CreatureImages;
}
