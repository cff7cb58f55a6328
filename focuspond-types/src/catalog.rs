//! The built-in creature catalog and growth rules.
//!
//! The server only stores species IDs; names, prices and growth targets are
//! shipped with the client.

use crate::{CreatureId, Error};
use serde::{Deserialize, Serialize};

/// Growth target used when a species is missing from the catalog.
pub const DEFAULT_MINUTES_REQUIRED: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Visual growth stage derived from study progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    Egg,
    Juvenile,
    Adult,
}

impl GrowthStage {
    /// Egg below 34%, juvenile below 67%, adult from 67%.
    #[must_use]
    pub fn from_percentage(percent: f32) -> Self {
        if percent >= 67.0 {
            GrowthStage::Adult
        } else if percent >= 34.0 {
            GrowthStage::Juvenile
        } else {
            GrowthStage::Egg
        }
    }
}

/// A purchasable species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureSpecies {
    pub id: CreatureId,
    pub name: String,
    pub rarity: Rarity,
    pub minutes_required: u32,
    pub cost: i64,
    pub egg_sprite: String,
    pub juvenile_sprite: String,
    pub adult_sprite: String,
}

impl CreatureSpecies {
    fn builtin(id: i64, name: &str, rarity: Rarity, minutes_required: u32, cost: i64, sprite: &str) -> Self {
        Self {
            id: CreatureId::new(id),
            name: name.to_string(),
            rarity,
            minutes_required,
            cost,
            egg_sprite: format!("{sprite}_egg"),
            juvenile_sprite: format!("{sprite}_fry"),
            adult_sprite: format!("{sprite}_fish"),
        }
    }
}

/// Species known to this client build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    species: Vec<CreatureSpecies>,
}

impl Catalog {
    #[must_use]
    pub fn new(species: Vec<CreatureSpecies>) -> Self {
        Self { species }
    }

    pub fn species(&self) -> &[CreatureSpecies] {
        &self.species
    }

    #[must_use]
    pub fn get(&self, id: CreatureId) -> Option<&CreatureSpecies> {
        self.species.iter().find(|s| s.id == id)
    }

    /// Looks a species up by ID or case-insensitive name.
    pub fn find(&self, query: &str) -> Result<&CreatureSpecies, Error> {
        let by_id = CreatureId::parse(query).ok().and_then(|id| self.get(id));
        by_id
            .or_else(|| {
                self.species
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(query.trim()))
            })
            .ok_or_else(|| Error::UnknownSpecies(query.to_string()))
    }

    /// Growth target for a species, falling back to the default.
    #[must_use]
    pub fn minutes_required(&self, id: CreatureId) -> u32 {
        self.get(id)
            .map_or(DEFAULT_MINUTES_REQUIRED, |s| s.minutes_required)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            CreatureSpecies::builtin(1, "Gold Fish", Rarity::Common, 60, 0, "gold"),
            CreatureSpecies::builtin(2, "Carp", Rarity::Common, 120, 100, "carp"),
            CreatureSpecies::builtin(3, "Beta", Rarity::Rare, 180, 200, "beta"),
        ])
    }
}
