//! Recipe content entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// A quantity of some resource (item stack, fluid volume, energy amount)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ingredient {
    /// Registry id of the resource
    pub id: String,
    pub amount: u64,
}

impl Ingredient {
    pub fn new(id: impl Into<String>, amount: u64) -> Self {
        Self {
            id: id.into(),
            amount,
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.amount, self.id)
    }
}

/// One entry of a recipe content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub ingredient: Ingredient,
    /// Probability in `[0, 1]` that the entry takes part when the recipe is handled
    pub chance: f32,
    /// Slot the entry is bound to, if the holder distinguishes slots
    pub slot_name: Option<String>,
    /// Label used by recipe viewers
    pub ui_name: Option<String>,
}

impl Content {
    pub fn new(ingredient: Ingredient) -> Self {
        Self {
            ingredient,
            chance: 1.0,
            slot_name: None,
            ui_name: None,
        }
    }

    pub fn with_chance(mut self, chance: f32) -> Self {
        self.chance = if chance.is_nan() {
            0.0
        } else {
            chance.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot_name = Some(slot.into());
        self
    }

    pub fn with_ui_name(mut self, name: impl Into<String>) -> Self {
        self.ui_name = Some(name.into());
        self
    }

    /// Entries with chance 1.0 never consult the random source
    pub fn is_guaranteed(&self) -> bool {
        self.chance >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chance_is_clamped() {
        let c = Content::new(Ingredient::new("iron", 1)).with_chance(1.5);
        assert!(c.is_guaranteed());
        let c = Content::new(Ingredient::new("iron", 1)).with_chance(-0.5);
        assert_eq!(c.chance, 0.0);
        let c = Content::new(Ingredient::new("iron", 1)).with_chance(f32::NAN);
        assert_eq!(c.chance, 0.0);
    }
}
