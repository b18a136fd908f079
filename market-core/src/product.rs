//! Product stats consumed from the economy layer
//!
//! The economy allocates each product a level (0-9) for quantity, strength
//! and movement. The market only needs the resulting numbers.

use serde::{Deserialize, Serialize};

/// Value of each level, shared by quantity, strength and movement
pub const LEVEL_VALUES: [u32; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

/// Raw level allocation as produced upstream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLevels {
    pub quantity: usize,
    pub strength: usize,
    pub movement: usize,
}

fn level_value(level: usize) -> u32 {
    LEVEL_VALUES[level.min(LEVEL_VALUES.len() - 1)]
}

/// Numbers a product brings into the market
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStats {
    pub name: String,
    /// Product difficulty; scales the capture cost of income tiles
    pub difficulty: u32,
    /// Number of pieces fielded
    pub quantity: u32,
    pub strength: u32,
    pub movement: u32,
}

impl ProductStats {
    pub fn new(name: &str, difficulty: u32, quantity: u32, strength: u32, movement: u32) -> Self {
        Self {
            name: name.to_string(),
            difficulty,
            quantity,
            strength,
            movement,
        }
    }

    pub fn from_levels(name: &str, difficulty: u32, levels: ProductLevels) -> Self {
        Self::new(
            name,
            difficulty,
            level_value(levels.quantity),
            level_value(levels.strength),
            level_value(levels.movement),
        )
    }

    /// Push-over competitor used on a player's first market visit:
    /// a single piece that cannot move and barely hits back
    pub fn weakened(&self) -> Self {
        Self {
            quantity: 1,
            strength: 0,
            movement: 0,
            ..self.clone()
        }
    }
}

/// Size of the company entering the market; decides the board size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyFootprint {
    pub locations: u32,
    pub markets: u32,
    /// Whether the player has played the market before
    pub seen_market: bool,
}
