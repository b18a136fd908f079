//! Market configuration
//!
//! Loaded from JSON; every field is optional and falls back to the defaults
//! the game ships with.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::AiHeuristics;
use crate::error::{MarketError, MarketResult};
use crate::product::CompanyFootprint;

/// Largest grid a config may ask for, in cells
pub const MAX_GRID_CELLS: usize = 10_000;

/// Tunables for one market session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub rows: i32,
    pub cols: i32,
    /// Turn pairs before the market closes
    pub max_turns: u32,
    /// Tiles every market starts with
    pub base_tiles: u32,
    pub tiles_per_location: u32,
    pub tiles_per_market: u32,
    pub heuristics: AiHeuristics,
    /// Seed for board generation and the AI (None = random)
    pub seed: Option<u64>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            rows: 9,
            cols: 14,
            max_turns: 20,
            base_tiles: 24,
            tiles_per_location: 1,
            tiles_per_market: 3,
            heuristics: AiHeuristics::default(),
            seed: None,
        }
    }
}

impl MarketConfig {
    /// Tiles to lay out for a company, capped at what the grid can hold
    pub fn tile_count(&self, company: &CompanyFootprint) -> usize {
        let wanted = (self.base_tiles as usize)
            .saturating_add((self.tiles_per_location as usize).saturating_mul(company.locations as usize))
            .saturating_add((self.tiles_per_market as usize).saturating_mul(company.markets as usize));
        wanted.min(self.cells())
    }

    /// Cells in the configured grid, saturating on absurd sizes
    fn cells(&self) -> usize {
        (self.rows.max(0) as usize).saturating_mul(self.cols.max(0) as usize)
    }

    pub fn validate(&self) -> MarketResult<()> {
        if self.rows <= 0 || self.cols <= 0 {
            return Err(MarketError::InvalidConfig(format!(
                "grid must be at least 1x1, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.cells() > MAX_GRID_CELLS {
            return Err(MarketError::InvalidConfig(format!(
                "grid {}x{} exceeds {} cells",
                self.rows, self.cols, MAX_GRID_CELLS
            )));
        }
        if self.max_turns == 0 {
            return Err(MarketError::InvalidConfig("max_turns must be positive".to_string()));
        }
        if self.base_tiles == 0 {
            return Err(MarketError::InvalidConfig("base_tiles must be positive".to_string()));
        }
        Ok(())
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: MarketConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
