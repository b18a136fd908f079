//! Tile kinds, ownership and capture

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::Position;
use crate::piece::{PieceId, Side};

/// Highest income a generated tile can carry
pub const INCOME_MAX: u32 = 3;

/// Percent chances when mixing tile kinds: income, influencer (rest is plain)
const INCOME_CHANCE: u32 = 60;
const INFLUENCER_CHANCE: u32 = 15;

/// What a tile is worth to whoever captures it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TileKind {
    /// No economic effect
    Plain,
    /// Counts towards market share; `base_cost` is the capture cost quoted upstream
    Income { income: u32, base_cost: u32 },
    /// Grants a revenue bonus handled by the economy layer
    Influencer,
}

impl TileKind {
    /// Income tile with a random income level
    pub fn random_income<R: Rng + ?Sized>(rng: &mut R, difficulty: u32) -> Self {
        let income = rng.gen_range(0..=INCOME_MAX);
        TileKind::Income {
            income,
            base_cost: (income + 1) * difficulty.max(1),
        }
    }

    /// Any kind, weighted towards income tiles
    pub fn random<R: Rng + ?Sized>(rng: &mut R, difficulty: u32) -> Self {
        let roll = rng.gen_range(0..100);
        if roll < INCOME_CHANCE {
            Self::random_income(rng, difficulty)
        } else if roll < INCOME_CHANCE + INFLUENCER_CHANCE {
            TileKind::Influencer
        } else {
            TileKind::Plain
        }
    }
}

/// Non-owning link from a tile to the piece standing on it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub piece: PieceId,
    pub owner: Side,
}

/// A placed cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub position: Position,
    pub kind: TileKind,
    pub owner: Option<Side>,
    pub piece: Option<Occupant>,
}

impl Tile {
    /// Unplaced tile; the grid assigns the position on placement
    pub fn new(kind: TileKind) -> Self {
        Self {
            position: Position::new(0, 0),
            kind,
            owner: None,
            piece: None,
        }
    }

    pub fn plain() -> Self {
        Self::new(TileKind::Plain)
    }

    pub fn income(income: u32, base_cost: u32) -> Self {
        Self::new(TileKind::Income { income, base_cost })
    }

    pub fn influencer() -> Self {
        Self::new(TileKind::Influencer)
    }

    pub fn is_occupied(&self) -> bool {
        self.piece.is_some()
    }

    pub fn is_income(&self) -> bool {
        matches!(self.kind, TileKind::Income { .. })
    }

    pub fn is_influencer(&self) -> bool {
        matches!(self.kind, TileKind::Influencer)
    }

    pub fn is_capturable(&self) -> bool {
        match self.kind {
            TileKind::Income { .. } | TileKind::Influencer => true,
            TileKind::Plain => false,
        }
    }

    /// Income tile nobody has captured yet
    pub fn is_uncaptured_income(&self) -> bool {
        self.is_income() && self.owner.is_none()
    }

    pub fn income_value(&self) -> Option<u32> {
        match self.kind {
            TileKind::Income { income, .. } => Some(income),
            _ => None,
        }
    }

    /// Market-share weight (`income + 1`); zero for non-income tiles
    pub fn share_weight(&self) -> u32 {
        self.income_value().map_or(0, |income| income + 1)
    }

    /// Hand the tile to `side`. Returns false when nothing changed.
    pub(crate) fn capture(&mut self, side: Side) -> bool {
        if !self.is_capturable() || self.owner == Some(side) {
            return false;
        }
        self.owner = Some(side);
        true
    }
}
