//! Pieces: movement budget, health and the attack exchange

use serde::{Deserialize, Serialize};

use crate::grid::Position;

/// Health every piece starts with before strength is added
pub const BASE_HEALTH: i32 = 10;

/// Extra starting health per point of strength
pub const HEALTH_PER_STRENGTH: i32 = 2;

/// Damage floor, so an exchange always hurts both sides
pub const MIN_DAMAGE: i32 = 1;

/// Which side of the market a piece or tile belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Human = 0,
    Ai = 1,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Human, Side::Ai];

    pub fn opponent(self) -> Self {
        match self {
            Side::Human => Side::Ai,
            Side::Ai => Side::Human,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Stable index into the board's piece arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u32);

/// Damage dealt by each side of one exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    /// Damage the attacker dealt to the defender
    pub attacker: i32,
    /// Damage the defender dealt back to the attacker
    pub defender: i32,
}

/// A unit on the board
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub owner: Side,
    /// Tile the piece stands on; `None` before placement and after death
    pub position: Option<Position>,
    pub moves_remaining: u32,
    pub moves_max: u32,
    pub health: i32,
    pub strength: u32,
    /// Name of the product this piece stands for
    pub product: String,
}

impl Piece {
    /// New piece, exhausted until its owner's turn starts
    pub fn new(id: PieceId, owner: Side, strength: u32, movement: u32, product: &str) -> Self {
        Self {
            id,
            owner,
            position: None,
            moves_remaining: 0,
            moves_max: movement,
            health: BASE_HEALTH + strength as i32 * HEALTH_PER_STRENGTH,
            strength,
            product: product.to_string(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Alive, on the board and with moves left
    pub fn can_act(&self) -> bool {
        self.is_alive() && self.position.is_some() && self.moves_remaining > 0
    }

    pub fn reset(&mut self) {
        self.moves_remaining = self.moves_max;
    }

    pub fn exhaust(&mut self) {
        self.moves_remaining = 0;
    }

    pub(crate) fn spend(&mut self, steps: u32) {
        self.moves_remaining = self.moves_remaining.saturating_sub(steps);
    }

    /// Damage this piece deals in one exchange
    pub fn damage(&self) -> i32 {
        (self.strength as i32).max(MIN_DAMAGE)
    }

    /// Exchange blows with `defender`. Both sides are hit at once, and the
    /// attacker's remaining moves are spent.
    pub fn attack(&mut self, defender: &mut Piece) -> DamageReport {
        let report = DamageReport {
            attacker: self.damage(),
            defender: defender.damage(),
        };
        defender.health -= report.attacker;
        self.health -= report.defender;
        self.exhaust();
        report
    }
}
