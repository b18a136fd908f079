//! Error types for board construction and configuration

use crate::grid::Position;

/// Errors raised while building a market or loading its configuration.
///
/// Illegal player intents never surface here: they come back as
/// [`crate::board::ActionOutcome::Rejected`] and leave the board untouched.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("position ({}, {}) is outside the grid", .0.row, .0.col)]
    OutOfBounds(Position),

    #[error("a tile is already placed at ({}, {})", .0.row, .0.col)]
    TileOccupied(Position),

    #[error("no tile at ({}, {})", .0.row, .0.col)]
    NoTile(Position),

    #[error("tile at ({}, {}) already holds a piece", .0.row, .0.col)]
    PieceOccupied(Position),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type MarketResult<T> = Result<T, MarketError>;
