//! Market Core - Territory game engine and competitor AI
//!
//! This crate provides the core logic of the Market minigame:
//! - Hex-offset grid geometry and pathfinding
//! - Tiles, pieces and the attack exchange
//! - Board setup and the move/attack/capture intents
//! - Greedy competitor AI
//! - Turn engine with end conditions and market share

pub mod error;
pub mod grid;
pub mod tile;
pub mod piece;
pub mod product;
pub mod board;
pub mod ai;
pub mod config;
pub mod market;

// Re-exports for convenient access
pub use error::{MarketError, MarketResult};
pub use grid::{Grid, Position};
pub use tile::{Occupant, Tile, TileKind};
pub use piece::{DamageReport, Piece, PieceId, Side};
pub use product::{CompanyFootprint, ProductLevels, ProductStats};
pub use board::{Action, ActionOutcome, Board, BoardSnapshot, CombatReport, Movement, Player, Rejection, Selection};
pub use ai::{AiHeuristics, MarketAi};
pub use config::MarketConfig;
pub use market::{EndReason, Market, MarketEvent, MarketShare, Phase};
