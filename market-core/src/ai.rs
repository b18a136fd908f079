//! Competitor AI
//!
//! A greedy one-piece-at-a-time policy. For every piece with moves left it
//! scores the candidate actions (strike, capture, walk towards an income
//! tile, walk towards an enemy), plays the best one on a scratch copy of the
//! board, and repeats until the piece is spent or has nothing useful to do.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Action, Board};
use crate::grid::{passable_for, Position};
use crate::piece::{PieceId, Side};
use crate::tile::Tile;

/// A piece never gets more actions than this in one turn
const MAX_ACTIONS_PER_PIECE: usize = 3;

/// Weights for scoring candidate actions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiHeuristics {
    /// Multiplier on a tile's share weight when capturing it
    pub capture_weight: f32,
    /// Share-weight equivalent of an influencer tile
    pub influencer_value: f32,
    /// Pull towards uncaptured tiles, divided by distance
    pub income_weight: f32,
    /// Pull towards enemy pieces, divided by distance
    pub hunt_weight: f32,
    /// Multiplier on the damage difference of a fight
    pub aggression: f32,
    pub kill_bonus: f32,
    pub death_penalty: f32,
    /// Random jitter added to every score
    pub noise: f32,
}

impl Default for AiHeuristics {
    fn default() -> Self {
        Self {
            capture_weight: 3.0,
            influencer_value: 2.0,
            income_weight: 2.0,
            hunt_weight: 1.0,
            aggression: 1.0,
            kill_bonus: 5.0,
            death_penalty: 6.0,
            noise: 0.1,
        }
    }
}

/// Competitor AI player
#[derive(Clone, Debug)]
pub struct MarketAi {
    pub heuristics: AiHeuristics,
    rng: ChaCha8Rng,
}

impl MarketAi {
    pub fn new(heuristics: AiHeuristics) -> Self {
        Self {
            heuristics,
            rng: ChaCha8Rng::seed_from_u64(42),
        }
    }

    pub fn with_seed(heuristics: AiHeuristics, seed: u64) -> Self {
        Self {
            heuristics,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Decide a full turn for `side`.
    ///
    /// The real board is not touched: actions are tried on a copy, and the
    /// returned list replays to the same result when applied in order.
    pub fn plan_turn(&mut self, board: &Board, side: Side) -> Vec<Action> {
        let mut scratch = board.clone();
        let mut plan = Vec::new();
        let roster = scratch.player(side).pieces.clone();

        for id in roster {
            for _ in 0..MAX_ACTIONS_PER_PIECE {
                if !scratch.piece(id).is_some_and(|p| p.can_act()) {
                    break;
                }
                let Some(action) = self.choose_action(&scratch, id) else {
                    break;
                };
                if scratch.apply(action).is_rejected() {
                    break;
                }
                plan.push(action);
            }
        }

        tracing::debug!(?side, actions = plan.len(), "turn planned");
        plan
    }

    /// Best-scoring action for one piece, if any is worth taking
    fn choose_action(&mut self, board: &Board, id: PieceId) -> Option<Action> {
        let candidates = self.candidates(board, id);
        let mut best: Option<(f32, Action)> = None;
        for (score, action) in candidates {
            let noisy = score + (self.rng.gen::<f32>() - 0.5) * self.heuristics.noise;
            if best.map_or(true, |(b, _)| noisy > b) {
                best = Some((noisy, action));
            }
        }
        best.map(|(_, action)| action)
    }

    fn candidates(&self, board: &Board, id: PieceId) -> Vec<(f32, Action)> {
        let h = &self.heuristics;
        let mut out = Vec::new();
        let Some(piece) = board.piece(id) else {
            return out;
        };
        let Some(from) = piece.position else {
            return out;
        };
        let side = piece.owner;

        // Capture where we stand
        if let Some(tile) = board.grid().tile_at(from) {
            if tile.is_capturable() && tile.owner != Some(side) {
                out.push((h.capture_weight * self.tile_value(tile), Action::Capture { piece: id }));
            }
        }

        // Strikes; losing trades are kept aside as a last resort
        let mut losing: Option<(f32, Action)> = None;
        for target in board.attack_targets(id) {
            let Some(enemy) = board.piece_at(target) else {
                continue;
            };
            let dealt = piece.damage();
            let taken = enemy.damage();
            let mut score = h.aggression * (dealt - taken) as f32;
            if enemy.health <= dealt {
                score += h.kill_bonus;
            }
            if piece.health <= taken {
                score -= h.death_penalty;
            }
            let strike = (score, Action::Attack { piece: id, target });
            if score >= 0.0 {
                out.push(strike);
            } else if losing.map_or(true, |(b, _)| score > b) {
                losing = Some(strike);
            }
        }

        let reach = board
            .grid()
            .step_distances(from, u32::MAX, |t| passable_for(t, Some(side)));

        // Walk towards the most attractive tile still to be taken
        let tile_goal = board
            .grid()
            .tiles()
            .iter()
            .filter(|t| t.position != from && t.is_capturable() && t.owner != Some(side) && !t.is_occupied())
            .filter_map(|t| {
                reach
                    .get(&t.position)
                    .map(|&d| (h.income_weight * self.tile_value(t) / (1.0 + d as f32), t.position))
            })
            .max_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((score, goal)) = tile_goal {
            if let Some(to) = step_toward(board, id, goal) {
                out.push((score, Action::Move { piece: id, to }));
            }
        }

        // Otherwise close in on the nearest enemy
        let enemy_goal = board
            .pieces_of(side.opponent())
            .filter_map(|e| e.position)
            .filter_map(|pos| {
                pos.neighbors()
                    .filter_map(|n| reach.get(&n))
                    .min()
                    .map(|&d| (d, pos))
            })
            .min();
        if let Some((d, goal)) = enemy_goal {
            if let Some(to) = step_toward(board, id, goal) {
                out.push((h.hunt_weight / (1.0 + d as f32), Action::Move { piece: id, to }));
            }
        }

        if out.is_empty() {
            out.extend(losing);
        }
        out
    }

    fn tile_value(&self, tile: &Tile) -> f32 {
        if tile.is_influencer() {
            self.heuristics.influencer_value
        } else {
            tile.share_weight() as f32
        }
    }
}

/// The valid move that gets the piece closest to `goal`, by walking
/// distance. `None` if no move gets it any closer.
fn step_toward(board: &Board, id: PieceId, goal: Position) -> Option<Position> {
    let piece = board.piece(id)?;
    let from = piece.position?;
    let side = piece.owner;
    let moves = board.valid_moves(id);
    if moves.contains(&goal) {
        return Some(goal);
    }

    let to_goal = board
        .grid()
        .step_distances(goal, u32::MAX, |t| passable_for(t, Some(side)));
    let here = to_goal.get(&from).copied().unwrap_or(u32::MAX);

    moves
        .into_iter()
        .filter_map(|m| to_goal.get(&m).map(|&d| (d, m)))
        .filter(|&(d, _)| d < here)
        .min()
        .map(|(_, m)| m)
}

// ============================================================================
// TESTS
// ============================================================================
