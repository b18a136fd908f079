//! Board: tile layout, piece placement and the move/attack/capture rules
//!
//! The board owns the grid and an arena of every piece ever fielded. Tiles
//! point at pieces by [`PieceId`] and pieces point back by [`Position`];
//! every mutation below keeps both ends of that link in step.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::MarketConfig;
use crate::error::{MarketError, MarketResult};
use crate::grid::{passable_for, Grid, Position};
use crate::piece::{Piece, PieceId, Side};
use crate::product::{CompanyFootprint, ProductStats};
use crate::tile::{Occupant, Tile, TileKind};

pub const HUMAN_COLOR: u32 = 0x1C1FE8;
pub const AI_COLOR: u32 = 0xF7202F;

// ============================================================================
// PLAYERS AND OUTCOMES
// ============================================================================

/// One side of the market and its roster of living pieces
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub side: Side,
    pub human: bool,
    pub color: u32,
    /// Living pieces, in the order they were fielded
    pub pieces: Vec<PieceId>,
}

impl Player {
    pub fn new(side: Side) -> Self {
        let (human, color) = match side {
            Side::Human => (true, HUMAN_COLOR),
            Side::Ai => (false, AI_COLOR),
        };
        Self {
            side,
            human,
            color,
            pieces: Vec::new(),
        }
    }
}

/// A value for each participant of a fight
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duel<T> {
    pub attacker: T,
    pub defender: T,
}

/// What happened in one fight
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub attacker: PieceId,
    pub defender: PieceId,
    pub destroyed: Duel<bool>,
    pub damage_taken: Duel<i32>,
    /// Where each piece stood when the fight started
    pub tiles: Duel<Position>,
}

/// A completed walk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub piece: PieceId,
    pub from: Position,
    pub to: Position,
    /// Every step taken, excluding `from`
    pub path: Vec<Position>,
}

impl Movement {
    pub fn cost(&self) -> u32 {
        self.path.len() as u32
    }
}

/// Something a side asks one of its pieces to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move { piece: PieceId, to: Position },
    Attack { piece: PieceId, target: Position },
    Capture { piece: PieceId },
}

impl Action {
    pub fn piece(&self) -> PieceId {
        match *self {
            Action::Move { piece, .. } | Action::Attack { piece, .. } | Action::Capture { piece } => piece,
        }
    }
}

/// Why an intent was ignored
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    UnknownPiece,
    NotOnBoard,
    NoMovesLeft,
    NotYourTurn,
    MatchOver,
    NotAValidMove,
    NoPath,
    NoEnemy,
    OutOfReach,
    NotCapturable,
    AlreadyOwned,
}

/// Result of applying an [`Action`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Moved(Movement),
    /// A fight, possibly after walking up to the target
    Attacked {
        approach: Option<Movement>,
        report: CombatReport,
    },
    /// Walked up to an enemy but had no moves left to strike
    Approached(Movement),
    Captured {
        piece: PieceId,
        tile: Position,
        kind: TileKind,
    },
    /// Nothing changed
    Rejected(Rejection),
}

impl ActionOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, ActionOutcome::Rejected(_))
    }

    pub fn combat(&self) -> Option<&CombatReport> {
        match self {
            ActionOutcome::Attacked { report, .. } => Some(report),
            _ => None,
        }
    }
}

/// Highlight data for a selected tile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub tile: Position,
    pub piece: Option<PieceId>,
    pub valid_moves: Vec<Position>,
    pub attack_targets: Vec<Position>,
}

/// Read-only view for drawing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub rows: i32,
    pub cols: i32,
    pub tiles: Vec<Tile>,
    pub pieces: Vec<Piece>,
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Clone, Debug)]
pub struct Board {
    grid: Grid,
    /// Arena: index == `PieceId`. Dead pieces stay here off-board.
    pieces: Vec<Piece>,
    players: [Player; 2],
}

impl Board {
    /// Empty board with no tiles or pieces
    pub fn new(rows: i32, cols: i32) -> Self {
        Self {
            grid: Grid::new(rows, cols),
            pieces: Vec::new(),
            players: [Player::new(Side::Human), Player::new(Side::Ai)],
        }
    }

    /// Build the full market board: a random connected blob of tiles sized
    /// by the company footprint, then both sides' pieces spread over it
    pub fn generate<R: Rng + ?Sized>(
        config: &MarketConfig,
        company: &CompanyFootprint,
        human: &ProductStats,
        ai: &ProductStats,
        rng: &mut R,
    ) -> MarketResult<Self> {
        let mut board = Board::new(config.rows, config.cols);
        let n_tiles = config.tile_count(company);
        board.setup_tiles(n_tiles, company.seen_market, human.difficulty, rng)?;

        let armies = [
            field_pieces(Side::Human, human),
            field_pieces(Side::Ai, ai),
        ];
        board.setup_players(armies, rng)?;

        tracing::debug!(
            tiles = board.grid.len(),
            human_pieces = board.players[0].pieces.len(),
            ai_pieces = board.players[1].pieces.len(),
            "market board generated"
        );
        Ok(board)
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    /// Place `n_tiles` tiles as one connected blob grown from the center
    pub fn setup_tiles<R: Rng + ?Sized>(
        &mut self,
        n_tiles: usize,
        mixed: bool,
        difficulty: u32,
        rng: &mut R,
    ) -> MarketResult<()> {
        let n_tiles = n_tiles.min(self.grid.capacity());
        if n_tiles == 0 {
            return Ok(());
        }

        let random_kind = |rng: &mut R| {
            if mixed {
                TileKind::random(rng, difficulty)
            } else {
                TileKind::random_income(rng, difficulty)
            }
        };

        let center = self.center();
        let kind = random_kind(rng);
        self.place_tile(center, kind)?;
        let mut placed = vec![center];

        while placed.len() < n_tiles {
            let mut seen = FxHashSet::default();
            let frontier: Vec<Position> = placed
                .iter()
                .flat_map(|p| self.grid.adjacent_no_tile_positions(*p))
                .filter(|p| seen.insert(*p))
                .collect();
            let Some(&pos) = frontier.choose(rng) else {
                break;
            };
            let kind = random_kind(rng);
            self.place_tile(pos, kind)?;
            placed.push(pos);
        }

        Ok(())
    }

    /// Spread each side's pieces: one starting position per side, the rest
    /// clustered next to pieces already placed
    fn setup_players<R: Rng + ?Sized>(&mut self, armies: [Vec<Piece>; 2], rng: &mut R) -> MarketResult<()> {
        let fielding: Vec<Side> = Side::ALL
            .into_iter()
            .filter(|s| !armies[s.index()].is_empty())
            .collect();
        let starts = self.starting_positions(fielding.len(), rng);

        let mut rest: [Vec<Piece>; 2] = [Vec::new(), Vec::new()];
        for (i, army) in armies.into_iter().enumerate() {
            let mut army = army.into_iter();
            let first = army.next();
            rest[i] = army.collect();

            let Some(first) = first else { continue };
            let slot = fielding.iter().position(|s| s.index() == i);
            match slot.and_then(|k| starts.get(k)) {
                Some(&pos) => {
                    self.add_piece(first, pos)?;
                }
                None => tracing::warn!(side = ?first.owner, "no starting tile left, piece dropped"),
            }
        }

        for (i, army) in rest.into_iter().enumerate() {
            let side = Side::ALL[i];
            for piece in army {
                let mut seen = FxHashSet::default();
                let mut candidates: Vec<Position> = self
                    .pieces_of(side)
                    .filter_map(|p| p.position)
                    .flat_map(|p| self.grid.adjacent_unoccupied_tile_positions(p))
                    .filter(|p| seen.insert(*p))
                    .collect();
                if candidates.is_empty() {
                    candidates = self
                        .grid
                        .tiles()
                        .iter()
                        .filter(|t| !t.is_occupied())
                        .map(|t| t.position)
                        .collect();
                }
                match candidates.choose(rng) {
                    Some(&pos) => {
                        self.add_piece(piece, pos)?;
                    }
                    None => tracing::warn!(?side, "board full, piece dropped"),
                }
            }
        }

        Ok(())
    }

    /// First start uniformly at random; each later one greedily maximises the
    /// summed taxicab distance to the starts chosen so far
    pub fn starting_positions<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Position> {
        let tiles: Vec<Position> = self.grid.tile_positions().collect();
        let mut starts = Vec::with_capacity(count);
        if count == 0 {
            return starts;
        }
        let Some(&first) = tiles.choose(rng) else {
            return starts;
        };
        starts.push(first);

        while starts.len() < count {
            let mut best: Option<(u32, Position)> = None;
            for &pos in &tiles {
                if starts.contains(&pos) {
                    continue;
                }
                let score: u32 = starts.iter().map(|s| pos.taxicab_to(*s)).sum();
                if best.map_or(true, |(b, _)| score > b) {
                    best = Some((score, pos));
                }
            }
            match best {
                Some((_, pos)) => starts.push(pos),
                None => break,
            }
        }

        starts
    }

    pub fn place_tile(&mut self, pos: Position, kind: TileKind) -> MarketResult<()> {
        self.grid.set_tile_at(pos, Tile::new(kind))
    }

    /// Field a piece on an empty tile. The board assigns its id.
    pub fn add_piece(&mut self, mut piece: Piece, pos: Position) -> MarketResult<PieceId> {
        let tile = self.grid.tile_at(pos).ok_or(MarketError::NoTile(pos))?;
        if tile.is_occupied() {
            return Err(MarketError::PieceOccupied(pos));
        }
        let id = PieceId(self.pieces.len() as u32);
        piece.id = id;
        piece.position = None;
        let owner = piece.owner;
        self.pieces.push(piece);
        self.players[owner.index()].pieces.push(id);
        self.place_piece_at(id, pos);
        Ok(id)
    }

    /// Shorthand for fielding one piece of `stats`
    pub fn spawn_piece(&mut self, side: Side, stats: &ProductStats, pos: Position) -> MarketResult<PieceId> {
        let piece = Piece::new(PieceId(0), side, stats.strength, stats.movement, &stats.name);
        self.add_piece(piece, pos)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Where the first tile goes: `(round(rows/2), round(cols/2))`
    pub fn center(&self) -> Position {
        let rows = self.grid.rows();
        let cols = self.grid.cols();
        Position::new(((rows + 1) / 2).min(rows - 1), ((cols + 1) / 2).min(cols - 1))
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0 as usize)
    }

    pub fn player(&self, side: Side) -> &Player {
        &self.players[side.index()]
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    /// Living pieces of `side`, in roster order
    pub fn pieces_of(&self, side: Side) -> impl Iterator<Item = &Piece> + '_ {
        self.players[side.index()]
            .pieces
            .iter()
            .map(|id| &self.pieces[id.0 as usize])
    }

    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        let occ = self.grid.tile_at(pos)?.piece?;
        self.piece(occ.piece)
    }

    pub fn income_tiles(&self) -> Vec<&Tile> {
        self.grid.tiles().iter().filter(|t| t.is_income()).collect()
    }

    pub fn influencer_tiles(&self) -> Vec<&Tile> {
        self.grid.tiles().iter().filter(|t| t.is_influencer()).collect()
    }

    pub fn uncaptured_tiles(&self) -> Vec<&Tile> {
        self.grid
            .tiles()
            .iter()
            .filter(|t| t.is_uncaptured_income())
            .collect()
    }

    /// Summed income of the income tiles `side` holds
    pub fn income(&self, side: Side) -> u32 {
        self.grid
            .tiles()
            .iter()
            .filter(|t| t.owner == Some(side))
            .filter_map(|t| t.income_value())
            .sum()
    }

    /// Number of influencer tiles `side` holds
    pub fn influence(&self, side: Side) -> usize {
        self.grid
            .tiles()
            .iter()
            .filter(|t| t.is_influencer() && t.owner == Some(side))
            .count()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            tiles: self.grid.tiles().to_vec(),
            pieces: self
                .players
                .iter()
                .flat_map(|p| p.pieces.iter())
                .map(|id| self.pieces[id.0 as usize].clone())
                .collect(),
        }
    }

    // ========================================================================
    // TURN BOOKKEEPING
    // ========================================================================

    pub fn reset_side(&mut self, side: Side) {
        for id in &self.players[side.index()].pieces {
            self.pieces[id.0 as usize].reset();
        }
    }

    pub fn exhaust_side(&mut self, side: Side) {
        for id in &self.players[side.index()].pieces {
            self.pieces[id.0 as usize].exhaust();
        }
    }

    /// True when `side` has no pieces, or none with moves left
    pub fn check_done(&self, side: Side) -> bool {
        self.pieces_of(side).all(|p| p.moves_remaining == 0)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Highlight data for a tile: the piece on it, where it can move and
    /// what it can strike. A pure query; nothing is stored.
    pub fn select_tile(&self, pos: Position) -> Option<Selection> {
        self.grid.tile_at(pos).map(|tile| match tile.piece {
            Some(occ) => Selection {
                tile: pos,
                piece: Some(occ.piece),
                valid_moves: self.valid_moves(occ.piece),
                attack_targets: self.attack_targets(occ.piece),
            },
            None => Selection {
                tile: pos,
                piece: None,
                valid_moves: Vec::new(),
                attack_targets: Vec::new(),
            },
        })
    }

    /// Empty tiles the piece can walk to with its remaining moves
    pub fn valid_moves(&self, id: PieceId) -> Vec<Position> {
        match self.piece(id) {
            Some(Piece {
                position: Some(pos),
                moves_remaining,
                ..
            }) => self.grid.valid_move_positions(*pos, *moves_remaining),
            _ => Vec::new(),
        }
    }

    /// Enemy-held tiles the piece can still strike this turn, either from
    /// where it stands or after walking next to them with a move to spare
    pub fn attack_targets(&self, id: PieceId) -> Vec<Position> {
        let Some(piece) = self.piece(id) else {
            return Vec::new();
        };
        let Some(from) = piece.position else {
            return Vec::new();
        };
        if piece.moves_remaining == 0 {
            return Vec::new();
        }

        let owner = piece.owner;
        let dist = self
            .grid
            .step_distances(from, piece.moves_remaining - 1, |t| passable_for(t, Some(owner)));

        let mut targets: Vec<Position> = dist
            .iter()
            .filter(|(pos, _)| **pos == from || self.grid.tile_at(**pos).is_some_and(|t| !t.is_occupied()))
            .flat_map(|(pos, _)| pos.neighbors())
            .filter(|n| self.is_enemy_of(*n, owner))
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    fn is_enemy_of(&self, pos: Position, side: Side) -> bool {
        self.grid
            .tile_at(pos)
            .and_then(|t| t.piece)
            .is_some_and(|occ| occ.owner != side)
    }

    /// Shortest walk for the piece through empty or friendly tiles
    pub fn find_legal_path(&self, id: PieceId, target: Position) -> Option<Vec<Position>> {
        let piece = self.piece(id)?;
        let from = piece.position?;
        let owner = piece.owner;
        self.grid
            .find_legal_path(from, target, |t| passable_for(t, Some(owner)))
    }

    // ========================================================================
    // INTENTS
    // ========================================================================

    pub fn apply(&mut self, action: Action) -> ActionOutcome {
        match action {
            Action::Move { piece, to } => self.request_move(piece, to),
            Action::Attack { piece, target } => self.request_attack(piece, target),
            Action::Capture { piece } => self.request_capture(piece),
        }
    }

    /// Walk a piece to an empty tile among its valid moves
    pub fn request_move(&mut self, id: PieceId, to: Position) -> ActionOutcome {
        if let Err(reason) = self.ready_piece(id) {
            return ActionOutcome::Rejected(reason);
        }
        if !self.valid_moves(id).contains(&to) {
            return ActionOutcome::Rejected(Rejection::NotAValidMove);
        }
        match self.find_legal_path(id, to) {
            Some(path) if !path.is_empty() => ActionOutcome::Moved(self.walk(id, path)),
            _ => ActionOutcome::Rejected(Rejection::NoPath),
        }
    }

    /// Fight the enemy on `target`. Adjacent enemies are hit directly;
    /// farther ones are approached first, then hit if moves remain.
    pub fn request_attack(&mut self, id: PieceId, target: Position) -> ActionOutcome {
        let (from, owner) = match self.ready_piece(id) {
            Ok(ready) => ready,
            Err(reason) => return ActionOutcome::Rejected(reason),
        };
        let defender = match self.grid.tile_at(target).and_then(|t| t.piece) {
            Some(occ) if occ.owner != owner => occ.piece,
            _ => return ActionOutcome::Rejected(Rejection::NoEnemy),
        };

        if from.distance_to(target) <= 1 {
            let report = self.resolve_combat(id, from, defender, target);
            return ActionOutcome::Attacked {
                approach: None,
                report,
            };
        }

        let Some(stop) = self.approach_tile(id, target) else {
            return ActionOutcome::Rejected(Rejection::OutOfReach);
        };
        let path = match self.find_legal_path(id, stop) {
            Some(path) if !path.is_empty() => path,
            _ => return ActionOutcome::Rejected(Rejection::NoPath),
        };
        let approach = self.walk(id, path);

        let still_able = self.pieces[id.0 as usize].moves_remaining > 0;
        if still_able && approach.to.distance_to(target) <= 1 {
            let report = self.resolve_combat(id, approach.to, defender, target);
            ActionOutcome::Attacked {
                approach: Some(approach),
                report,
            }
        } else {
            ActionOutcome::Approached(approach)
        }
    }

    /// Capture the tile the piece stands on
    pub fn request_capture(&mut self, id: PieceId) -> ActionOutcome {
        let (pos, owner) = match self.ready_piece(id) {
            Ok(ready) => ready,
            Err(reason) => return ActionOutcome::Rejected(reason),
        };
        let Some(tile) = self.grid.tile_at_mut(pos) else {
            return ActionOutcome::Rejected(Rejection::NotOnBoard);
        };
        if !tile.is_capturable() {
            return ActionOutcome::Rejected(Rejection::NotCapturable);
        }
        if !tile.capture(owner) {
            return ActionOutcome::Rejected(Rejection::AlreadyOwned);
        }
        let kind = tile.kind;
        self.pieces[id.0 as usize].exhaust();

        tracing::debug!(piece = id.0, row = pos.row, col = pos.col, ?owner, "tile captured");
        ActionOutcome::Captured {
            piece: id,
            tile: pos,
            kind,
        }
    }

    // ========================================================================
    // MUTATION HELPERS
    // ========================================================================

    /// Position and owner of a piece that may act right now
    fn ready_piece(&self, id: PieceId) -> Result<(Position, Side), Rejection> {
        let piece = self.piece(id).ok_or(Rejection::UnknownPiece)?;
        let pos = match piece.position {
            Some(pos) if piece.is_alive() => pos,
            _ => return Err(Rejection::NotOnBoard),
        };
        if piece.moves_remaining == 0 {
            return Err(Rejection::NoMovesLeft);
        }
        Ok((pos, piece.owner))
    }

    /// Cheapest empty tile next to `target` the piece can reach while
    /// keeping a move for the strike
    fn approach_tile(&self, id: PieceId, target: Position) -> Option<Position> {
        let piece = self.piece(id)?;
        let from = piece.position?;
        let owner = piece.owner;
        let dist = self
            .grid
            .step_distances(from, piece.moves_remaining, |t| passable_for(t, Some(owner)));

        target
            .neighbors()
            .filter_map(|n| dist.get(&n).map(|&d| (d, n)))
            .filter(|&(d, n)| d > 0 && self.grid.tile_at(n).is_some_and(|t| !t.is_occupied()))
            .min()
            .map(|(_, n)| n)
    }

    fn walk(&mut self, id: PieceId, path: Vec<Position>) -> Movement {
        let piece = &mut self.pieces[id.0 as usize];
        let from = piece.position.unwrap_or(path[0]);
        piece.spend(path.len() as u32);

        let to = path[path.len() - 1];
        self.lift_piece(id);
        self.place_piece_at(id, to);
        Movement {
            piece: id,
            from,
            to,
            path,
        }
    }

    /// Exchange blows between two pieces standing on `att_pos` and `def_pos`
    fn resolve_combat(
        &mut self,
        attacker: PieceId,
        att_pos: Position,
        defender: PieceId,
        def_pos: Position,
    ) -> CombatReport {
        let damage = {
            let (a, d) = self.pair_mut(attacker, defender);
            a.attack(d)
        };
        let attacker_dead = !self.pieces[attacker.0 as usize].is_alive();
        let defender_dead = !self.pieces[defender.0 as usize].is_alive();

        if defender_dead {
            self.remove_piece(defender);
        }
        if attacker_dead {
            self.remove_piece(attacker);
        } else if defender_dead {
            self.lift_piece(attacker);
            self.place_piece_at(attacker, def_pos);
        }

        let report = CombatReport {
            attacker,
            defender,
            destroyed: Duel {
                attacker: attacker_dead,
                defender: defender_dead,
            },
            damage_taken: Duel {
                attacker: damage.defender,
                defender: damage.attacker,
            },
            tiles: Duel {
                attacker: att_pos,
                defender: def_pos,
            },
        };
        tracing::debug!(?report, "combat resolved");
        report
    }

    fn pair_mut(&mut self, a: PieceId, b: PieceId) -> (&mut Piece, &mut Piece) {
        let (a, b) = (a.0 as usize, b.0 as usize);
        if a < b {
            let (lo, hi) = self.pieces.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.pieces.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    fn place_piece_at(&mut self, id: PieceId, pos: Position) {
        let piece = &mut self.pieces[id.0 as usize];
        piece.position = Some(pos);
        let occupant = Occupant {
            piece: id,
            owner: piece.owner,
        };
        if let Some(tile) = self.grid.tile_at_mut(pos) {
            tile.piece = Some(occupant);
        }
    }

    /// Clear the piece's tile, leaving the piece in limbo
    fn lift_piece(&mut self, id: PieceId) {
        if let Some(pos) = self.pieces[id.0 as usize].position.take() {
            if let Some(tile) = self.grid.tile_at_mut(pos) {
                if tile.piece.is_some_and(|occ| occ.piece == id) {
                    tile.piece = None;
                }
            }
        }
    }

    fn remove_piece(&mut self, id: PieceId) {
        self.lift_piece(id);
        let owner = self.pieces[id.0 as usize].owner;
        self.players[owner.index()].pieces.retain(|p| *p != id);
    }
}

fn field_pieces(side: Side, stats: &ProductStats) -> Vec<Piece> {
    (0..stats.quantity)
        .map(|_| Piece::new(PieceId(0), side, stats.strength, stats.movement, &stats.name))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn open_board(rows: i32, cols: i32) -> Board {
        let mut board = Board::new(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                board.place_tile(Position::new(row, col), TileKind::Plain).unwrap();
            }
        }
        board
    }

    fn ready(board: &mut Board, side: Side, strength: u32, movement: u32, pos: Position) -> PieceId {
        let stats = ProductStats::new("p", 1, 1, strength, movement);
        let id = board.spawn_piece(side, &stats, pos).unwrap();
        board.reset_side(side);
        id
    }

    /// Every tile/piece link agrees in both directions
    fn assert_links(board: &Board) {
        for tile in board.grid().tiles() {
            if let Some(occ) = tile.piece {
                let piece = board.piece(occ.piece).unwrap();
                assert_eq!(piece.position, Some(tile.position));
                assert_eq!(piece.owner, occ.owner);
            }
        }
        for side in Side::ALL {
            for piece in board.pieces_of(side) {
                let pos = piece.position.unwrap();
                assert_eq!(board.grid().tile_at(pos).unwrap().piece.unwrap().piece, piece.id);
                assert!(piece.moves_remaining <= piece.moves_max);
            }
        }
    }

    #[test]
    fn test_center_rounds_half_up() {
        assert_eq!(Board::new(9, 14).center(), Position::new(5, 7));
        assert_eq!(Board::new(1, 1).center(), Position::new(0, 0));
    }

    #[test]
    fn test_setup_tiles_connected_and_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut board = Board::new(9, 14);
        board.setup_tiles(40, false, 2, &mut rng).unwrap();
        assert_eq!(board.grid().len(), 40);
        assert!(board.grid().tiles().iter().all(|t| t.is_income()));

        // Connected: everything reachable from the center
        let center = board.center();
        let reach = board.grid().step_distances(center, u32::MAX, |_| true);
        assert_eq!(reach.len(), 40);

        let mut small = Board::new(3, 3);
        small.setup_tiles(50, true, 2, &mut rng).unwrap();
        assert_eq!(small.grid().len(), 9);
    }

    #[test]
    fn test_starting_positions_far_apart() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut board = Board::new(9, 14);
        board.setup_tiles(30, false, 1, &mut rng).unwrap();
        let starts = board.starting_positions(2, &mut rng);
        assert_eq!(starts.len(), 2);
        let best = starts[0].taxicab_to(starts[1]);
        for pos in board.grid().tile_positions() {
            assert!(best >= starts[0].taxicab_to(pos));
        }
    }

    #[test]
    fn test_generate_places_every_piece() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let config = MarketConfig::default();
        let company = CompanyFootprint {
            locations: 2,
            markets: 1,
            seen_market: true,
        };
        let human = ProductStats::new("app", 3, 4, 3, 2);
        let ai = ProductStats::new("rival", 3, 3, 2, 2);
        let board = Board::generate(&config, &company, &human, &ai, &mut rng).unwrap();

        assert_eq!(board.grid().len(), 24 + 2 + 3);
        assert_eq!(board.player(Side::Human).pieces.len(), 4);
        assert_eq!(board.player(Side::Ai).pieces.len(), 3);
        assert_links(&board);
    }

    #[test]
    fn test_select_tile_exposes_moves() {
        let mut board = open_board(5, 5);
        let id = ready(&mut board, Side::Human, 1, 1, Position::new(2, 2));
        let before = board.snapshot();
        let sel = board.select_tile(Position::new(2, 2)).unwrap();
        assert_eq!(sel.piece, Some(id));
        assert_eq!(sel.valid_moves.len(), 6);
        assert!(board.select_tile(Position::new(2, 2)).is_some());

        let empty = board.select_tile(Position::new(0, 0)).unwrap();
        assert!(empty.valid_moves.is_empty());
        assert_eq!(board.piece(id).unwrap().moves_remaining, 1);
        assert_eq!(board.snapshot().pieces, before.pieces);
        assert!(board.select_tile(Position::new(9, 9)).is_none());
    }

    #[test]
    fn test_move_spends_path_length() {
        let mut board = open_board(5, 5);
        let id = ready(&mut board, Side::Human, 1, 3, Position::new(0, 0));
        let outcome = board.request_move(id, Position::new(0, 2));
        match outcome {
            ActionOutcome::Moved(m) => {
                assert_eq!(m.cost(), 2);
                assert_eq!(m.to, Position::new(0, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(board.piece(id).unwrap().moves_remaining, 1);
        assert!(!board.grid().tile_at(Position::new(0, 0)).unwrap().is_occupied());
        assert_links(&board);
    }

    #[test]
    fn test_move_out_of_range_rejected() {
        let mut board = open_board(5, 5);
        let id = ready(&mut board, Side::Human, 1, 2, Position::new(0, 0));
        let before = board.snapshot();
        assert_eq!(
            board.request_move(id, Position::new(0, 3)),
            ActionOutcome::Rejected(Rejection::NotAValidMove)
        );
        assert_eq!(board.snapshot().pieces, before.pieces);
    }

    #[test]
    fn test_exhausted_piece_cannot_move() {
        let mut board = open_board(3, 3);
        let stats = ProductStats::new("p", 1, 1, 1, 2);
        let id = board.spawn_piece(Side::Human, &stats, Position::new(0, 0)).unwrap();
        assert_eq!(
            board.request_move(id, Position::new(0, 1)),
            ActionOutcome::Rejected(Rejection::NoMovesLeft)
        );
        assert_eq!(
            board.request_move(PieceId(99), Position::new(0, 1)),
            ActionOutcome::Rejected(Rejection::UnknownPiece)
        );
    }

    #[test]
    fn test_adjacent_attack_resolves_directly() {
        let mut board = open_board(3, 3);
        let a = ready(&mut board, Side::Human, 5, 3, Position::new(0, 0));
        let d = ready(&mut board, Side::Ai, 2, 1, Position::new(0, 1));

        let outcome = board.request_attack(a, Position::new(0, 1));
        let report = *outcome.combat().unwrap();
        assert_eq!(report.damage_taken.defender, 5);
        assert_eq!(report.damage_taken.attacker, 2);
        assert!(!report.destroyed.attacker);
        assert!(!report.destroyed.defender);
        assert_eq!(board.piece(a).unwrap().position, Some(Position::new(0, 0)));
        assert_eq!(board.piece(d).unwrap().position, Some(Position::new(0, 1)));
        assert_eq!(board.piece(a).unwrap().moves_remaining, 0);
        assert_eq!(report.tiles.attacker, Position::new(0, 0));
        assert_eq!(report.tiles.defender, Position::new(0, 1));
    }

    #[test]
    fn test_attack_own_piece_rejected() {
        let mut board = open_board(3, 3);
        let a = ready(&mut board, Side::Human, 5, 3, Position::new(0, 0));
        ready(&mut board, Side::Human, 5, 3, Position::new(0, 1));
        assert_eq!(
            board.request_attack(a, Position::new(0, 1)),
            ActionOutcome::Rejected(Rejection::NoEnemy)
        );
    }

    #[test]
    fn test_killing_blow_advances_attacker() {
        let mut board = open_board(3, 3);
        let a = ready(&mut board, Side::Human, 30, 3, Position::new(0, 0));
        let d = ready(&mut board, Side::Ai, 0, 1, Position::new(0, 1));

        let report = *board.request_attack(a, Position::new(0, 1)).combat().unwrap();
        assert!(report.destroyed.defender);
        assert!(!report.destroyed.attacker);
        assert_eq!(board.piece(a).unwrap().position, Some(Position::new(0, 1)));
        assert_eq!(board.piece(d).unwrap().position, None);
        assert!(board.player(Side::Ai).pieces.is_empty());
        assert!(!board.grid().tile_at(Position::new(0, 0)).unwrap().is_occupied());
        assert_links(&board);
    }

    #[test]
    fn test_mutual_destruction() {
        let mut board = open_board(3, 3);
        let mut a = Piece::new(PieceId(0), Side::Human, 4, 2, "p");
        let mut d = Piece::new(PieceId(0), Side::Ai, 4, 2, "q");
        a.health = 4;
        d.health = 3;
        let a = board.add_piece(a, Position::new(1, 0)).unwrap();
        let d = board.add_piece(d, Position::new(1, 1)).unwrap();
        board.reset_side(Side::Human);

        let report = *board.request_attack(a, Position::new(1, 1)).combat().unwrap();
        assert!(report.destroyed.attacker && report.destroyed.defender);
        assert_eq!(report.damage_taken.attacker, report.damage_taken.defender);
        assert!(board.piece_at(Position::new(1, 0)).is_none());
        assert!(board.piece_at(Position::new(1, 1)).is_none());
        assert!(board.player(Side::Human).pieces.is_empty());
        assert!(board.player(Side::Ai).pieces.is_empty());
        assert!(board.piece(d).unwrap().position.is_none());
    }

    #[test]
    fn test_attack_after_approach() {
        let mut board = open_board(1, 6);
        let a = ready(&mut board, Side::Human, 3, 4, Position::new(0, 0));
        ready(&mut board, Side::Ai, 1, 1, Position::new(0, 4));

        match board.request_attack(a, Position::new(0, 4)) {
            ActionOutcome::Attacked {
                approach: Some(m),
                report,
            } => {
                assert_eq!(m.to, Position::new(0, 3));
                assert_eq!(m.cost(), 3);
                assert_eq!(report.tiles.attacker, Position::new(0, 3));
                assert_eq!(report.tiles.defender, Position::new(0, 4));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_links(&board);
    }

    #[test]
    fn test_approach_without_moves_to_strike() {
        let mut board = open_board(1, 6);
        let a = ready(&mut board, Side::Human, 3, 3, Position::new(0, 0));
        ready(&mut board, Side::Ai, 1, 1, Position::new(0, 4));

        assert!(!board.attack_targets(a).contains(&Position::new(0, 4)));
        match board.request_attack(a, Position::new(0, 4)) {
            ActionOutcome::Approached(m) => assert_eq!(m.to, Position::new(0, 3)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(board.piece(a).unwrap().moves_remaining, 0);
    }

    #[test]
    fn test_attack_out_of_reach() {
        let mut board = open_board(1, 8);
        let a = ready(&mut board, Side::Human, 3, 2, Position::new(0, 0));
        ready(&mut board, Side::Ai, 1, 1, Position::new(0, 6));
        assert_eq!(
            board.request_attack(a, Position::new(0, 6)),
            ActionOutcome::Rejected(Rejection::OutOfReach)
        );
        assert_eq!(board.piece(a).unwrap().moves_remaining, 2);
    }

    #[test]
    fn test_capture_income_tile() {
        let mut board = Board::new(2, 2);
        board
            .place_tile(Position::new(0, 0), TileKind::Income { income: 2, base_cost: 3 })
            .unwrap();
        board.place_tile(Position::new(0, 1), TileKind::Plain).unwrap();
        let id = ready(&mut board, Side::Human, 1, 2, Position::new(0, 0));
        let other = ready(&mut board, Side::Human, 1, 2, Position::new(0, 1));

        assert!(matches!(board.request_capture(id), ActionOutcome::Captured { .. }));
        assert_eq!(board.grid().tile_at(Position::new(0, 0)).unwrap().owner, Some(Side::Human));
        assert_eq!(board.income(Side::Human), 2);
        assert!(board.uncaptured_tiles().is_empty());
        assert_eq!(board.piece(id).unwrap().moves_remaining, 0);

        assert_eq!(
            board.request_capture(other),
            ActionOutcome::Rejected(Rejection::NotCapturable)
        );
    }

    #[test]
    fn test_capture_already_owned_is_noop() {
        let mut board = Board::new(1, 1);
        board.place_tile(Position::new(0, 0), TileKind::Influencer).unwrap();
        let id = ready(&mut board, Side::Human, 1, 2, Position::new(0, 0));
        assert!(matches!(board.request_capture(id), ActionOutcome::Captured { .. }));
        board.reset_side(Side::Human);
        assert_eq!(
            board.request_capture(id),
            ActionOutcome::Rejected(Rejection::AlreadyOwned)
        );
        assert_eq!(board.piece(id).unwrap().moves_remaining, 2);
        assert_eq!(board.influence(Side::Human), 1);
    }

    #[test]
    fn test_check_done() {
        let mut board = open_board(2, 2);
        assert!(board.check_done(Side::Human));
        let id = ready(&mut board, Side::Human, 1, 1, Position::new(0, 0));
        assert!(!board.check_done(Side::Human));
        board.request_move(id, Position::new(0, 1));
        assert!(board.check_done(Side::Human));
    }
}
