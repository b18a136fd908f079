//! Hex-offset grid geometry, tile storage and path queries
//!
//! Cells are addressed by `(row, col)`. Odd rows are drawn shifted half a
//! cell to the right ("odd-r" layout), so the diagonal neighbours of a cell
//! depend on the parity of its row. Distances are computed by converting to
//! axial coordinates, where the usual cube-distance formula applies.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, MarketResult};
use crate::piece::Side;
use crate::tile::Tile;

/// Neighbour offsets `(drow, dcol)` for cells on even rows
/// Index: 0=W, 1=E, 2=NW, 3=NE, 4=SW, 5=SE
pub const EVEN_ROW_OFFSETS: [(i32, i32); 6] = [
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 0),
    (1, -1),
    (1, 0),
];

/// Neighbour offsets `(drow, dcol)` for cells on odd rows
pub const ODD_ROW_OFFSETS: [(i32, i32); 6] = [
    (0, -1),
    (0, 1),
    (-1, 0),
    (-1, 1),
    (1, 0),
    (1, 1),
];

/// Grid cell address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Axial `(q, r)` coordinates of this cell
    pub fn to_axial(self) -> (i32, i32) {
        (self.col - self.row.div_euclid(2), self.row)
    }

    /// Hex shortest-path distance between two cells
    pub fn distance_to(self, other: Position) -> u32 {
        let (q1, r1) = self.to_axial();
        let (q2, r2) = other.to_axial();
        let dq = (q1 - q2).abs();
        let dr = (r1 - r2).abs();
        let ds = ((q1 + r1) - (q2 + r2)).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Taxicab distance over raw `(row, col)`, used to spread starting positions
    pub fn taxicab_to(self, other: Position) -> u32 {
        ((self.row - other.row).abs() + (self.col - other.col).abs()) as u32
    }

    /// All six neighbouring addresses, including ones off the grid
    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        let offsets = if self.row.rem_euclid(2) == 0 {
            &EVEN_ROW_OFFSETS
        } else {
            &ODD_ROW_OFFSETS
        };
        offsets
            .iter()
            .map(move |&(dr, dc)| Position::new(self.row + dr, self.col + dc))
    }
}

/// Sparse set of placed tiles over a fixed `rows x cols` space
#[derive(Clone, Debug)]
pub struct Grid {
    rows: i32,
    cols: i32,
    /// Tiles in placement order
    tiles: Vec<Tile>,
    lookup: FxHashMap<Position, usize>,
}

impl Grid {
    pub fn new(rows: i32, cols: i32) -> Self {
        Self {
            rows: rows.max(0),
            cols: cols.max(0),
            tiles: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    /// Upper bound on the number of tiles
    pub fn capacity(&self) -> usize {
        (self.rows as usize).saturating_mul(self.cols as usize)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.row < self.rows && pos.col >= 0 && pos.col < self.cols
    }

    /// Placed tiles, in placement order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Positions of placed tiles, in placement order
    pub fn tile_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.tiles.iter().map(|t| t.position)
    }

    pub fn tile_at(&self, pos: Position) -> Option<&Tile> {
        self.lookup.get(&pos).map(|&i| &self.tiles[i])
    }

    pub(crate) fn tile_at_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        match self.lookup.get(&pos) {
            Some(&i) => Some(&mut self.tiles[i]),
            None => None,
        }
    }

    /// Place a tile; fails if the position is off-grid or already has one
    pub fn set_tile_at(&mut self, pos: Position, mut tile: Tile) -> MarketResult<()> {
        if !self.contains(pos) {
            return Err(MarketError::OutOfBounds(pos));
        }
        if self.lookup.contains_key(&pos) {
            return Err(MarketError::TileOccupied(pos));
        }
        tile.position = pos;
        self.lookup.insert(pos, self.tiles.len());
        self.tiles.push(tile);
        Ok(())
    }

    // ========================================================================
    // NEIGHBOURHOOD QUERIES
    // ========================================================================

    /// In-bounds hex neighbours of `pos`, with or without tiles
    pub fn adjacent_positions(&self, pos: Position) -> Vec<Position> {
        pos.neighbors().filter(|p| self.contains(*p)).collect()
    }

    /// In-bounds neighbours where no tile has been placed yet
    pub fn adjacent_no_tile_positions(&self, pos: Position) -> Vec<Position> {
        pos.neighbors()
            .filter(|p| self.contains(*p) && !self.lookup.contains_key(p))
            .collect()
    }

    /// Neighbours holding a tile without a piece on it
    pub fn adjacent_unoccupied_tile_positions(&self, pos: Position) -> Vec<Position> {
        pos.neighbors()
            .filter(|p| self.tile_at(*p).is_some_and(|t| !t.is_occupied()))
            .collect()
    }

    /// Tiles whose hex distance from `pos` is at most `range`
    pub fn tiles_in_range(&self, pos: Position, range: u32) -> Vec<&Tile> {
        self.tiles
            .iter()
            .filter(|t| t.position.distance_to(pos) <= range)
            .collect()
    }

    // ========================================================================
    // REACHABILITY
    // ========================================================================

    /// Breadth-first step counts from `from` over tiles accepted by `passable`,
    /// bounded by `budget`. The origin is included at distance 0.
    pub fn step_distances<F>(&self, from: Position, budget: u32, passable: F) -> FxHashMap<Position, u32>
    where
        F: Fn(&Tile) -> bool,
    {
        let mut dist = FxHashMap::default();
        dist.insert(from, 0);
        let mut queue = VecDeque::from([from]);

        while let Some(pos) = queue.pop_front() {
            let d = dist[&pos];
            if d >= budget {
                continue;
            }
            for next in pos.neighbors() {
                if dist.contains_key(&next) {
                    continue;
                }
                match self.tile_at(next) {
                    Some(tile) if passable(tile) => {
                        dist.insert(next, d + 1);
                        queue.push_back(next);
                    }
                    _ => {}
                }
            }
        }

        dist
    }

    /// Positions the piece on `from` can end a move on within `budget` steps.
    ///
    /// Steps may cross empty tiles and tiles held by a friendly piece; enemy
    /// pieces block. Only empty tiles are valid destinations.
    pub fn valid_move_positions(&self, from: Position, budget: u32) -> Vec<Position> {
        let mover = self
            .tile_at(from)
            .and_then(|t| t.piece)
            .map(|occ| occ.owner);
        let dist = self.step_distances(from, budget, |t| passable_for(t, mover));

        let mut moves: Vec<Position> = dist
            .into_iter()
            .filter(|&(pos, d)| {
                d > 0 && self.tile_at(pos).is_some_and(|t| !t.is_occupied())
            })
            .map(|(pos, _)| pos)
            .collect();
        moves.sort();
        moves
    }

    /// Shortest path from `from` to `target`, excluding the start.
    ///
    /// Every step except the destination must satisfy `predicate`. Uses A*
    /// with hex distance as heuristic, so the result always has minimal
    /// length. Returns `None` if the target has no tile or cannot be reached.
    pub fn find_legal_path<F>(&self, from: Position, target: Position, predicate: F) -> Option<Vec<Position>>
    where
        F: Fn(&Tile) -> bool,
    {
        self.tile_at(target)?;
        if from == target {
            return Some(Vec::new());
        }

        let mut open = BinaryHeap::new();
        let mut best: FxHashMap<Position, u32> = FxHashMap::default();
        let mut came_from: FxHashMap<Position, Position> = FxHashMap::default();

        best.insert(from, 0);
        open.push(Reverse((from.distance_to(target), 0u32, from)));

        while let Some(Reverse((_, cost, pos))) = open.pop() {
            if pos == target {
                return Some(reconstruct_path(&came_from, from, target));
            }
            if best.get(&pos).is_some_and(|&c| cost > c) {
                continue;
            }
            for next in pos.neighbors() {
                let Some(tile) = self.tile_at(next) else {
                    continue;
                };
                if next != target && !predicate(tile) {
                    continue;
                }
                let next_cost = cost + 1;
                if best.get(&next).map_or(true, |&c| next_cost < c) {
                    best.insert(next, next_cost);
                    came_from.insert(next, pos);
                    open.push(Reverse((next_cost + next.distance_to(target), next_cost, next)));
                }
            }
        }

        None
    }
}

/// Empty tiles and tiles held by `mover`'s own pieces can be walked through
pub fn passable_for(tile: &Tile, mover: Option<Side>) -> bool {
    match tile.piece {
        None => true,
        Some(occ) => Some(occ.owner) == mover,
    }
}

fn reconstruct_path(
    came_from: &FxHashMap<Position, Position>,
    from: Position,
    target: Position,
) -> Vec<Position> {
    let mut path = vec![target];
    let mut cur = target;
    while let Some(&prev) = came_from.get(&cur) {
        if prev == from {
            break;
        }
        path.push(prev);
        cur = prev;
    }
    path.reverse();
    path
}

// ============================================================================
// TESTS
// ============================================================================
