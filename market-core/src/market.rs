//! Market: the turn engine
//!
//! Owns the board, the competitor AI and the turn budget. The human side acts
//! through the intent methods below; the AI side plays its whole turn inside
//! [`Market::end_turn`]. Everything the presentation layer needs to react to
//! is queued as a [`MarketEvent`] and collected with [`Market::drain_events`].
//!
//! Phases move `Setup -> HumanTurn -> AiTurn -> HumanTurn -> ...` until an
//! end condition fires, after which every intent is rejected.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ai::MarketAi;
use crate::board::{Action, ActionOutcome, Board, CombatReport, Rejection, Selection};
use crate::config::MarketConfig;
use crate::error::MarketResult;
use crate::grid::Position;
use crate::piece::{PieceId, Side};
use crate::product::{CompanyFootprint, ProductStats};
use crate::tile::TileKind;

// ============================================================================
// PHASES, EVENTS, SCORES
// ============================================================================

/// Why a market session ended, in the order the conditions are checked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    OutOfTurns,
    MarketSaturated,
    CompetitionObliterated,
    HumanDestroyed,
}

impl EndReason {
    /// Line shown on the game-over screen
    pub fn message(&self) -> String {
        format!("{} - time to leave the Market!", self)
    }

    pub fn human_won(&self) -> bool {
        matches!(self, EndReason::CompetitionObliterated)
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EndReason::OutOfTurns => "Out of turns",
            EndReason::MarketSaturated => "The Market's been saturated",
            EndReason::CompetitionObliterated => "You obliterated the competition",
            EndReason::HumanDestroyed => "The competition destroyed you",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    HumanTurn,
    AiTurn,
    Ended(EndReason),
}

/// Outbound signals, oldest first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// The human has no piece with moves left
    HumanDone,
    StartTurn(Side),
    Combat(CombatReport),
    Captured {
        side: Side,
        piece: PieceId,
        tile: Position,
        kind: TileKind,
    },
    Ended(EndReason),
}

/// Percent of income-tile weight held by each side
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketShare {
    pub human: f64,
    pub ai: f64,
    pub unowned: f64,
}

// ============================================================================
// MARKET
// ============================================================================

#[derive(Clone, Debug)]
pub struct Market {
    board: Board,
    ai: MarketAi,
    total_turns: u32,
    turns_left: u32,
    current: Side,
    phase: Phase,
    events: Vec<MarketEvent>,
}

impl Market {
    /// Generate a board for the company and set up a session on it.
    ///
    /// On a first visit (`seen_market == false`) the competitor fields a
    /// single immobile, toothless piece instead of its real product.
    pub fn new(
        config: &MarketConfig,
        company: &CompanyFootprint,
        human: &ProductStats,
        competitor: &ProductStats,
    ) -> MarketResult<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let competitor = if company.seen_market {
            competitor.clone()
        } else {
            competitor.weakened()
        };
        let board = Board::generate(config, company, human, &competitor, &mut rng)?;
        let ai = MarketAi::with_seed(config.heuristics.clone(), rng.gen());

        Ok(Self::from_board(board, config.max_turns, ai))
    }

    /// Session on a prepared board
    pub fn from_board(board: Board, total_turns: u32, ai: MarketAi) -> Self {
        Self {
            board,
            ai,
            total_turns,
            turns_left: total_turns,
            current: Side::Human,
            phase: Phase::Setup,
            events: Vec::new(),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_player(&self) -> Side {
        self.current
    }

    pub fn total_turns(&self) -> u32 {
        self.total_turns
    }

    pub fn turns_left(&self) -> u32 {
        self.turns_left
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Ended(_))
    }

    pub fn result(&self) -> Option<EndReason> {
        match self.phase {
            Phase::Ended(reason) => Some(reason),
            _ => None,
        }
    }

    /// Game-over line, once the session has ended
    pub fn end_message(&self) -> Option<String> {
        self.result().map(|r| r.message())
    }

    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // TURN FLOW
    // ========================================================================

    /// Open the session with the human's first turn
    pub fn start(&mut self) {
        if self.phase != Phase::Setup {
            return;
        }
        tracing::debug!(turns = self.total_turns, "market opened");
        self.start_turn(Side::Human);
        self.check_end();
    }

    /// Refill `side`'s moves and hand it control
    pub fn start_turn(&mut self, side: Side) {
        self.board.reset_side(side);
        self.current = side;
        self.phase = match side {
            Side::Human => Phase::HumanTurn,
            Side::Ai => Phase::AiTurn,
        };
        self.events.push(MarketEvent::StartTurn(side));
        tracing::debug!(?side, turns_left = self.turns_left, "turn started");
    }

    /// Finish the human turn: the AI plays out its turn, the pair is counted,
    /// and control returns to the human unless the session is over
    pub fn end_turn(&mut self) {
        if self.phase != Phase::HumanTurn {
            return;
        }
        self.board.exhaust_side(Side::Human);

        self.play_ai_turn();
        if self.is_over() {
            return;
        }

        self.turns_left = self.turns_left.saturating_sub(1);
        if self.check_end() {
            return;
        }
        self.start_turn(Side::Human);
        self.check_end();
    }

    fn play_ai_turn(&mut self) {
        self.start_turn(Side::Ai);
        let plan = self.ai.plan_turn(&self.board, Side::Ai);
        for action in plan {
            let outcome = self.board.apply(action);
            if outcome.is_rejected() {
                tracing::warn!(?action, ?outcome, "planned action rejected");
                continue;
            }
            self.record(Side::Ai, &outcome);
            if outcome.combat().is_some() && self.check_end() {
                return;
            }
        }
        self.board.exhaust_side(Side::Ai);
    }

    /// First end condition that holds right now
    pub fn end_reason(&self) -> Option<EndReason> {
        if self.turns_left == 0 {
            Some(EndReason::OutOfTurns)
        } else if self.board.uncaptured_tiles().is_empty() {
            Some(EndReason::MarketSaturated)
        } else if self.board.player(Side::Ai).pieces.is_empty() {
            Some(EndReason::CompetitionObliterated)
        } else if self.board.player(Side::Human).pieces.is_empty() {
            Some(EndReason::HumanDestroyed)
        } else {
            None
        }
    }

    pub fn should_end(&self) -> bool {
        self.end_reason().is_some()
    }

    fn check_end(&mut self) -> bool {
        if self.is_over() {
            return true;
        }
        let Some(reason) = self.end_reason() else {
            return false;
        };
        self.phase = Phase::Ended(reason);
        self.events.push(MarketEvent::Ended(reason));
        tracing::info!(%reason, turns_left = self.turns_left, "market closed");
        true
    }

    fn record(&mut self, side: Side, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Attacked { report, .. } => self.events.push(MarketEvent::Combat(*report)),
            ActionOutcome::Captured { piece, tile, kind } => self.events.push(MarketEvent::Captured {
                side,
                piece: *piece,
                tile: *tile,
                kind: *kind,
            }),
            _ => {}
        }
    }

    // ========================================================================
    // SCORING
    // ========================================================================

    /// Income-weighted share of the market. Unowned tiles only count
    /// towards the total; an empty market scores zero everywhere.
    pub fn market_share(&self) -> MarketShare {
        let mut weights = [0u32; 3];
        for tile in self.board.income_tiles() {
            let slot = match tile.owner {
                Some(side) => side.index(),
                None => 2,
            };
            weights[slot] += tile.share_weight();
        }
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return MarketShare::default();
        }
        let pct = |w: u32| w as f64 / total as f64 * 100.0;
        MarketShare {
            human: pct(weights[Side::Human.index()]),
            ai: pct(weights[Side::Ai.index()]),
            unowned: pct(weights[2]),
        }
    }

    // ========================================================================
    // HUMAN INTENTS
    // ========================================================================

    /// Highlight data for a tile. A read-only query, so it also answers
    /// outside the human turn and after the session ends.
    pub fn select_tile(&self, pos: Position) -> Option<Selection> {
        self.board.select_tile(pos)
    }

    pub fn request_move(&mut self, piece: PieceId, to: Position) -> ActionOutcome {
        self.human_action(Action::Move { piece, to })
    }

    pub fn request_attack(&mut self, piece: PieceId, target: Position) -> ActionOutcome {
        self.human_action(Action::Attack { piece, target })
    }

    pub fn request_capture(&mut self, piece: PieceId) -> ActionOutcome {
        self.human_action(Action::Capture { piece })
    }

    pub fn apply(&mut self, action: Action) -> ActionOutcome {
        self.human_action(action)
    }

    fn human_action(&mut self, action: Action) -> ActionOutcome {
        if self.is_over() {
            return ActionOutcome::Rejected(Rejection::MatchOver);
        }
        if self.phase != Phase::HumanTurn {
            return ActionOutcome::Rejected(Rejection::NotYourTurn);
        }
        match self.board.piece(action.piece()) {
            None => return ActionOutcome::Rejected(Rejection::UnknownPiece),
            Some(p) if p.owner != Side::Human => return ActionOutcome::Rejected(Rejection::NotYourTurn),
            Some(_) => {}
        }

        let outcome = self.board.apply(action);
        if outcome.is_rejected() {
            return outcome;
        }
        self.record(Side::Human, &outcome);
        if self.check_end() {
            return outcome;
        }
        if self.board.check_done(Side::Human) {
            self.events.push(MarketEvent::HumanDone);
            self.end_turn();
        }
        outcome
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiHeuristics;

    fn stats(strength: u32, movement: u32) -> ProductStats {
        ProductStats::new("p", 1, 1, strength, movement)
    }

    /// 1x6 strip: human at col 0, immobile AI at col 5, one income tile at col 3
    fn strip_market(turns: u32, human_moves: u32) -> (Market, PieceId, PieceId) {
        let mut board = Board::new(1, 6);
        for col in 0..6 {
            let kind = if col == 3 {
                TileKind::Income { income: 1, base_cost: 1 }
            } else {
                TileKind::Plain
            };
            board.place_tile(Position::new(0, col), kind).unwrap();
        }
        let human = board.spawn_piece(Side::Human, &stats(3, human_moves), Position::new(0, 0)).unwrap();
        let ai = board.spawn_piece(Side::Ai, &stats(0, 0), Position::new(0, 5)).unwrap();
        let market = Market::from_board(board, turns, MarketAi::new(AiHeuristics::default()));
        (market, human, ai)
    }

    #[test]
    fn test_start_opens_human_turn() {
        let (mut market, human, _) = strip_market(5, 2);
        assert_eq!(market.phase(), Phase::Setup);
        market.start();
        assert_eq!(market.phase(), Phase::HumanTurn);
        assert_eq!(market.board().piece(human).unwrap().moves_remaining, 2);
        assert_eq!(market.drain_events(), vec![MarketEvent::StartTurn(Side::Human)]);
        assert!(market.drain_events().is_empty());
    }

    #[test]
    fn test_intents_before_start_rejected() {
        let (mut market, human, _) = strip_market(5, 2);
        assert_eq!(
            market.request_move(human, Position::new(0, 1)),
            ActionOutcome::Rejected(Rejection::NotYourTurn)
        );
    }

    #[test]
    fn test_cannot_command_ai_piece() {
        let (mut market, _, ai) = strip_market(5, 2);
        market.start();
        assert_eq!(
            market.request_capture(ai),
            ActionOutcome::Rejected(Rejection::NotYourTurn)
        );
    }

    #[test]
    fn test_end_turn_counts_one_pair() {
        let (mut market, _, _) = strip_market(5, 2);
        market.start();
        market.drain_events();
        market.end_turn();
        assert_eq!(market.turns_left(), 4);
        assert_eq!(market.phase(), Phase::HumanTurn);
        assert_eq!(
            market.drain_events(),
            vec![MarketEvent::StartTurn(Side::Ai), MarketEvent::StartTurn(Side::Human)]
        );
    }

    #[test]
    fn test_out_of_turns_after_n_pairs() {
        let (mut market, _, _) = strip_market(3, 2);
        market.start();
        for _ in 0..2 {
            market.end_turn();
            assert!(!market.is_over());
        }
        market.end_turn();
        assert_eq!(market.turns_left(), 0);
        assert_eq!(market.result(), Some(EndReason::OutOfTurns));
        assert_eq!(
            market.end_message().unwrap(),
            "Out of turns - time to leave the Market!"
        );
    }

    #[test]
    fn test_exhausted_human_hands_over() {
        let (mut market, human, _) = strip_market(5, 1);
        market.start();
        market.drain_events();

        assert!(matches!(market.request_move(human, Position::new(0, 1)), ActionOutcome::Moved(_)));
        assert_eq!(
            market.drain_events(),
            vec![
                MarketEvent::HumanDone,
                MarketEvent::StartTurn(Side::Ai),
                MarketEvent::StartTurn(Side::Human)
            ]
        );
        assert_eq!(market.turns_left(), 4);
        assert_eq!(market.board().piece(human).unwrap().moves_remaining, 1);
    }

    #[test]
    fn test_capturing_last_income_saturates() {
        let (mut market, human, _) = strip_market(5, 4);
        market.start();
        assert!(matches!(market.request_move(human, Position::new(0, 3)), ActionOutcome::Moved(_)));
        assert!(matches!(market.request_capture(human), ActionOutcome::Captured { .. }));
        assert_eq!(market.result(), Some(EndReason::MarketSaturated));
        assert_eq!(
            market.request_move(human, Position::new(0, 2)),
            ActionOutcome::Rejected(Rejection::MatchOver)
        );

        let events = market.drain_events();
        assert!(events.iter().any(|e| matches!(e, MarketEvent::Captured { side: Side::Human, .. })));
        assert_eq!(events.last(), Some(&MarketEvent::Ended(EndReason::MarketSaturated)));
    }

    #[test]
    fn test_killing_last_competitor_wins() {
        let (mut market, human, _) = strip_market(5, 6);
        market.start();
        let outcome = market.request_attack(human, Position::new(0, 5));
        assert!(outcome.combat().is_some());

        // Each strike spends the turn; the rival has 10 health against 3 damage
        for _ in 0..3 {
            assert!(!market.is_over());
            market.request_attack(human, Position::new(0, 5));
        }
        assert_eq!(market.result(), Some(EndReason::CompetitionObliterated));
        assert!(market.result().unwrap().human_won());
        assert!(market
            .drain_events()
            .iter()
            .any(|e| matches!(e, MarketEvent::Combat(r) if r.destroyed.defender)));
    }

    #[test]
    fn test_select_tile_is_a_query() {
        let (mut market, human, _) = strip_market(3, 4);
        market.start();
        let sel = market.select_tile(Position::new(0, 0)).unwrap();
        assert_eq!(sel.piece, Some(human));
        assert_eq!(sel.valid_moves.len(), 4);
        assert!(market.drain_events().iter().all(|e| matches!(e, MarketEvent::StartTurn(_))));

        market.request_move(human, Position::new(0, 3));
        market.request_capture(human);
        assert!(market.is_over());
        let after = market.select_tile(Position::new(0, 3)).unwrap();
        assert_eq!(after.piece, Some(human));
        assert!(after.valid_moves.is_empty());
    }

    #[test]
    fn test_end_reason_priority() {
        let mut board = Board::new(1, 1);
        board.place_tile(Position::new(0, 0), TileKind::Plain).unwrap();
        let market = Market::from_board(board, 0, MarketAi::new(AiHeuristics::default()));
        // Every condition holds; the turn budget wins
        assert_eq!(market.end_reason(), Some(EndReason::OutOfTurns));
    }

    #[test]
    fn test_market_share_sums_to_hundred() {
        let mut board = Board::new(1, 3);
        board.place_tile(Position::new(0, 0), TileKind::Income { income: 3, base_cost: 1 }).unwrap();
        board.place_tile(Position::new(0, 1), TileKind::Income { income: 1, base_cost: 1 }).unwrap();
        board.place_tile(Position::new(0, 2), TileKind::Influencer).unwrap();
        let human = board.spawn_piece(Side::Human, &stats(1, 1), Position::new(0, 0)).unwrap();
        board.spawn_piece(Side::Ai, &stats(1, 1), Position::new(0, 2)).unwrap();
        let mut market = Market::from_board(board, 5, MarketAi::new(AiHeuristics::default()));

        let share = market.market_share();
        assert_eq!(share.unowned, 100.0);
        assert_eq!(share.human, 0.0);

        market.start();
        market.request_capture(human);
        let share = market.market_share();
        assert!((share.human - 4.0 / 6.0 * 100.0).abs() < 1e-9);
        assert!((share.human + share.ai + share.unowned - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_market_share_is_zero() {
        let market = Market::from_board(Board::new(2, 2), 5, MarketAi::new(AiHeuristics::default()));
        assert_eq!(market.market_share(), MarketShare::default());
    }

    #[test]
    fn test_first_visit_weakens_competitor() {
        let config = MarketConfig::default().with_seed(7);
        let company = CompanyFootprint {
            locations: 1,
            markets: 1,
            seen_market: false,
        };
        let human = ProductStats::new("app", 2, 3, 4, 3);
        let rival = ProductStats::new("rival", 2, 5, 6, 4);
        let mut market = Market::new(&config, &company, &human, &rival).unwrap();

        let ai: Vec<_> = market.board().pieces_of(Side::Ai).collect();
        assert_eq!(ai.len(), 1);
        assert_eq!((ai[0].strength, ai[0].moves_max), (0, 0));
        assert!(market.board().grid().tiles().iter().all(|t| t.is_income()));

        market.start();
        market.end_turn();
        assert!(market.board().pieces_of(Side::Ai).all(|p| p.moves_remaining == 0));
        assert!(!market.is_over());
    }

    #[test]
    fn test_seeded_sessions_match() {
        let config = MarketConfig::default().with_seed(21);
        let company = CompanyFootprint {
            locations: 2,
            markets: 2,
            seen_market: true,
        };
        let human = ProductStats::new("app", 2, 3, 4, 3);
        let rival = ProductStats::new("rival", 2, 3, 4, 3);
        let a = Market::new(&config, &company, &human, &rival).unwrap();
        let b = Market::new(&config, &company, &human, &rival).unwrap();
        assert_eq!(a.board().snapshot().pieces, b.board().snapshot().pieces);
    }
}
