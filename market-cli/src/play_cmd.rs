//! Play command - run headless market sessions
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_config(), play_sessions(), report_results()
//! - Level 3: play_single_session(), autopilot_turn(), compute_statistics()
//! - Level 4: argument parsing and formatting utilities

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use market_core::{
    ActionOutcome, AiHeuristics, CompanyFootprint, EndReason, Market, MarketAi, MarketConfig, MarketEvent,
    MarketShare, Phase, ProductLevels, ProductStats, Side,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

/// How the session is set up; shared with `show`
#[derive(Args, Clone, Debug)]
pub struct SessionArgs {
    /// Market config JSON file (defaults are used when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Company locations (one extra tile each)
    #[arg(long, default_value = "2")]
    pub locations: u32,

    /// Company markets (three extra tiles each)
    #[arg(long, default_value = "1")]
    pub markets: u32,

    /// Play as a first-time visitor: all-income board, weakened competitor
    #[arg(long)]
    pub first_visit: bool,

    /// Human product levels as QUANTITY,STRENGTH,MOVEMENT (0-9 each)
    #[arg(long, default_value = "2,3,2", value_parser = parse_levels)]
    pub human: ProductLevels,

    /// Competitor product levels as QUANTITY,STRENGTH,MOVEMENT (0-9 each)
    #[arg(long, default_value = "2,3,2", value_parser = parse_levels)]
    pub rival: ProductLevels,

    /// Product difficulty, scales tile capture costs
    #[arg(long, default_value = "1")]
    pub difficulty: u32,
}

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Number of sessions to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Override the turn budget from the config
    #[arg(long)]
    pub max_turns: Option<u32>,

    /// Play sessions in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single session
#[derive(Clone, Debug)]
struct SessionRecord {
    game_number: usize,
    seed: u64,
    result: Option<EndReason>,
    turns_played: u32,
    share: MarketShare,
    human_pieces: usize,
    ai_pieces: usize,
    combats: usize,
    captures: usize,
}

/// Aggregated results
#[derive(Clone, Debug)]
struct PlayResults {
    sessions: Vec<SessionRecord>,
    human_wins: usize,
    human_losses: usize,
    avg_turns: f32,
    avg_human_share: f64,
    avg_ai_share: f64,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Load the config
/// 2. Play every session
/// 3. Report results
pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let mut config = load_config(&args.session, seed)?;
    if let Some(turns) = args.max_turns {
        config.max_turns = turns;
    }

    tracing::info!(
        "Starting {} sessions on a {}x{} grid ({} turns)",
        args.games,
        config.rows,
        config.cols,
        config.max_turns
    );

    let results = play_sessions(&config, &args)?;

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Config from file (or defaults) with the CLI seed applied
pub fn load_config(session: &SessionArgs, seed: Option<u64>) -> Result<MarketConfig> {
    let mut config = match &session.config {
        Some(path) => MarketConfig::load(path)
            .with_context(|| format!("Failed to load market config: {}", path.display()))?,
        None => MarketConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

fn play_sessions(config: &MarketConfig, args: &PlayArgs) -> Result<PlayResults> {
    let base_seed = config.seed.unwrap_or_else(|| create_rng(None).gen());
    let numbers: Vec<usize> = (1..=args.games).collect();

    let play = |&n: &usize| {
        let seed = base_seed.wrapping_add(n as u64);
        play_single_session(config, &args.session, n, seed)
    };
    let sessions: Vec<SessionRecord> = if args.parallel {
        numbers.par_iter().map(play).collect::<Result<_>>()?
    } else {
        numbers.iter().map(play).collect::<Result<_>>()?
    };

    for record in &sessions {
        tracing::info!(
            "Game {}: {} ({} turns, share {:.1}%)",
            record.game_number,
            describe(record.result),
            record.turns_played,
            record.share.human
        );
    }

    Ok(compute_statistics(sessions))
}

fn report_results(results: &PlayResults, args: &PlayArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one session to the end
fn play_single_session(
    config: &MarketConfig,
    session: &SessionArgs,
    game_number: usize,
    seed: u64,
) -> Result<SessionRecord> {
    let config = config.clone().with_seed(seed);
    let (company, human, rival) = session_inputs(session);
    let mut market = Market::new(&config, &company, &human, &rival)
        .with_context(|| format!("Failed to set up session {}", game_number))?;
    let mut autopilot = MarketAi::with_seed(AiHeuristics::default(), seed ^ 0x5eed);

    let mut combats = 0;
    let mut captures = 0;
    market.start();
    while !market.is_over() {
        autopilot_turn(&mut market, &mut autopilot);
        for event in market.drain_events() {
            match event {
                MarketEvent::Combat(_) => combats += 1,
                MarketEvent::Captured { .. } => captures += 1,
                _ => {}
            }
        }
    }

    let board = market.board();
    Ok(SessionRecord {
        game_number,
        seed,
        result: market.result(),
        turns_played: market.total_turns() - market.turns_left(),
        share: market.market_share(),
        human_pieces: board.player(Side::Human).pieces.len(),
        ai_pieces: board.player(Side::Ai).pieces.len(),
        combats,
        captures,
    })
}

/// Drive one human turn through the intent API. The plan is rebuilt after
/// every action since the market may end the turn on its own.
pub fn autopilot_turn(market: &mut Market, autopilot: &mut MarketAi) {
    let turn = market.turns_left();
    while market.phase() == Phase::HumanTurn && market.turns_left() == turn {
        let plan = autopilot.plan_turn(market.board(), Side::Human);
        let Some(&action) = plan.first() else {
            market.end_turn();
            return;
        };
        if let ActionOutcome::Rejected(reason) = market.apply(action) {
            tracing::debug!(?action, ?reason, "autopilot action rejected");
            market.end_turn();
            return;
        }
    }
}

/// Company and both products as the market consumes them
pub fn session_inputs(session: &SessionArgs) -> (CompanyFootprint, ProductStats, ProductStats) {
    let company = CompanyFootprint {
        locations: session.locations,
        markets: session.markets,
        seen_market: !session.first_visit,
    };
    let human = ProductStats::from_levels("product", session.difficulty, session.human);
    let rival = ProductStats::from_levels("competitor", session.difficulty, session.rival);
    (company, human, rival)
}

fn compute_statistics(sessions: Vec<SessionRecord>) -> PlayResults {
    let human_wins = sessions
        .iter()
        .filter(|s| s.result.is_some_and(|r| r.human_won()))
        .count();
    let human_losses = sessions
        .iter()
        .filter(|s| s.result == Some(EndReason::HumanDestroyed))
        .count();

    let n = sessions.len();
    let (avg_turns, avg_human_share, avg_ai_share) = if n == 0 {
        (0.0, 0.0, 0.0)
    } else {
        let turns: u32 = sessions.iter().map(|s| s.turns_played).sum();
        let human: f64 = sessions.iter().map(|s| s.share.human).sum();
        let ai: f64 = sessions.iter().map(|s| s.share.ai).sum();
        (turns as f32 / n as f32, human / n as f64, ai / n as f64)
    };

    PlayResults {
        sessions,
        human_wins,
        human_losses,
        avg_turns,
        avg_human_share,
        avg_ai_share,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
pub fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Parse `Q,S,M` level triples
fn parse_levels(s: &str) -> std::result::Result<ProductLevels, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [q, st, m] = parts.as_slice() else {
        return Err(format!("expected QUANTITY,STRENGTH,MOVEMENT, got '{}'", s));
    };
    let level = |v: &str| -> std::result::Result<usize, String> {
        let n: usize = v.parse().map_err(|_| format!("'{}' is not a level", v))?;
        if n > 9 {
            return Err(format!("level {} is out of range 0-9", n));
        }
        Ok(n)
    };
    Ok(ProductLevels {
        quantity: level(q)?,
        strength: level(st)?,
        movement: level(m)?,
    })
}

fn describe(result: Option<EndReason>) -> String {
    result.map_or_else(|| "Unfinished".to_string(), |r| r.to_string())
}

fn percent(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

/// Print results as JSON
fn print_json_results(results: &PlayResults) {
    #[derive(serde::Serialize)]
    struct JsonSession {
        game_number: usize,
        seed: u64,
        result: String,
        turns_played: u32,
        share: MarketShare,
        human_pieces: usize,
        ai_pieces: usize,
        combats: usize,
        captures: usize,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        human_wins: usize,
        human_losses: usize,
        avg_turns: f32,
        avg_human_share: f64,
        avg_ai_share: f64,
        sessions: Vec<JsonSession>,
    }

    let output = JsonOutput {
        total_games: results.sessions.len(),
        human_wins: results.human_wins,
        human_losses: results.human_losses,
        avg_turns: results.avg_turns,
        avg_human_share: results.avg_human_share,
        avg_ai_share: results.avg_ai_share,
        sessions: results
            .sessions
            .iter()
            .map(|s| JsonSession {
                game_number: s.game_number,
                seed: s.seed,
                result: describe(s.result),
                turns_played: s.turns_played,
                share: s.share,
                human_pieces: s.human_pieces,
                ai_pieces: s.ai_pieces,
                combats: s.combats,
                captures: s.captures,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &PlayResults) {
    let total = results.sessions.len();

    println!("\n=== Market Results ===");
    println!("Total sessions:  {}", total);
    println!(
        "Human wins:      {} ({:.1}%)",
        results.human_wins,
        percent(results.human_wins, total)
    );
    println!(
        "Human destroyed: {} ({:.1}%)",
        results.human_losses,
        percent(results.human_losses, total)
    );
    println!("Avg turns:       {:.1}", results.avg_turns);
    println!(
        "Avg share:       human {:.1}% / competitor {:.1}%",
        results.avg_human_share, results.avg_ai_share
    );

    println!("\nSession details:");
    for s in &results.sessions {
        println!(
            "  Game {} (seed {}): {} after {} turns, {} combats, {} captures",
            s.game_number,
            s.seed,
            describe(s.result),
            s.turns_played,
            s.combats,
            s.captures
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
