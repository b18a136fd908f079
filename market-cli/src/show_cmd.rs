//! Show command - generate a market board and print it

use anyhow::{Context, Result};
use clap::Args;

use market_core::{Board, Market, Position, Side, TileKind};

use crate::play_cmd::{load_config, session_inputs, SessionArgs};

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Print the board snapshot as JSON instead of a drawing
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ShowArgs, seed: Option<u64>) -> Result<()> {
    let config = load_config(&args.session, seed)?;
    let (company, human, rival) = session_inputs(&args.session);
    let market = Market::new(&config, &company, &human, &rival).context("Failed to generate market board")?;
    let board = market.board();

    if args.json {
        let json = serde_json::to_string_pretty(&board.snapshot())?;
        println!("{}", json);
        return Ok(());
    }

    print!("{}", render_board(board));
    println!();
    println!(
        "{} tiles, {} income, {} influencers",
        board.grid().len(),
        board.income_tiles().len(),
        board.influencer_tiles().len()
    );
    for side in Side::ALL {
        let player = board.player(side);
        println!("{:?}: {} pieces (color #{:06X})", side, player.pieces.len(), player.color);
    }
    Ok(())
}

/// Two characters per cell, odd rows shifted right by one.
///
/// `H`/`A` mark pieces, digits are income tiles, `*` influencers,
/// `.` plain tiles; lowercase `h`/`a` after a tile marks its owner.
pub fn render_board(board: &Board) -> String {
    let grid = board.grid();
    let mut out = String::new();
    for row in 0..grid.rows() {
        let mut line = String::new();
        if row % 2 == 1 {
            line.push(' ');
        }
        for col in 0..grid.cols() {
            let pos = Position::new(row, col);
            let Some(tile) = grid.tile_at(pos) else {
                line.push_str("  ");
                continue;
            };
            let glyph = match (board.piece_at(pos), tile.kind) {
                (Some(p), _) if p.owner == Side::Human => 'H',
                (Some(_), _) => 'A',
                (None, TileKind::Plain) => '.',
                (None, TileKind::Income { income, .. }) => char::from_digit(income, 10).unwrap_or('#'),
                (None, TileKind::Influencer) => '*',
            };
            let mark = match tile.owner {
                Some(Side::Human) => 'h',
                Some(Side::Ai) => 'a',
                None => ' ',
            };
            line.push(glyph);
            line.push(mark);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
