//! Market CLI - Command-line interface
//!
//! Commands:
//! - play: Run headless market sessions with an autopilot on the human side
//! - show: Generate a board and print it

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod play_cmd;
mod show_cmd;

#[derive(Parser)]
#[command(name = "market")]
#[command(about = "Market territory game engine")]
struct Cli {
    /// Seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play market sessions, AI against autopilot
    Play(play_cmd::PlayArgs),
    /// Print a freshly generated board
    Show(show_cmd::ShowArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => play_cmd::run(args, cli.seed),
        Commands::Show(args) => show_cmd::run(args, cli.seed),
    }
}
