use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::generate::GenerateOptions;
use crate::heuristic::Heuristic;
use crate::search::SearchOptions;

const DEFAULT_TICK_MS: u64 = 180;

#[derive(Parser, Debug)]
#[command(name = "pacman-search", version, about = "Plan Pacman's food run with A* search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the cheapest way to eat every food pellet in a layout
    Solve(SolveArgs),
    /// Print a random layout
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// Layout file
    pub layout: PathBuf,

    #[arg(long, value_enum, default_value_t = Heuristic::NearestFood)]
    pub heuristic: Heuristic,

    /// Seed for ghost moves and fruit spawns
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Animate the solution in the terminal
    #[arg(long)]
    pub replay: bool,

    /// Write a cost and action report to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl SolveArgs {
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            heuristic: self.heuristic,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long, default_value_t = 15)]
    pub width: usize,

    #[arg(long, default_value_t = 11)]
    pub height: usize,

    #[arg(long, default_value_t = 4)]
    pub food: usize,

    #[arg(long, default_value_t = 1)]
    pub pies: usize,

    #[arg(long, default_value_t = 0)]
    pub ghosts: usize,

    /// Random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl GenerateArgs {
    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            width: self.width,
            height: self.height,
            food: self.food,
            pies: self.pies,
            ghosts: self.ghosts,
        }
    }
}

/// Replay frame delay, overridable through `PACMAN_TICK_MS`.
pub fn tick() -> Duration {
    Duration::from_millis(parse_tick(env::var("PACMAN_TICK_MS").ok().as_deref()))
}

fn parse_tick(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TICK_MS)
}
