use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use pacman_search::config::{self, Cli, Command, GenerateArgs, SolveArgs};
use pacman_search::generate::generate_layout;
use pacman_search::render;
use pacman_search::{astar, Maze, SearchOutcome};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Solve(args) => solve(&args),
        Command::Generate(args) => generate(&args),
    }
}

fn solve(args: &SolveArgs) -> Result<()> {
    let maze = Maze::load(&args.layout)
        .with_context(|| format!("failed to load layout {}", args.layout.display()))?;
    info!(
        "{} teleporting corners, extended rules {}",
        maze.corners().len(),
        if maze.is_extended() { "on" } else { "off" }
    );

    let started = Instant::now();
    let outcome = astar(&maze, &args.search_options());
    let elapsed = started.elapsed();
    write_summary(io::stdout().lock(), &outcome, elapsed).context("failed to print summary")?;
    let Some(solution) = outcome.solution else {
        return Ok(());
    };

    if let Some(path) = &args.output {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        solution
            .write_report(&mut out)
            .and_then(|()| out.flush())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    if args.replay {
        render::replay(&maze, &solution, config::tick()).context("replay failed")?;
    }
    Ok(())
}

fn write_summary<W: Write>(
    mut out: W,
    outcome: &SearchOutcome,
    elapsed: Duration,
) -> io::Result<()> {
    match &outcome.solution {
        Some(solution) => {
            let actions: Vec<&str> = solution.actions.iter().map(|a| a.label()).collect();
            writeln!(out, "Actions: {}", actions.join(" "))?;
            writeln!(out, "Total cost: {}", solution.cost)?;
        }
        None => writeln!(out, "No solution found")?,
    }
    writeln!(out, "Nodes expanded: {}", outcome.stats.nodes_expanded)?;
    writeln!(out, "Search completed in {:.3} seconds", elapsed.as_secs_f64())
}

fn generate(args: &GenerateArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let layout = generate_layout(&args.options(), &mut rng);
    match &args.output {
        Some(path) => {
            std::fs::write(path, &layout)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("layout written to {}", path.display());
        }
        None => print!("{}", layout),
    }
    Ok(())
}
