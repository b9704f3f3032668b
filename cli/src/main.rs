//! Thin command-line front end over `fifteen_core`: parses a board from a
//! literal or generates one at a requested difficulty, drives the solver
//! façade, and prints the result. Everything interesting lives in
//! `fifteen_core` — this binary is the "board difficulty generation UI/CLI
//! presentation" collaborator spec.md §1 names as out of scope for the core
//! itself.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use fifteen_core::board::Board;
use fifteen_core::difficulty::{self, Difficulty};
use fifteen_core::heuristic::HeuristicKind;
use fifteen_core::solver::Solver;

/// Solves or generates 15-puzzle boards using an optimal IDA* search.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find a shortest solution for a board.
    Solve {
        /// 16 comma-separated tile values (0 = blank), row-major, e.g.
        /// "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,0".
        tiles: String,
        /// Which heuristic stack to search with.
        #[arg(long, value_enum, default_value_t = HeuristicArg::WdMd)]
        heuristic: HeuristicArg,
        /// Abort the search after this many seconds with no solution found.
        #[arg(long)]
        timeout: Option<u64>,
        /// Directory holding (or to generate) pattern-database element files.
        #[arg(long, default_value = "database")]
        database: PathBuf,
    },
    /// Print the chosen heuristic's estimate for a board without solving it.
    Heuristic {
        tiles: String,
        #[arg(long, value_enum, default_value_t = HeuristicArg::WdMd)]
        heuristic: HeuristicArg,
        #[arg(long, default_value = "database")]
        database: PathBuf,
    },
    /// Generate a board at a requested difficulty and print it.
    Generate {
        #[arg(value_enum, default_value_t = DifficultyArg::Moderate)]
        difficulty: DifficultyArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HeuristicArg {
    Wd,
    WdMd,
    Pdb555,
    Pdb663,
    Pdb78,
}

impl std::fmt::Display for HeuristicArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HeuristicArg::Wd => "wd",
            HeuristicArg::WdMd => "wd-md",
            HeuristicArg::Pdb555 => "pdb555",
            HeuristicArg::Pdb663 => "pdb663",
            HeuristicArg::Pdb78 => "pdb78",
        };
        write!(f, "{s}")
    }
}

impl From<HeuristicArg> for HeuristicKind {
    fn from(value: HeuristicArg) -> Self {
        match value {
            HeuristicArg::Wd => HeuristicKind::Wd,
            HeuristicArg::WdMd => HeuristicKind::WdMd,
            HeuristicArg::Pdb555 => HeuristicKind::Pdb555,
            HeuristicArg::Pdb663 => HeuristicKind::Pdb663,
            HeuristicArg::Pdb78 => HeuristicKind::Pdb78,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Moderate,
    Hard,
    Random,
}

impl std::fmt::Display for DifficultyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DifficultyArg::Easy => "easy",
            DifficultyArg::Moderate => "moderate",
            DifficultyArg::Hard => "hard",
            DifficultyArg::Random => "random",
        };
        write!(f, "{s}")
    }
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Moderate => Difficulty::Moderate,
            DifficultyArg::Hard => Difficulty::Hard,
            DifficultyArg::Random => Difficulty::Random,
        }
    }
}

/// Parses "a,b,c,..." into 16 tile values, rejecting anything that isn't
/// exactly 16 comma-separated bytes.
fn parse_tiles(s: &str) -> Result<[u8; 16]> {
    let values: Vec<u8> = s
        .split(',')
        .map(str::trim)
        .map(|v| v.parse::<u8>().wrap_err_with(|| format!("'{v}' is not a valid tile value")))
        .collect::<Result<_>>()?;
    let tiles: [u8; 16] = values
        .try_into()
        .map_err(|v: Vec<u8>| eyre!("expected 16 tile values, got {}", v.len()))?;
    Ok(tiles)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve {
            tiles,
            heuristic,
            timeout,
            database,
        } => solve(&tiles, heuristic.into(), timeout, &database),
        Command::Heuristic {
            tiles,
            heuristic,
            database,
        } => heuristic_cmd(&tiles, heuristic.into(), &database),
        Command::Generate { difficulty } => generate(difficulty.into()),
    }
}

fn solve(tiles: &str, kind: HeuristicKind, timeout: Option<u64>, database: &PathBuf) -> Result<()> {
    let board = Board::from_tiles(parse_tiles(tiles)?)?;
    println!("{board}");

    let mut solver = Solver::new(database, kind)?;
    if let Some(secs) = timeout {
        solver.set_timeout(secs);
    }

    log::info!("{}", fifteen_core::start!("searching for an optimal solution"));
    let outcome = solver.find_optimal_path(&board);

    if !board.is_solvable() {
        println!("unsolvable: this configuration cannot reach the goal");
        return Ok(());
    }
    if outcome.timed_out {
        println!("search timed out before finding a solution");
        return Ok(());
    }

    let moves: Vec<String> = outcome.moves.iter().map(ToString::to_string).collect();
    log::info!(
        fifteen_core::success!("solved in {} moves ({} nodes searched)"),
        outcome.steps,
        outcome.nodes_searched
    );
    println!("moves: {}", moves.join(" "));
    Ok(())
}

fn heuristic_cmd(tiles: &str, kind: HeuristicKind, database: &PathBuf) -> Result<()> {
    let board = Board::from_tiles(parse_tiles(tiles)?)?;
    let solver = Solver::new(database, kind)?;
    match solver.heuristic(&board) {
        Some(h) => println!("{h}"),
        None => println!("unsolvable"),
    }
    Ok(())
}

fn generate(difficulty: Difficulty) -> Result<()> {
    let rng = fastrand::Rng::new();
    let board = difficulty::generate(difficulty, &rng);
    println!("{board}");
    Ok(())
}
