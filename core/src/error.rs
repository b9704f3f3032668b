//! Error types for the solver.
//!
//! `UnsolvableBoard` is deliberately absent here: spec.md treats it as a
//! signaled value rather than an error (`Board::is_solvable`,
//! `SolveOutcome::Unsolvable`), mirroring how qter's own solver error enum
//! (`CycleStructureSolverError` in `cycle_combination_solver/src/solver.rs`)
//! only covers conditions a caller couldn't have checked for in advance.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SolverError {
    #[error("tile array must contain exactly 16 values, a permutation of 0..=15, got {0:?}")]
    InvalidTiles(Box<[u8]>),

    #[error(
        "pattern groups must partition the 15 non-blank tiles into disjoint groups of size in {{3,5,6,7,8}}, got sizes {0:?} summing to {1}"
    )]
    InvalidPatternGroups(Vec<usize>, usize),

    #[error("reading element table for group size {group_size} failed: {reason}")]
    TableIo { group_size: usize, reason: String },

    #[error("heuristic kind {0:?} requires a pattern-database partition this solver wasn't constructed with")]
    HeuristicUnavailable(crate::heuristic::HeuristicKind),
}
