//! An optimal solver for the 4x4 sliding-tile puzzle (the "15-puzzle").
//!
//! Given any solvable configuration, [`solver::Solver::find_optimal_path`]
//! returns a shortest sequence of blank-moves to the goal configuration
//! (tiles `1..=15` in row-major order, blank in the bottom-right).
//!
//! The crate is organized the way the search itself is: a symmetry-reduced
//! [`board::Board`] representation at the bottom, the additive
//! [`element_tables`] pattern-database infrastructure and
//! [`walking_distance`] table above it, a [`heuristic`] combining both with
//! Manhattan distance and linear conflict, and an [`solver`] IDA* engine on
//! top that ties everything together behind the [`solver::Solver`] façade.

pub mod board;
pub mod difficulty;
pub mod direction;
pub mod element_tables;
pub mod error;
pub mod heuristic;
pub mod oracle;
pub mod solver;
pub mod walking_distance;

pub use board::Board;
pub use direction::Direction;
pub use error::SolverError;

#[macro_export]
macro_rules! start {
    ($msg:expr) => {
        concat!("⏳ ", $msg)
    };
}

#[macro_export]
macro_rules! working {
    ($msg:expr) => {
        concat!("🛠  ", $msg)
    };
}

#[macro_export]
macro_rules! success {
    ($msg:expr) => {
        concat!("✅ ", $msg)
    };
}
