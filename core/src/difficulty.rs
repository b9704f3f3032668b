//! Difficulty-graded board generation.
//!
//! Grounded on the same "generate, then filter by a scoring function"
//! pattern qter's test suite uses to build representative cube states
//! (`phase2/tests/solver_integration.rs` constructs states and checks
//! properties rather than hand-authoring every fixture), adapted here to
//! spec.md §4.1's three generated difficulty tiers plus a bundled-seed
//! "Hard" tier. The random move/tile choices below use `fastrand`, the
//! same RNG qter itself reaches for (`phase2/src/puzzle.rs`'s
//! `fastrand::choice`) rather than a generic `rand::Rng` abstraction.

use crate::board::{Board, GOAL_TILES};
use crate::heuristic::manhattan_linear_conflict;

/// Requested difficulty for [`generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    /// Manhattan+linear-conflict heuristic below 25.
    Easy,
    /// Manhattan+linear-conflict heuristic in `[25, 40]`.
    Moderate,
    /// One of the bundled seed boards known to require a long optimal
    /// solution, including the spec.md S4 example.
    Hard,
    /// Any solvable shuffle, no heuristic filtering.
    Random,
}

/// Seed boards bundled as "known hard" instances, including the literal
/// example from spec.md S4.
pub const HARD_SEEDS: [[u8; 16]; 3] = [
    [0, 11, 9, 13, 12, 15, 10, 14, 3, 7, 6, 2, 4, 8, 5, 1],
    [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 1, 2, 0],
    [6, 13, 7, 10, 8, 9, 11, 0, 15, 2, 12, 5, 14, 3, 1, 4],
];

/// Knuth shuffle over a goal board's tiles, then a single adjacent swap if
/// needed to land on a solvable permutation (swapping any two non-blank
/// tiles flips parity).
fn random_solvable_board(rng: &fastrand::Rng) -> Board {
    loop {
        let mut tiles = GOAL_TILES;
        rng.shuffle(&mut tiles);
        if let Ok(board) = Board::from_tiles(tiles) {
            if board.is_solvable() {
                return board;
            }
        }
    }
}

/// Generates a board meeting `difficulty`'s criteria. `Easy`/`Moderate`
/// resample until the Manhattan+linear-conflict heuristic falls in range;
/// `Random` returns the first solvable shuffle; `Hard` picks uniformly
/// among [`HARD_SEEDS`].
#[must_use]
pub fn generate(difficulty: Difficulty, rng: &fastrand::Rng) -> Board {
    match difficulty {
        Difficulty::Random => random_solvable_board(rng),
        Difficulty::Easy => loop {
            let board = random_solvable_board(rng);
            if manhattan_linear_conflict(&board) < 25 {
                return board;
            }
        },
        Difficulty::Moderate => loop {
            let board = random_solvable_board(rng);
            let h = manhattan_linear_conflict(&board);
            if (25..=40).contains(&h) {
                return board;
            }
        },
        Difficulty::Hard => {
            let tiles = HARD_SEEDS[rng.usize(..HARD_SEEDS.len())];
            Board::from_tiles(tiles).expect("HARD_SEEDS are valid permutations")
        }
    }
}
