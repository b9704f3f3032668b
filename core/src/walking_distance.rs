//! The walking-distance heuristic: a strong admissible lower bound computed
//! purely from how tiles are distributed among rows (or, via the symmetry
//! twin, columns), ignoring which column (row) within that row a tile
//! actually sits in.
//!
//! Built the same way [`crate::element_tables`] builds its key/format
//! spaces: BFS outward from the goal state, hash-consing every newly
//! discovered state into a dense index so the solver can use plain array
//! lookups at search time instead of hashing on every node.

use std::collections::{HashMap, VecDeque};

/// `cnt[physical_row][goal_row]` plus which physical row holds the blank.
/// The blank counts as a 16th "tile" whose goal row is always 3, so every
/// physical row's counts always sum to 4.
type CountMatrix = [[u8; 4]; 4];

fn pack_state(cnt: &CountMatrix, blank_row: u8) -> u64 {
    let mut key = u64::from(blank_row);
    for row in cnt {
        for &c in row {
            key = (key << 3) | u64::from(c);
        }
    }
    key
}

const GOAL_BLANK_ROW: u8 = 3;

fn goal_state() -> CountMatrix {
    let mut cnt = [[0u8; 4]; 4];
    for r in 0..4 {
        cnt[r][r] = 4;
    }
    cnt
}

/// Row-projection of a board's tiles: `cnt[physical_row][goal_row]`, with
/// the blank treated as belonging to goal row 3 (spec.md §3's walking
/// distance state). `tiles` is in row-major order, so this literally counts
/// each tile's current row against `(value - 1) / 4`, and 0 (the blank)
/// against row 3.
#[must_use]
pub fn row_projection(tiles: &[u8; 16]) -> (CountMatrix, u8) {
    let mut cnt = [[0u8; 4]; 4];
    let mut blank_row = 0u8;
    for (pos, &v) in tiles.iter().enumerate() {
        let physical_row = pos / 4;
        let goal_row = if v == 0 { 3 } else { usize::from((v - 1) / 4) };
        cnt[physical_row][goal_row] += 1;
        if v == 0 {
            blank_row = u8::try_from(physical_row).unwrap();
        }
    }
    (cnt, blank_row)
}

/// BFS-built index-transition table over the walking-distance state space.
#[derive(Debug, Clone)]
pub struct WalkingDistanceTable {
    index_of: HashMap<u64, usize>,
    /// `value[idx]` = BFS depth from the goal state = the WD heuristic.
    value: Vec<u32>,
    /// `transition[idx][goal_row][direction]`, `direction` 0 = blank moves
    /// up (row-1), 1 = blank moves down (row+1). `None` when the move is
    /// off-board or no tile with that goal row sits in the adjacent row.
    transition: Vec<[[Option<usize>; 2]; 4]>,
}

impl WalkingDistanceTable {
    /// Explores every state reachable from the goal arrangement. The state
    /// space is small (order of a few tens of thousands of states) so this
    /// always terminates quickly.
    #[must_use]
    pub fn generate() -> WalkingDistanceTable {
        let mut index_of = HashMap::new();
        let mut states: Vec<(CountMatrix, u8)> = Vec::new();
        let mut value = Vec::new();
        let mut transition: Vec<[[Option<usize>; 2]; 4]> = Vec::new();
        let mut queue = VecDeque::new();

        let start = (goal_state(), GOAL_BLANK_ROW);
        index_of.insert(pack_state(&start.0, start.1), 0);
        states.push(start);
        value.push(0);
        transition.push([[None; 2]; 4]);
        queue.push_back(0usize);

        while let Some(idx) = queue.pop_front() {
            let (cnt, blank_row) = states[idx];
            let depth = value[idx];

            for (dir_code, delta) in [(0i8, -1i8), (1, 1)] {
                let adj = i8::try_from(blank_row).unwrap() + delta;
                if !(0..4).contains(&adj) {
                    continue;
                }
                let adj = adj as usize;
                for g in 0..4usize {
                    if cnt[adj][g] == 0 {
                        continue;
                    }
                    let mut next = cnt;
                    next[blank_row as usize][3] -= 1;
                    next[adj][3] += 1;
                    next[adj][g] -= 1;
                    next[blank_row as usize][g] += 1;
                    let next_blank_row = u8::try_from(adj).unwrap();

                    let key = pack_state(&next, next_blank_row);
                    let next_idx = *index_of.entry(key).or_insert_with(|| {
                        states.push((next, next_blank_row));
                        value.push(depth + 1);
                        transition.push([[None; 2]; 4]);
                        queue.push_back(states.len() - 1);
                        states.len() - 1
                    });

                    transition[idx][g][dir_code as usize] = Some(next_idx);
                }
            }
        }

        WalkingDistanceTable {
            index_of,
            value,
            transition,
        }
    }

    /// The dense index of a given row-projection, if reachable from the
    /// goal (every projection of a solvable board is).
    #[must_use]
    pub fn index_of(&self, cnt: &CountMatrix, blank_row: u8) -> Option<usize> {
        self.index_of.get(&pack_state(cnt, blank_row)).copied()
    }

    #[must_use]
    pub fn value(&self, idx: usize) -> u32 {
        self.value[idx]
    }

    /// `(idx, moving tile's goal row, blank direction)` -> next index, where
    /// direction 0 = up, 1 = down, mirroring [`WalkingDistanceTable::generate`].
    #[must_use]
    pub fn transition(&self, idx: usize, goal_row: usize, direction_down: bool) -> Option<usize> {
        self.transition[idx][goal_row][usize::from(direction_down)]
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.value.len()
    }
}
