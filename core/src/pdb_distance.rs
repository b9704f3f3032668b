//! Per-group pattern-database distance tables.
//!
//! [`crate::element_tables::GroupTables`] only carries the combinatorial
//! machinery shared by every group of a given size (key rotation, format
//! links); the actual admissible distances — "how many moves does it take
//! to bring just this group's tiles home, ignoring every other tile" — are
//! specific to *which* tiles make up a group, since that determines the
//! goal key and goal format the retrograde search starts from. This module
//! is the BFS that fills those distances in and the file they're persisted
//! to, one level above the element tables the way `phase2/src/pruning.rs`
//! sits one level above `phase2/src/puzzle.rs` in qter (that file is
//! missing from the retrieved copy of the repo, so this is grounded
//! instead on the same BFS-to-dense-index shape used throughout this crate
//! for [`crate::walking_distance`] and for the element tables themselves).

use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::direction::ALL_DIRECTIONS;
use crate::element_tables::GroupTables;

/// Distances for one specific pattern group (e.g. `{1,2,3,4,5,6}`), indexed
/// by `key_idx * format_count + format_idx`.
#[derive(Debug, Clone)]
pub struct GroupDistances {
    pub g: usize,
    pub format_count: usize,
    pub distance: Vec<u8>,
}

/// A stable identifier for a group's file name, independent of the order
/// its labels were listed in (sorted, dash-joined).
#[must_use]
pub fn group_id(labels: &[u8]) -> String {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();
    sorted.iter().map(u8::to_string).collect::<Vec<_>>().join("-")
}

impl GroupDistances {
    /// Retrograde BFS from the group's goal (key, format) outward over
    /// every combination reachable by moving one of the group's tiles into
    /// an adjacent non-group cell. The distance never exceeds the known
    /// 15-puzzle diameter bound (80), so `u8` is ample.
    #[must_use]
    pub fn generate(tables: &GroupTables, goal_key_idx: usize, goal_format_idx: usize) -> GroupDistances {
        let g = tables.g;
        let format_count = tables.formats2combo.len();
        let total = tables.keys2combo.len() * format_count;
        let mut distance = vec![u8::MAX; total];

        let goal_state = goal_key_idx * format_count + goal_format_idx;
        distance[goal_state] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(goal_state);

        while let Some(state) = queue.pop_front() {
            let key_idx = state / format_count;
            let format_idx = state % format_count;
            let depth = distance[state];
            let bitmap = tables.formats2combo[format_idx];

            for slot in 0..g {
                for dir in ALL_DIRECTIONS {
                    let combo_slot = slot * 4 + dir.index();
                    let entry = tables.link_format_combo[format_idx * g * 4 + combo_slot];
                    let next_bitmap = entry >> 4;
                    let shift_code = entry & 0xF;
                    if next_bitmap == bitmap {
                        continue;
                    }
                    let next_format_idx = tables
                        .formats2combo
                        .binary_search(&next_bitmap)
                        .expect("format link always points at an indexed bitmap");
                    let next_key_idx = tables.rotate(key_idx, slot, shift_code);
                    let next_state = next_key_idx * format_count + next_format_idx;
                    if distance[next_state] == u8::MAX {
                        distance[next_state] = depth + 1;
                        queue.push_back(next_state);
                    }
                }
            }
        }

        GroupDistances {
            g,
            format_count,
            distance,
        }
    }

    #[must_use]
    pub fn lookup(&self, key_idx: usize, format_idx: usize) -> u8 {
        self.distance[key_idx * self.format_count + format_idx]
    }
}

pub fn table_path(dir: &Path, labels: &[u8]) -> PathBuf {
    dir.join(format!("pattern_pdb_{}.db", group_id(labels)))
}

pub fn write_table(path: &Path, distances: &GroupDistances) -> std::io::Result<()> {
    let tmp_path = path.with_extension("db.tmp");
    let result = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(&distances.distance)?;
        f.flush()
    })();
    match result {
        Ok(()) => fs::rename(&tmp_path, path),
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

pub fn read_table(path: &Path, g: usize, format_count: usize, key_count: usize) -> std::io::Result<GroupDistances> {
    let mut f = fs::File::open(path)?;
    let mut distance = vec![0u8; key_count * format_count];
    f.read_exact(&mut distance)?;
    Ok(GroupDistances {
        g,
        format_count,
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_tables::GroupTables;

    #[test]
    fn goal_state_has_zero_distance() {
        let tables = GroupTables::generate(3);
        // Identity key is always index 0 (the smallest packed permutation
        // is 0,1,2,...,g-1).
        let goal_key_idx = 0;
        let goal_format_idx = 0;
        let dists = GroupDistances::generate(&tables, goal_key_idx, goal_format_idx);
        assert_eq!(dists.lookup(goal_key_idx, goal_format_idx), 0);
    }

    #[test]
    fn bfs_reaches_states_beyond_the_goal() {
        let tables = GroupTables::generate(3);
        let dists = GroupDistances::generate(&tables, 0, 0);
        let reachable = dists.distance.iter().filter(|&&d| d != u8::MAX).count();
        assert!(reachable > 1, "BFS should discover more than just the goal state");
    }

    #[test]
    fn group_id_is_order_independent() {
        assert_eq!(group_id(&[4, 1, 2]), group_id(&[1, 2, 4]));
    }
}
