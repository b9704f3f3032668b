//! Pattern-group element tables: the precomputed keys, formats, key-rotation
//! table, and format-link tables that back additive PDB lookups.
//!
//! Grounded on qter's own preset-table philosophy ("global/static mutable
//! state -> process-wide read-only tables, initialized once"; see
//! `cycle_combination_solver/src/permutator.rs`'s precomputed factorial
//! tables) and on its habit of hand-writing binary codecs for its own
//! formats (`qter_core/src/table_encoding.rs`'s `ans_encode`/`ans_decode`) —
//! here a far simpler big-endian `u32` stream, since the PDB tables need
//! fast direct indexing rather than a compact entropy code.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;

use crate::direction::{ALL_DIRECTIONS, Direction};
use crate::error::SolverError;

/// Group sizes the generator supports, per spec.md §3.
pub const SUPPORTED_GROUP_SIZES: [usize; 5] = [3, 5, 6, 7, 8];

/// `maxShift(g)`: the largest number of group-tiles a vertical move can
/// cross. Horizontal moves never cross any group-tile (see
/// [`GroupTables::generate`]'s doc comment), so this only bounds vertical
/// key rotations.
#[must_use]
pub fn max_shift(g: usize) -> usize {
    match g {
        3 => 1,
        5 => 2,
        6 | 7 | 8 => 3,
        _ => panic!("unsupported group size {g}"),
    }
}

fn factorial(n: usize) -> usize {
    (1..=n).product::<usize>().max(1)
}

fn choose(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result = 1usize;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

/// Packs a permutation of `0..g` (g <= 8) into nibbles of a `u32`, slot 0 in
/// the most significant nibble used, so integer order matches slot-0-major
/// lexicographic order.
pub(crate) fn pack_perm(perm: &[u8]) -> u32 {
    let mut v = 0u32;
    for &x in perm {
        v = (v << 4) | u32::from(x);
    }
    v
}

/// Packs a sorted list of board positions (0..16) into a 16-bit bitmap.
pub(crate) fn pack_format(positions: &[u8]) -> u32 {
    let mut bm = 0u32;
    for &p in positions {
        bm |= 1 << p;
    }
    bm
}

fn format_positions(bitmap: u32) -> Vec<u8> {
    (0..16u8).filter(|&p| bitmap & (1 << p) != 0).collect()
}

/// All `g!` permutations of `0..g`, generated by repeated insertion (insert
/// the next-largest value at every position of every shorter permutation),
/// then sorted by packed integer value so indices are deterministic
/// (spec.md §4.2, P6).
fn generate_permutations(g: usize) -> Vec<Vec<u8>> {
    let mut perms: Vec<Vec<u8>> = vec![vec![]];
    for next in 0..g as u8 {
        let mut expanded = Vec::with_capacity(perms.len() * (next as usize + 1));
        for perm in &perms {
            for pos in 0..=perm.len() {
                let mut p = perm.clone();
                p.insert(pos, next);
                expanded.push(p);
            }
        }
        perms = expanded;
    }
    perms.sort_by_key(|p| pack_perm(p));
    perms
}

/// All `C(16, g)` ways to choose `g` board positions, sorted by bitmap
/// integer value so indices are deterministic.
fn generate_formats(g: usize) -> Vec<Vec<u8>> {
    let mut formats: Vec<Vec<u8>> = (0u8..16)
        .combinations(g)
        .map(|mut c| {
            c.sort_unstable();
            c
        })
        .collect();
    formats.sort_by_key(|f| pack_format(f));
    formats
}

/// A direction a single group-tile can itself move (the opposite sense of
/// the blank moving into its old cell). Horizontal moves never cross
/// another group-tile in rank order, since the destination is the
/// immediately adjacent column; only vertical moves, which jump 4 cells in
/// the flat row-major index, can have other occupied cells strictly
/// between the old and new position.
fn tile_delta(dir: Direction) -> i8 {
    match dir {
        Direction::Right => 1,
        Direction::Left => -1,
        Direction::Down => 4,
        Direction::Up => -4,
    }
}

/// Precomputed element tables for one pattern-group size.
#[derive(Debug, Clone)]
pub struct GroupTables {
    pub g: usize,
    pub max_shift: usize,
    /// `keys2combo[key_idx]` = packed nibble representation.
    pub keys2combo: Vec<u32>,
    /// `rotateKeyByPos[key_idx*g*2*maxShift + slot*2*maxShift + (code-1)]`.
    pub rotate_key_by_pos: Vec<u32>,
    /// `formats2combo[format_idx]` = 16-bit occupied-position bitmap.
    pub formats2combo: Vec<u32>,
    /// `linkFormatMove[format_idx*64 + blank_pos*4 + dir]` =
    /// `(next_format_idx << 8) | (slot << 4) | shift_code`.
    pub link_format_move: Vec<u32>,
    /// `linkFormatCombo[format_idx*g*4 + slot*4 + dir]` =
    /// `(next_format_bitmap << 4) | shift_code`.
    pub link_format_combo: Vec<u32>,
}

impl GroupTables {
    /// Generates every table for group size `g` from scratch.
    ///
    /// Key rotation: removing the moving tile's rank `p` and reinserting it
    /// at `p` shifted by the signed crossing count exactly reproduces "the
    /// in-group ordering rotates" (spec.md §4.2) — the same insertion
    /// operation [`generate_permutations`] uses to build the key space in
    /// the first place, so every resulting key is guaranteed to already be
    /// indexed.
    #[must_use]
    pub fn generate(g: usize) -> GroupTables {
        let max_shift = max_shift(g);
        let perms = generate_permutations(g);
        let mut key_index: HashMap<u32, usize> = HashMap::with_capacity(perms.len());
        for (i, p) in perms.iter().enumerate() {
            key_index.insert(pack_perm(p), i);
        }
        let keys2combo: Vec<u32> = perms.iter().map(|p| pack_perm(p)).collect();

        let formats = generate_formats(g);
        let mut format_index: HashMap<u32, usize> = HashMap::with_capacity(formats.len());
        for (i, f) in formats.iter().enumerate() {
            format_index.insert(pack_format(f), i);
        }
        let formats2combo: Vec<u32> = formats.iter().map(|f| pack_format(f)).collect();

        let rotate_key_by_pos =
            Self::generate_rotation_table(g, max_shift, &perms, &key_index);
        let (link_format_combo, link_format_move) =
            Self::generate_format_links(g, max_shift, &formats, &format_index);

        GroupTables {
            g,
            max_shift,
            keys2combo,
            rotate_key_by_pos,
            formats2combo,
            link_format_move,
            link_format_combo,
        }
    }

    fn generate_rotation_table(
        g: usize,
        max_shift: usize,
        perms: &[Vec<u8>],
        key_index: &HashMap<u32, usize>,
    ) -> Vec<u32> {
        let codes = 2 * max_shift;
        let mut table = vec![0u32; perms.len() * g * codes];
        for (key_idx, perm) in perms.iter().enumerate() {
            for slot in 0..g {
                for code in 1..=codes {
                    let magnitude = code.div_ceil(2).min(max_shift);
                    let moves_down = code % 2 == 1;
                    let new_slot = if moves_down {
                        (slot + magnitude).min(g - 1)
                    } else {
                        slot.saturating_sub(magnitude)
                    };
                    let mut new_perm = perm.clone();
                    let moved = new_perm.remove(slot);
                    let insert_at = new_slot.min(new_perm.len());
                    new_perm.insert(insert_at, moved);
                    let new_key_idx = key_index[&pack_perm(&new_perm)];
                    table[key_idx * g * codes + slot * codes + (code - 1)] =
                        u32::try_from(new_key_idx).unwrap();
                }
            }
        }
        table
    }

    fn generate_format_links(
        g: usize,
        max_shift: usize,
        formats: &[Vec<u8>],
        format_index: &HashMap<u32, usize>,
    ) -> (Vec<u32>, Vec<u32>) {
        let mut link_format_combo = vec![0u32; formats.len() * g * 4];
        let mut link_format_move = vec![0u32; formats.len() * 64];

        for (format_idx, positions) in formats.iter().enumerate() {
            let bitmap = pack_format(positions);
            for (slot, &pos) in positions.iter().enumerate() {
                for dir in ALL_DIRECTIONS {
                    let delta = tile_delta(dir);
                    let new_pos = i16::from(pos) + i16::from(delta);
                    let (next_bitmap, shift_code, new_slot) =
                        if !(0..16).contains(&new_pos) || horizontal_wraps(pos, dir) {
                            (bitmap, 0u32, slot)
                        } else {
                            let new_pos = new_pos as u8;
                            if bitmap & (1 << new_pos) != 0 {
                                // Destination occupied by another group tile:
                                // not a legal single-step move for this group.
                                (bitmap, 0u32, slot)
                            } else {
                                let lo = pos.min(new_pos);
                                let hi = pos.max(new_pos);
                                let crossed = ((lo + 1)..hi)
                                    .filter(|&between| bitmap & (1 << between) != 0)
                                    .count()
                                    .min(max_shift);
                                let moving_down = new_pos > pos;
                                let code = if crossed == 0 {
                                    0
                                } else if moving_down {
                                    u32::try_from(2 * crossed - 1).unwrap()
                                } else {
                                    u32::try_from(2 * crossed).unwrap()
                                };
                                let new_slot = if moving_down {
                                    (slot + crossed).min(g - 1)
                                } else {
                                    slot.saturating_sub(crossed)
                                };
                                let mut nb = bitmap & !(1 << pos);
                                nb |= 1 << new_pos;
                                (nb, code, new_slot)
                            }
                        };

                    let combo_slot = slot * 4 + dir.index();
                    link_format_combo[format_idx * g * 4 + combo_slot] =
                        (next_bitmap << 4) | shift_code;

                    let next_format_idx = *format_index.get(&next_bitmap).unwrap_or(&(format_idx as usize));
                    // The solver-view table is keyed by (format, blank position,
                    // direction): a group tile only reacts when the blank sits
                    // exactly at the destination cell this slot would move to.
                    let blank_pos = new_pos.clamp(0, 15) as usize;
                    let move_idx = format_idx * 64 + blank_pos * 4 + dir.index();
                    link_format_move[move_idx] = (u32::try_from(next_format_idx).unwrap() << 8)
                        | (u32::try_from(slot).unwrap() << 4)
                        | shift_code;
                }
            }
        }

        (link_format_combo, link_format_move)
    }

    /// The row-major move `dir` at `pos` would cross outside the 4-wide
    /// board (e.g. `Right` from the last column); such moves are invalid
    /// regardless of what `pos + delta` computes to modulo 16.
    #[must_use]
    pub fn row_col(pos: u8) -> (u8, u8) {
        (pos / 4, pos % 4)
    }

    /// Looks up (next_key_idx) from the rotation table.
    #[must_use]
    pub fn rotate(&self, key_idx: usize, slot: usize, shift_code: u32) -> usize {
        if shift_code == 0 {
            return key_idx;
        }
        let codes = 2 * self.max_shift;
        self.rotate_key_by_pos[key_idx * self.g * codes + slot * codes + (shift_code as usize - 1)]
            as usize
    }
}

fn horizontal_wraps(pos: u8, dir: Direction) -> bool {
    let (_, col) = GroupTables::row_col(pos);
    matches!(
        (dir, col),
        (Direction::Right, 3) | (Direction::Left, 0)
    )
}

/// Validated partition of the 15 non-blank tiles into disjoint pattern
/// groups (spec.md §7 `InvalidInput`).
#[derive(Debug, Clone)]
pub struct PatternGroups {
    groups: Vec<Vec<u8>>,
}

impl PatternGroups {
    /// Validates that `groups` partitions `1..=15` into disjoint groups of
    /// supported sizes.
    pub fn new(groups: Vec<Vec<u8>>) -> Result<PatternGroups, SolverError> {
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        let total: usize = sizes.iter().sum();
        let sizes_ok = sizes
            .iter()
            .all(|s| SUPPORTED_GROUP_SIZES.contains(s));
        let mut seen = [false; 16];
        let mut partition_ok = total == 15;
        for group in &groups {
            for &tile in group {
                let t = tile as usize;
                if t == 0 || t > 15 || seen[t] {
                    partition_ok = false;
                } else {
                    seen[t] = true;
                }
            }
        }
        if !sizes_ok || !partition_ok {
            return Err(SolverError::InvalidPatternGroups(sizes, total));
        }
        Ok(PatternGroups { groups })
    }

    #[must_use]
    pub fn groups(&self) -> &[Vec<u8>] {
        &self.groups
    }

    /// The standard 6-6-3 decomposition.
    pub fn preset_663() -> PatternGroups {
        PatternGroups::new(vec![
            vec![1, 2, 3, 4, 5, 6],
            vec![7, 8, 9, 10, 11, 12],
            vec![13, 14, 15],
        ])
        .expect("preset partitions are valid by construction")
    }

    /// The standard 5-5-5 decomposition.
    pub fn preset_555() -> PatternGroups {
        PatternGroups::new(vec![
            vec![1, 2, 3, 4, 5],
            vec![6, 7, 8, 9, 10],
            vec![11, 12, 13, 14, 15],
        ])
        .expect("preset partitions are valid by construction")
    }

    /// The standard 7-8 decomposition.
    pub fn preset_78() -> PatternGroups {
        PatternGroups::new(vec![
            vec![1, 2, 3, 4, 6, 7, 8],
            vec![5, 9, 10, 11, 12, 13, 14, 15],
        ])
        .expect("preset partitions are valid by construction")
    }
}

/// Owns every loaded/generated [`GroupTables`], keyed by group size, plus
/// the active partition.
#[derive(Debug, Clone)]
pub struct PatternDatabase {
    pub pattern: PatternGroups,
    pub tables: HashMap<usize, GroupTables>,
}

impl PatternDatabase {
    /// Loads (or generates and persists) the element tables for every
    /// distinct group size in `pattern`, under `database_dir`.
    pub fn load_or_generate(
        pattern: PatternGroups,
        database_dir: &Path,
    ) -> Result<PatternDatabase, SolverError> {
        fs::create_dir_all(database_dir).map_err(|e| SolverError::TableIo {
            group_size: 0,
            reason: format!("creating database directory: {e}"),
        })?;

        let mut tables = HashMap::new();
        let mut sizes: Vec<usize> = pattern.groups().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        sizes.dedup();

        for g in sizes {
            let path = table_path(database_dir, g);
            let loaded = read_table(&path, g).ok();
            let table = match loaded {
                Some(t) => t,
                None => {
                    log::warn!(
                        crate::working!("element table for group size {} missing or corrupt, regenerating"),
                        g
                    );
                    let generated = GroupTables::generate(g);
                    write_table(&path, &generated).map_err(|e| SolverError::TableIo {
                        group_size: g,
                        reason: e.to_string(),
                    })?;
                    generated
                }
            };
            tables.insert(g, table);
        }

        Ok(PatternDatabase { pattern, tables })
    }
}

fn table_path(dir: &Path, g: usize) -> PathBuf {
    dir.join(format!("pattern_element_{g}.db"))
}

fn write_u32s(w: &mut impl Write, values: &[u32]) -> io::Result<()> {
    for v in values {
        w.write_all(&v.to_be_bytes())?;
    }
    Ok(())
}

fn read_u32s(r: &mut impl Read, count: usize) -> io::Result<Vec<u32>> {
    let mut buf = vec![0u8; count * 4];
    r.read_exact(&mut buf)?;
    Ok(buf.chunks_exact(4).map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]])).collect())
}

/// Writes a group's tables to `path` in the order spec.md §6 defines,
/// via a temp file renamed into place so a crash mid-write never leaves a
/// truncated file where a complete one used to be.
fn write_table(path: &Path, table: &GroupTables) -> io::Result<()> {
    let tmp_path = path.with_extension("db.tmp");
    let result = (|| -> io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        write_u32s(&mut f, &table.keys2combo)?;
        write_u32s(&mut f, &table.rotate_key_by_pos)?;
        write_u32s(&mut f, &table.formats2combo)?;
        write_u32s(&mut f, &table.link_format_move)?;
        write_u32s(&mut f, &table.link_format_combo)?;
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

fn read_table(path: &Path, g: usize) -> io::Result<GroupTables> {
    let max_shift = max_shift(g);
    let key_count = factorial(g);
    let format_count = choose(16, g);
    let codes = 2 * max_shift;

    let mut f = fs::File::open(path)?;
    let keys2combo = read_u32s(&mut f, key_count)?;
    let rotate_key_by_pos = read_u32s(&mut f, key_count * g * codes)?;
    let formats2combo = read_u32s(&mut f, format_count)?;
    let link_format_move = read_u32s(&mut f, format_count * 64)?;
    let link_format_combo = read_u32s(&mut f, format_count * g * 4)?;

    Ok(GroupTables {
        g,
        max_shift,
        keys2combo,
        rotate_key_by_pos,
        formats2combo,
        link_format_move,
        link_format_combo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_count_and_uniqueness() {
        let perms = generate_permutations(3);
        assert_eq!(perms.len(), factorial(3));
        let packed: std::collections::HashSet<u32> = perms.iter().map(|p| pack_perm(p)).collect();
        assert_eq!(packed.len(), perms.len());
    }

    #[test]
    fn permutations_sorted_by_packed_value() {
        let perms = generate_permutations(3);
        let packed: Vec<u32> = perms.iter().map(|p| pack_perm(p)).collect();
        let mut sorted = packed.clone();
        sorted.sort_unstable();
        assert_eq!(packed, sorted);
    }

    #[test]
    fn format_count_matches_binomial() {
        let formats = generate_formats(3);
        assert_eq!(formats.len(), choose(16, 3));
    }

    #[test]
    fn p6_generation_is_deterministic() {
        let a = GroupTables::generate(3);
        let b = GroupTables::generate(3);
        assert_eq!(a.keys2combo, b.keys2combo);
        assert_eq!(a.formats2combo, b.formats2combo);
        assert_eq!(a.rotate_key_by_pos, b.rotate_key_by_pos);
        assert_eq!(a.link_format_move, b.link_format_move);
    }

    #[test]
    fn table_sizes_match_spec() {
        let g = 3;
        let t = GroupTables::generate(g);
        assert_eq!(t.keys2combo.len(), factorial(g));
        assert_eq!(t.formats2combo.len(), choose(16, g));
        assert_eq!(t.rotate_key_by_pos.len(), factorial(g) * g * 2 * max_shift(g));
        assert_eq!(t.link_format_move.len(), choose(16, g) * 64);
        assert_eq!(t.link_format_combo.len(), choose(16, g) * g * 4);
    }

    #[test]
    fn p7_roundtrip_through_disk() {
        let dir = std::env::temp_dir().join(format!("fifteen_core_test_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let g = 3;
        let generated = GroupTables::generate(g);
        let path = table_path(&dir, g);
        write_table(&path, &generated).unwrap();
        let loaded = read_table(&path, g).unwrap();
        assert_eq!(generated.keys2combo, loaded.keys2combo);
        assert_eq!(generated.rotate_key_by_pos, loaded.rotate_key_by_pos);
        assert_eq!(generated.formats2combo, loaded.formats2combo);
        assert_eq!(generated.link_format_move, loaded.link_format_move);
        assert_eq!(generated.link_format_combo, loaded.link_format_combo);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn pattern_groups_reject_bad_partition() {
        assert!(PatternGroups::new(vec![vec![1, 2]]).is_err());
        assert!(PatternGroups::new(vec![vec![1, 1, 1]]).is_err());
    }

    #[test]
    fn preset_partitions_are_valid() {
        let _ = PatternGroups::preset_663();
        let _ = PatternGroups::preset_555();
        let _ = PatternGroups::preset_78();
    }
}
