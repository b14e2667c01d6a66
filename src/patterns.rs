//! Pattern matching for Go move generation.
//!
//! This module implements pattern-based move heuristics:
//!
//! ## 3x3 Patterns (`pat3`)
//! Fast pattern matching using the 8 neighbors encoded into a lookup table.
//! Used for both playout move generation and MCTS priors.
//!
//! The patterns are stored in a 8192-byte bitfield (`PAT3SET`), where each bit
//! corresponds to a possible 16-bit encoding of the 8 neighbors (env8).
//!
//! ## Large Patterns
//! Larger patterns (up to ~17 points), loaded at startup from a pair of
//! probability/spatial-dictionary files, provide probability estimates for how
//! likely a move is to be good. A point's neighborhood is grown shell by shell
//! outward (the "gridcular" metric, a diamond-ish approximation of Euclidean
//! distance) across all 8 board symmetries, hashed, and looked up against the
//! loaded dictionary; see [`large_pattern_probability`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Context;

use crate::position::{Point, Position};

/// The 3x3 pattern source definitions from michi-c.
/// Each pattern is a 9-character string representing a 3x3 grid:
/// - X: current player (BLACK or WHITE depending on turn)
/// - O: opponent
/// - .: empty
/// - x: not X (i.e., O or . or #)
/// - o: not O (i.e., X or . or #)
/// - ?: any (X, O, ., or #)
/// - #: edge of board (out of bounds)
const PAT3_SRC: &[&str] = &[
    // 1- hane pattern - enclosing hane
    "XOX...???",
    // 2- hane pattern - non-cutting hane
    "XO....?.?",
    // 3- hane pattern - magari
    "XO?X..x.?",
    // 4- generic pattern - katatsuke or diagonal attachment
    ".O.X.....",
    // 5- cut1 pattern (kiri) - unprotected cut
    "XO?O.o?o?",
    // 6- cut1 pattern (kiri) - peeped cut
    "XO?O.X???",
    // 7- cut2 pattern (de)
    "?X?O.Oooo",
    // 8- cut keima
    "OX?o.O???",
    // 9- side pattern - chase
    "X.?O.?##?",
    // 10- side pattern - block side cut
    "OX?X.O###",
    // 11- side pattern - block side connection
    "?X?x.O###",
    // 12- side pattern - sagari
    "?XOx.x###",
    // 13- side pattern - cut
    "?OXX.O###",
];

/// Static storage for the pattern bitfield.
static PAT3SET: OnceLock<[u8; 8192]> = OnceLock::new();

/// Check if a point matches any 3x3 pattern.
///
/// Uses the precomputed pattern table for fast lookup.
/// The env4 and env4d fields encode the 8 neighbors, which are combined
/// into a 16-bit index for the lookup table.
#[inline]
pub fn pat3_match(pos: &Position, pt: Point) -> bool {
    let pat3set = PAT3SET.get_or_init(make_pat3set);

    // Combine env4 (orthogonal) and env4d (diagonal) into env8
    let env8 = (pos.env4[pt] as u16) | ((pos.env4d[pt] as u16) << 8);

    // Look up in the bitfield
    let byte_idx = (env8 >> 3) as usize;
    let bit_idx = (env8 & 7) as u8;

    (pat3set[byte_idx] & (1 << bit_idx)) != 0
}

/// Initialize pattern tables.
///
/// This is called automatically on first use of pat3_match.
pub fn init_patterns() {
    PAT3SET.get_or_init(make_pat3set);
}

/// Build the 3x3 pattern lookup table.
fn make_pat3set() -> [u8; 8192] {
    let mut pat3set = [0u8; 8192];

    for pat_src in PAT3_SRC {
        pat_enumerate(pat_src, &mut pat3set);
    }

    pat3set
}

/// Enumerate all rotations, reflections, and color swaps of a pattern.
fn pat_enumerate(src: &str, pat3set: &mut [u8; 8192]) {
    let mut src: [u8; 9] = src.as_bytes().try_into().unwrap();

    // Apply all symmetries
    pat_enumerate1(&src, pat3set);
    rot90(&mut src);
    pat_enumerate1(&src, pat3set);
}

fn pat_enumerate1(src: &[u8; 9], pat3set: &mut [u8; 8192]) {
    let mut src = *src;
    pat_enumerate2(&src, pat3set);
    vertflip(&mut src);
    pat_enumerate2(&src, pat3set);
}

fn pat_enumerate2(src: &[u8; 9], pat3set: &mut [u8; 8192]) {
    let mut src = *src;
    pat_enumerate3(&src, pat3set);
    horizflip(&mut src);
    pat_enumerate3(&src, pat3set);
}

fn pat_enumerate3(src: &[u8; 9], pat3set: &mut [u8; 8192]) {
    let mut src = *src;
    pat_wildexp(&src, 0, pat3set);
    swapcolor(&mut src);
    pat_wildexp(&src, 0, pat3set);
}

/// Expand wildcards and add all matching patterns to the set.
fn pat_wildexp(src: &[u8; 9], i: usize, pat3set: &mut [u8; 8192]) {
    if i == 9 {
        // All positions processed - compute env8 and set the bit
        let env8 = compute_code(src);
        let byte_idx = (env8 >> 3) as usize;
        let bit_idx = (env8 & 7) as u8;
        pat3set[byte_idx] |= 1 << bit_idx;
        return;
    }

    match src[i] {
        b'?' => {
            // Any of X, O, ., #
            for &c in &[b'X', b'O', b'.', b'#'] {
                let mut new_src = *src;
                new_src[i] = c;
                pat_wildexp(&new_src, i + 1, pat3set);
            }
        }
        b'x' => {
            // Not X (O, ., or #)
            for &c in &[b'O', b'.', b'#'] {
                let mut new_src = *src;
                new_src[i] = c;
                pat_wildexp(&new_src, i + 1, pat3set);
            }
        }
        b'o' => {
            // Not O (X, ., or #)
            for &c in &[b'X', b'.', b'#'] {
                let mut new_src = *src;
                new_src[i] = c;
                pat_wildexp(&new_src, i + 1, pat3set);
            }
        }
        _ => {
            // Fixed character - continue
            pat_wildexp(src, i + 1, pat3set);
        }
    }
}

/// Compute the 16-bit env8 code from a 9-character pattern string.
///
/// The pattern layout is:
/// ```text
/// 0 1 2     bits: 7 0 4
/// 3 4 5  ->       3 . 1
/// 6 7 8           6 2 5
/// ```
///
/// Low 8 bits = env4 (orthogonal neighbors)
/// High 8 bits = env4d (diagonal neighbors)
fn compute_code(src: &[u8; 9]) -> u16 {
    let mut env8: u16 = 0;

    // Orthogonal neighbors (env4)
    env8 |= code(src[1], 0);  // North
    env8 |= code(src[5], 1);  // East
    env8 |= code(src[7], 2);  // South
    env8 |= code(src[3], 3);  // West

    // Diagonal neighbors (env4d) - shifted to high byte
    env8 |= code(src[2], 0) << 8;  // NE
    env8 |= code(src[8], 1) << 8;  // SE
    env8 |= code(src[6], 2) << 8;  // SW
    env8 |= code(src[0], 3) << 8;  // NW

    env8
}

/// Encode a single neighbor color into the appropriate bit positions.
///
/// Color encoding:
/// - O (WHITE): 0
/// - X (BLACK): 1
/// - . (EMPTY): 2
/// - # (OUT): 3
///
/// Each neighbor uses 2 bits stored at positions p and p+4.
fn code(color: u8, p: u8) -> u16 {
    let c = match color {
        b'O' => 0,  // WHITE
        b'X' => 1,  // BLACK
        b'.' => 2,  // EMPTY
        b'#' => 3,  // OUT
        _ => 0,     // Shouldn't happen
    };

    let hi = (c >> 1) & 1;
    let lo = c & 1;
    ((hi << 4) | lo) << p
}

/// Swap X and O colors in a pattern.
fn swapcolor(src: &mut [u8; 9]) {
    for c in src.iter_mut() {
        *c = match *c {
            b'X' => b'O',
            b'O' => b'X',
            b'x' => b'o',
            b'o' => b'x',
            other => other,
        };
    }
}

/// Horizontal flip of a pattern.
fn horizflip(src: &mut [u8; 9]) {
    src.swap(0, 6);
    src.swap(1, 7);
    src.swap(2, 8);
}

/// Vertical flip of a pattern.
fn vertflip(src: &mut [u8; 9]) {
    src.swap(0, 2);
    src.swap(3, 5);
    src.swap(6, 8);
}

/// 90-degree rotation of a pattern.
fn rot90(src: &mut [u8; 9]) {
    let t = src[0];
    src[0] = src[2];
    src[2] = src[8];
    src[8] = src[6];
    src[6] = t;

    let t = src[1];
    src[1] = src[5];
    src[5] = src[7];
    src[7] = src[3];
    src[3] = t;
}

// =============================================================================
// Large Patterns
// =============================================================================

/// Gridcular-distance shells, innermost first, as `(dy, dx)` offsets from the
/// center point. Each shell groups together the points at one step of the
/// gridcular metric (an octagonal approximation of Euclidean distance), the
/// same progression the probability/spatial pattern files were harvested at.
const GRIDCULAR_SHELLS: &[&[(i32, i32)]] = &[
    &[(0, -1), (0, 1), (1, 0), (-1, 0)],
    &[(-1, -1), (1, -1), (-1, 1), (1, 1)],
    &[(0, -2), (0, 2), (2, 0), (-2, 0)],
    &[
        (-1, -2),
        (1, -2),
        (-2, -1),
        (2, -1),
        (-2, 1),
        (2, 1),
        (-1, 2),
        (1, 2),
    ],
    &[
        (0, -3),
        (0, 3),
        (-2, -2),
        (2, -2),
        (-2, 2),
        (2, 2),
        (3, 0),
        (-3, 0),
    ],
    &[
        (-1, -3),
        (1, -3),
        (-3, -1),
        (3, -1),
        (-3, 1),
        (3, 1),
        (-1, 3),
        (1, 3),
    ],
    &[
        (-2, -3),
        (2, -3),
        (-3, -2),
        (3, -2),
        (-3, 2),
        (3, 2),
        (-2, 3),
        (2, 3),
    ],
    &[
        (0, -4),
        (0, 4),
        (-4, -1),
        (4, -1),
        (-1, -4),
        (1, -4),
        (-4, 1),
        (4, 1),
        (-1, 4),
        (1, 4),
        (4, 0),
        (-4, 0),
    ],
];

/// The 8 symmetries of the square (4 rotations x mirror), expressed as
/// `(swap_axes, sign_y, sign_x)` transforms applied to a `(dy, dx)` offset.
const SYMMETRIES: [(bool, i32, i32); 8] = [
    (false, 1, 1),
    (false, -1, 1),
    (false, 1, -1),
    (false, -1, -1),
    (true, 1, 1),
    (true, -1, 1),
    (true, 1, -1),
    (true, -1, -1),
];

/// FNV-1a 64-bit hash, used instead of a language-default hasher so spatial
/// pattern ids are stable across runs and match what the pattern files were
/// built with.
fn fnv1a_hash(data: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// In-memory large-pattern dictionaries.
///
/// `spat_dict` maps the FNV-1a hash of a neighborhood string to a spatial
/// pattern id; `prob_dict` maps that id to the probability a move matching it
/// is worth playing.
#[derive(Default)]
pub struct PatternStore {
    spat_dict: HashMap<u64, u32>,
    prob_dict: HashMap<u32, f64>,
}

impl PatternStore {
    /// A store with no patterns loaded; lookups always return 0.0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a spatial pattern dictionary file's contents.
    ///
    /// Lines look like `71 6 ..X.X..OO.O..........#X...... 33408f5e ...`:
    /// spatial id, diameter, neighborhood string, checksum. `#`-prefixed lines
    /// are comments and skipped. The neighborhood string uses the file's own
    /// convention (`O` for the opponent stone, `#` for off-board); it's
    /// translated to match `Position::color`'s convention (`x` / `' '`)
    /// before hashing, so live lookups and loaded keys agree.
    fn load_spat(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(id_field) = fields.next() else {
                continue;
            };
            let Ok(spatial_id) = id_field.parse::<u32>() else {
                continue;
            };
            let Some(_diameter) = fields.next() else {
                continue;
            };
            let Some(neighborhood) = fields.next() else {
                continue;
            };

            let translated: String = neighborhood
                .chars()
                .map(|c| match c {
                    '#' => ' ',
                    'O' => 'x',
                    other => other,
                })
                .collect();

            self.spat_dict
                .insert(fnv1a_hash(translated.as_bytes()), spatial_id);
        }
    }

    /// Parse a pattern probability file's contents.
    ///
    /// Lines look like `0.004 14 3842 (capture:17 border:0 s:784)`: leading
    /// probability, then free-form annotations, one of which is `s:<id>` -
    /// the spatial id this probability applies to.
    fn load_prob(&mut self, contents: &str) {
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(prob_field) = line.split_whitespace().next() else {
                continue;
            };
            let Ok(probability) = prob_field.parse::<f64>() else {
                continue;
            };
            let Some(spatial_id) = extract_spatial_id(line) else {
                continue;
            };

            self.prob_dict.insert(spatial_id, probability);
        }
    }
}

/// Pull the numeric id out of a `s:<digits>` annotation in a probability line.
fn extract_spatial_id(line: &str) -> Option<u32> {
    let tag_start = line.find("s:")? + 2;
    let digits: String = line[tag_start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Process-wide large-pattern store, populated once at startup via
/// [`init_pattern_store`]. Lookups before initialization (or when loading
/// failed) transparently return a probability of 0.0.
static PATTERN_STORE: OnceLock<PatternStore> = OnceLock::new();

/// Install the process-wide pattern store. Has no effect if already set
/// (patterns are loaded once, at startup).
pub fn init_pattern_store(store: PatternStore) {
    let _ = PATTERN_STORE.set(store);
}

/// Load the large-pattern dictionaries from disk.
///
/// Returns an error (with file-path context) if either file cannot be read;
/// callers are expected to log a warning and fall back to
/// [`PatternStore::empty`] rather than aborting startup, since large-pattern
/// priors are an optimization, not a correctness requirement.
pub fn load_large_patterns_from(
    prob_path: &Path,
    spat_path: &Path,
) -> anyhow::Result<PatternStore> {
    let prob_contents = std::fs::read_to_string(prob_path)
        .with_context(|| format!("reading pattern probabilities from {}", prob_path.display()))?;
    let spat_contents = std::fs::read_to_string(spat_path)
        .with_context(|| format!("reading spatial pattern dictionary from {}", spat_path.display()))?;

    let mut store = PatternStore::empty();
    store.load_spat(&spat_contents);
    store.load_prob(&prob_contents);
    log::info!(
        "loaded {} spatial patterns, {} probabilities",
        store.spat_dict.len(),
        store.prob_dict.len()
    );
    Ok(store)
}

/// Translate a board point to 0-indexed `(row, col)` Go coordinates.
#[inline]
fn to_rowcol(pt: Point) -> (i32, i32) {
    let stride = crate::constants::N + 1;
    (pt / stride, pt % stride)
}

/// Translate 0-indexed `(row, col)` Go coordinates back to a board point, or
/// `None` if outside the board.
#[inline]
fn from_rowcol(row: i32, col: i32) -> Option<Point> {
    let n = crate::constants::N as i32;
    if row < 1 || row > n || col < 1 || col > n {
        None
    } else {
        Some((row as usize) * (crate::constants::N + 1) + (col as usize))
    }
}

/// Probability that a move at `pt` is worth playing, from the large-pattern
/// database, or 0.0 if no pattern matches (or none is loaded).
///
/// Grows a neighborhood around `pt` one gridcular shell at a time, in all 8
/// board symmetries, hashing the accumulated neighborhood after each shell
/// and looking it up in the spatial dictionary. A larger, more specific match
/// overrides a smaller one. Stops enlarging once an entire shell fails to
/// match in any of the 8 symmetries - per-shell matches are not required to
/// be monotonic before that point (a coarser pattern can be unlisted while a
/// larger, more specific one is), so the loop can't simply stop at the first
/// miss.
pub fn large_pattern_probability(pos: &Position, pt: Point) -> f64 {
    let Some(store) = PATTERN_STORE.get() else {
        return 0.0;
    };
    if store.spat_dict.is_empty() {
        return 0.0;
    }

    let (row, col) = to_rowcol(pt);
    let mut neighborhoods: [Vec<u8>; 8] = Default::default();
    let mut best_prob = 0.0f64;

    for shell in GRIDCULAR_SHELLS {
        let mut any_match = false;

        for (sym_idx, &(swap, sign_y, sign_x)) in SYMMETRIES.iter().enumerate() {
            for &(dy, dx) in *shell {
                let (oy, ox) = if swap { (dx, dy) } else { (dy, dx) };
                let (ny, nx) = (row + oy * sign_y, col + ox * sign_x);
                let c = from_rowcol(ny, nx).map_or(b' ', |p| pos.color[p]);
                neighborhoods[sym_idx].push(c);
            }

            if let Some(&spatial_id) = store.spat_dict.get(&fnv1a_hash(&neighborhoods[sym_idx])) {
                if let Some(&prob) = store.prob_dict.get(&spatial_id) {
                    any_match = true;
                    best_prob = best_prob.max(prob);
                }
            }
        }

        if !any_match {
            break;
        }
    }

    best_prob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_pat3set() {
        let pat3set = make_pat3set();
        // The set should have some bits set
        let count: usize = pat3set.iter().map(|b| b.count_ones() as usize).sum();
        assert!(count > 0, "Pattern set should have some patterns");
        // Based on the C code, there should be many patterns
        assert!(count > 1000, "Expected many pattern matches, got {}", count);
    }

    #[test]
    fn test_compute_code_empty() {
        // All empty pattern
        let src = *b".........";
        let code = compute_code(&src);
        // All EMPTY (2) = bits 4,5,6,7 set for each position
        // env4: 0xF0, env4d: 0xF0 -> 0xF0F0
        assert_eq!(code, 0xF0F0);
    }

    #[test]
    fn test_pat3_match_hane() {
        use crate::position::{Position, play_move, parse_coord};

        // Set up a position where pattern #1 (hane) should match
        // Pattern: XOX / ... / ???
        // This is an enclosing hane pattern
        let mut pos = Position::new();

        // Play moves to create the pattern around D5
        // Black at C5, E5; White at D6
        play_move(&mut pos, parse_coord("C5")).unwrap(); // Black
        play_move(&mut pos, parse_coord("D6")).unwrap(); // White
        play_move(&mut pos, parse_coord("E5")).unwrap(); // Black

        // Now at D5, we should have:
        // North: White (D6)
        // East: Black (E5)
        // West: Black (C5)
        // South: Empty
        // This matches "XOX / ... / ???" rotated

        let pt = parse_coord("D5");
        let matches = pat3_match(&pos, pt);

        // Debug: print the env values
        eprintln!("env4[D5] = 0x{:02X}", pos.env4[pt]);
        eprintln!("env4d[D5] = 0x{:02X}", pos.env4d[pt]);

        assert!(matches, "Hane pattern should match at D5");
    }

    #[test]
    fn test_fnv1a_hash_is_deterministic() {
        let a = fnv1a_hash(b"....X....");
        let b = fnv1a_hash(b"....X....");
        let c = fnv1a_hash(b"....O....");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_large_pattern_probability_empty_store_is_zero() {
        let pos = Position::new();
        // No store has been installed in this test process: lookups are 0.0.
        let prob = large_pattern_probability(&pos, crate::position::parse_coord("D4"));
        assert_eq!(prob, 0.0);
    }

    #[test]
    fn test_pattern_store_load_spat_and_prob() {
        let neighborhood = "..X.X..OO.O..........#X......";
        let mut store = PatternStore::empty();
        store.load_spat(&format!("71 6 {neighborhood} 33408f5e\n"));
        store.load_prob("0.004 14 3842 (capture:17 border:0 s:71)\n");

        let translated: String = neighborhood
            .chars()
            .map(|c| match c {
                '#' => ' ',
                'O' => 'x',
                other => other,
            })
            .collect();
        let hash = fnv1a_hash(translated.as_bytes());
        assert_eq!(store.spat_dict.get(&hash), Some(&71));
        assert_eq!(store.prob_dict.get(&71), Some(&0.004));
    }

    #[test]
    fn test_extract_spatial_id() {
        assert_eq!(
            extract_spatial_id("0.004 14 3842 (capture:17 border:0 s:784)"),
            Some(784)
        );
        assert_eq!(extract_spatial_id("0.004 14 3842 no id here"), None);
    }
}
