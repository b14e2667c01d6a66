//! Tactical reading and playout heuristics.
//!
//! Builds on the board primitives in [`crate::position`]: atari/ladder reading
//! (`fix_atari`), capture-move generation for playouts and priors, common-fate-graph
//! distance, and the biased random playout (`mcplayout`) used to evaluate MCTS leaves.

use crate::constants::{
    BOARD_IMAX, BOARD_IMIN, BOARDSIZE, EMPTY, MAX_GAME_LEN, OUT, PROB_HEURISTIC_CAPTURE,
    PROB_HEURISTIC_PAT3, PROB_RSAREJECT, PROB_SSAREJECT, STONE_BLACK, STONE_WHITE,
};
use crate::patterns::pat3_match;
use crate::position::{
    all_neighbors, compute_block, last_moves_neighbors, line_height, moves, pass_move, play_move,
    score, str_coord, Point, Position,
};

/// Find neighbor blocks in atari (opponent blocks with only 1 liberty).
///
/// Given a list of stones, finds all opponent blocks adjacent to them that
/// have exactly one liberty. Returns pairs of (representative stone, liberty).
fn find_neighbor_blocks_in_atari(pos: &Position, stones: &[Point]) -> Vec<(Point, Point)> {
    let color = pos.color[stones[0]];
    let opponent = if color == STONE_BLACK {
        STONE_WHITE
    } else {
        STONE_BLACK
    };

    let mut result = Vec::new();
    let mut block_visited = [false; BOARDSIZE];

    for &stone in stones {
        for n in all_neighbors(stone).into_iter().take(4) {
            if pos.color[n] == opponent && !block_visited[n] {
                let (block_stones, libs) = compute_block(pos, n, 2);
                for &s in &block_stones {
                    block_visited[s] = true;
                }
                if libs.len() == 1 {
                    result.push((block_stones[0], libs[0]));
                }
            }
        }
    }

    result
}

/// Check if a group with 2 liberties can be captured in a working ladder.
///
/// For each liberty of the group, tries playing there as an attack move, then
/// recursively calls `fix_atari_ext` to see if the group can escape. If no escape
/// is possible, the ladder works. Returns the attacking move, or 0 if none works.
fn read_ladder_attack(pos: &Position, pt: Point, libs: &[Point]) -> Point {
    for &lib in libs {
        let mut test_pos = pos.clone();
        if play_move(&mut test_pos, lib).is_err() {
            continue;
        }

        let escape_moves = fix_atari_ext(&test_pos, pt, false, false, false);
        let (_, new_libs) = compute_block(&test_pos, pt, 2);
        if new_libs.len() <= 1 && escape_moves.is_empty() {
            return lib;
        }
    }
    0
}

/// Check if a group is in atari and find moves that can save it or capture neighbors.
///
/// `singlept_ok`: if true, don't bother trying to save single-stone groups.
/// Uses ladder detection with edge-only optimization (see `fix_atari_ext`).
pub fn fix_atari(pos: &Position, pt: Point, singlept_ok: bool) -> Vec<Point> {
    fix_atari_ext(pos, pt, singlept_ok, true, true)
}

/// Extended `fix_atari` with ladder detection options.
///
/// - `twolib_test`: also check groups with 2 liberties for ladder captures.
/// - `twolib_edgeonly`: when `twolib_test`, only run the (expensive) ladder read
///   when both liberties are on the edge.
pub fn fix_atari_ext(
    pos: &Position,
    pt: Point,
    singlept_ok: bool,
    twolib_test: bool,
    twolib_edgeonly: bool,
) -> Vec<Point> {
    let (moves, _) = fix_atari_with_sizes(pos, pt, singlept_ok, twolib_test, twolib_edgeonly);
    moves
}

/// `fix_atari_ext` that also returns, for each suggested move, the size of the
/// group that move saves or captures — used to prioritize single- vs multi-stone
/// captures in MCTS priors.
pub fn fix_atari_with_sizes(
    pos: &Position,
    pt: Point,
    singlept_ok: bool,
    twolib_test: bool,
    twolib_edgeonly: bool,
) -> (Vec<Point>, Vec<usize>) {
    let mut moves = Vec::new();
    let mut sizes = Vec::new();

    let (stones, libs) = compute_block(pos, pt, 3);
    let group_size = stones.len();

    if singlept_ok && group_size == 1 {
        return (moves, sizes);
    }

    if libs.len() >= 2 {
        if twolib_test && libs.len() == 2 && group_size > 1 {
            if twolib_edgeonly && (line_height(libs[0]) > 0 || line_height(libs[1]) > 0) {
                return (moves, sizes);
            }
            let ladder_move = read_ladder_attack(pos, pt, &libs);
            if ladder_move != 0 {
                moves.push(ladder_move);
                sizes.push(group_size);
            }
        }
        return (moves, sizes);
    }

    // Block is in atari (exactly 1 liberty).
    let lib = libs[0];

    if pos.color[pt] == STONE_WHITE {
        moves.push(lib);
        sizes.push(group_size);
        return (moves, sizes);
    }

    // Our own group in atari: try counter-captures first.
    let atari_neighbors = find_neighbor_blocks_in_atari(pos, &stones);
    for (_, capture_lib) in atari_neighbors {
        if !moves.contains(&capture_lib) {
            moves.push(capture_lib);
            sizes.push(group_size);
        }
    }

    // Then try escaping onto the last liberty.
    let mut test_pos = pos.clone();
    if play_move(&mut test_pos, lib).is_ok() {
        let (new_stones, new_libs) = compute_block(&test_pos, lib, 3);
        if new_libs.len() >= 2
            && (!moves.is_empty()
                || new_libs.len() >= 3
                || read_ladder_attack(&test_pos, lib, &new_libs) == 0)
            && !moves.contains(&lib)
        {
            moves.push(lib);
            sizes.push(new_stones.len());
        }
    }

    (moves, sizes)
}

/// Capture moves near the last two moves — the "cheap" heuristic set used in playouts.
pub fn gen_capture_moves(pos: &Position) -> Vec<(Point, usize)> {
    let mut points_to_check = Vec::with_capacity(20);

    if pos.last != 0 {
        points_to_check.push(pos.last);
        for n in all_neighbors(pos.last) {
            if pos.color[n] != OUT {
                points_to_check.push(n);
            }
        }
    }
    if pos.last2 != 0 {
        for n in all_neighbors(pos.last2) {
            if pos.color[n] != OUT && !points_to_check.contains(&n) {
                points_to_check.push(n);
            }
        }
    }

    gen_capture_moves_in_set(pos, Some(&points_to_check), true)
}

/// Capture moves across the whole board — the "expensive" heuristic set used for
/// MCTS priors during `expand`.
pub fn gen_capture_moves_all(pos: &Position, twolib_edgeonly: bool) -> Vec<(Point, usize)> {
    gen_capture_moves_in_set(pos, None, twolib_edgeonly)
}

fn gen_capture_moves_in_set(
    pos: &Position,
    points: Option<&[Point]>,
    twolib_edgeonly: bool,
) -> Vec<(Point, usize)> {
    let mut out = Vec::new();
    let mut checked = [false; BOARDSIZE];

    let points_to_check: Vec<Point> = if let Some(pts) = points {
        pts.to_vec()
    } else {
        (BOARD_IMIN..BOARD_IMAX)
            .filter(|&pt| pos.color[pt] != OUT)
            .collect()
    };

    for pt in points_to_check {
        if checked[pt] {
            continue;
        }
        if pos.color[pt] == STONE_BLACK || pos.color[pt] == STONE_WHITE {
            checked[pt] = true;
            let (atari_moves, atari_sizes) =
                fix_atari_with_sizes(pos, pt, false, true, twolib_edgeonly);
            for (i, m) in atari_moves.iter().enumerate() {
                if !out.iter().any(|(mv, _)| mv == m) {
                    out.push((*m, atari_sizes[i]));
                }
            }
        }
    }

    out
}

/// Common-fate-graph distance from `start`: like Manhattan distance, but stepping
/// to a same-colored stone costs 0 (it's the same "fate"), any other step costs 1.
pub fn cfg_distances(pos: &Position, start: Point) -> [i8; BOARDSIZE] {
    let mut cfg_map = [-1i8; BOARDSIZE];
    let mut queue = Vec::with_capacity(BOARDSIZE);

    cfg_map[start] = 0;
    queue.push(start);
    let mut head = 0;

    while head < queue.len() {
        let pt = queue[head];
        head += 1;

        for n in all_neighbors(pt) {
            let c = pos.color[n];
            if c == OUT {
                continue;
            }

            let old_dist = cfg_map[n];
            let new_dist = if c != EMPTY && c == pos.color[pt] {
                cfg_map[pt]
            } else {
                cfg_map[pt] + 1
            };

            if old_dist < 0 || new_dist < old_dist {
                cfg_map[n] = new_dist;
                queue.push(n);
            }
        }
    }

    cfg_map
}

/// True iff no `X`/`x` stone appears within (a gridcular approximation of) Manhattan
/// distance `dist` of `pt`. Used to penalize/reward moves in otherwise-empty areas.
pub fn empty_area(pos: &Position, pt: Point, dist: usize) -> bool {
    if dist == 0 {
        return true;
    }
    for n in all_neighbors(pt) {
        let c = pos.color[n];
        if c == STONE_BLACK || c == STONE_WHITE {
            return false;
        }
        if c == EMPTY && dist > 1 && !empty_area(pos, n, dist - 1) {
            return false;
        }
    }
    true
}

/// A playout move candidate, tagged with the heuristic that produced it. Self-atari
/// rejection probability depends on this tag (random moves are rejected less eagerly,
/// since they're the last resort and rejecting them too hard starves the playout).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    Capture,
    Pat3,
    Random,
}

/// Build an ordered, already-shuffled stream of candidate playout moves: captures
/// first (with probability `PROB_HEURISTIC_CAPTURE`), then 3x3 pattern matches (with
/// probability `PROB_HEURISTIC_PAT3`), then every remaining legal move in random order.
pub fn gen_playout_moves(pos: &Position, heuristic_set: &[Point]) -> Vec<(Point, MoveKind)> {
    let mut out = Vec::new();
    let mut suggested = [false; BOARDSIZE];

    if fastrand::f64() < PROB_HEURISTIC_CAPTURE {
        for &pt in heuristic_set {
            if pos.color[pt] == STONE_BLACK || pos.color[pt] == STONE_WHITE {
                let mut solutions = fix_atari(pos, pt, false);
                fastrand::shuffle(&mut solutions);
                for mv in solutions {
                    if !suggested[mv] {
                        suggested[mv] = true;
                        out.push((mv, MoveKind::Capture));
                    }
                }
            }
        }
    }

    if fastrand::f64() < PROB_HEURISTIC_PAT3 {
        for &pt in heuristic_set {
            if pos.color[pt] == EMPTY && !suggested[pt] && pat3_match(pos, pt) {
                suggested[pt] = true;
                out.push((pt, MoveKind::Pat3));
            }
        }
    }

    let start = BOARD_IMIN + fastrand::usize(..(BOARD_IMAX - BOARD_IMIN));
    for pt in moves(pos, start) {
        if !suggested[pt] {
            suggested[pt] = true;
            out.push((pt, MoveKind::Random));
        }
    }

    out
}

/// Check legality and reject self-atari with a kind-dependent probability.
/// Random-move candidates are rejected less often (`PROB_RSAREJECT`) than
/// capture/pattern candidates (`PROB_SSAREJECT`), so tactical nakade still happens.
fn try_move(pos: &Position, pt: Point, kind: MoveKind) -> Option<Position> {
    let mut candidate = pos.clone();
    if play_move(&mut candidate, pt).is_err() {
        return None;
    }

    let reject_prob = if kind == MoveKind::Random {
        PROB_RSAREJECT
    } else {
        PROB_SSAREJECT
    };
    if fastrand::f64() < reject_prob && !fix_atari(&candidate, pt, true).is_empty() {
        return None;
    }

    Some(candidate)
}

/// Run one Monte Carlo playout from `pos` to completion (two consecutive passes, or
/// `MAX_GAME_LEN` plies), mutating `pos` in place.
///
/// If `amaf_map` is given, records which side first played each point (oriented to
/// the ply parity at the time of the move) for RAVE/AMAF statistics. If `owner_map`
/// is given, accumulates the final area-scoring ownership of every point.
///
/// Returns the game's score from the perspective of the player to move when the
/// playout started.
pub fn mcplayout(
    pos: &mut Position,
    mut amaf_map: Option<&mut [i8]>,
    owner_map: Option<&mut [i32]>,
) -> f64 {
    let start_n = pos.n;
    let mut passes = 0;

    'playout: while passes < 2 && pos.n < MAX_GAME_LEN {
        let heuristic_set = last_moves_neighbors(pos);
        for (pt, kind) in gen_playout_moves(pos, &heuristic_set) {
            if let Some(next) = try_move(pos, pt, kind) {
                log::trace!("playout ply {}: {} ({:?})", pos.n, str_coord(pt), kind);
                if let Some(ref mut amaf) = amaf_map {
                    if amaf[pt] == 0 {
                        amaf[pt] = if pos.n % 2 == 0 { 1 } else { -1 };
                    }
                }
                *pos = next;
                passes = 0;
                continue 'playout;
            }
        }
        log::trace!("playout ply {}: pass", pos.n);
        pass_move(pos);
        passes += 1;
    }

    let s = score(pos, owner_map);
    let result = if start_n % 2 != pos.n % 2 { -s } else { s };
    log::debug!("playout finished after {} plies, score {:.1}", pos.n, result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::parse_coord;

    #[test]
    fn test_mcplayout_terminates() {
        let mut pos = Position::new();
        let score = mcplayout(&mut pos, None, None);
        assert!(score.is_finite());
    }

    #[test]
    fn test_mcplayout_fills_board_or_passes() {
        let mut pos = Position::new();
        let mut amaf = vec![0i8; BOARDSIZE];
        let mut owner = vec![0i32; BOARDSIZE];
        let _ = mcplayout(&mut pos, Some(&mut amaf), Some(&mut owner));
        assert!(pos.n > 0);
    }

    #[test]
    fn test_fix_atari_no_atari_on_open_stone() {
        let mut pos = Position::new();
        play_move(&mut pos, parse_coord("D4")).unwrap();
        // D4 is now the opponent's lone stone with 4 liberties: nothing to report.
        let solutions = fix_atari(&pos, parse_coord("D4"), false);
        assert!(solutions.is_empty());
    }

    #[test]
    fn test_cfg_distances_zero_at_start() {
        let pos = Position::new();
        let start = parse_coord("D4");
        let cfg = cfg_distances(&pos, start);
        assert_eq!(cfg[start], 0);
    }

    #[test]
    fn test_empty_area_true_on_fresh_board() {
        let pos = Position::new();
        assert!(empty_area(&pos, parse_coord("D4"), 3));
    }

    #[test]
    fn test_gen_playout_moves_nonempty_on_fresh_board() {
        let pos = Position::new();
        let heuristic_set = last_moves_neighbors(&pos);
        let candidates = gen_playout_moves(&pos, &heuristic_set);
        assert!(!candidates.is_empty());
    }
}
