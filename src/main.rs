//! Michi-Rust: A minimalistic Go engine.
//!
//! This is a Rust reimplementation of Michi, originally written in Python
//! and later ported to C.
//!
//! ## Usage
//!
//! - `michi-rust` - Interactive console play, human=Black, computer=White
//! - `michi-rust white` - Interactive console play, human=White, computer=Black
//! - `michi-rust gtp` - Start the GTP server for GUI integration
//! - `michi-rust mcdebug` - Run one playout with verbose per-move logging
//! - `michi-rust mcbenchmark [N]` - Run N playouts and report average score/timing
//! - `michi-rust tsbenchmark [N]` - Run one tree_search of N simulations, timed
//! - `michi-rust tsdebug` - Run one tree_search and dump the resulting subtree

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use michi_rust::constants::{N_SIMS, PASS_MOVE, RESIGN_MOVE, RESIGN_THRES};
use michi_rust::gtp::GtpEngine;
use michi_rust::heuristics::mcplayout;
use michi_rust::mcts::{dump_subtree, tree_search, tree_search_with_display, TreeNode};
use michi_rust::patterns::{init_pattern_store, load_large_patterns_from, PatternStore};
use michi_rust::position::{
    format_position_with_owner, parse_coord, pass_move, play_move, print_pos, str_coord, Position,
};

/// Michi-Rust: a minimalistic Go MCTS engine.
#[derive(Parser)]
#[command(name = "michi-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Number of MCTS simulations per move.
    #[arg(long = "sims", short = 'n', global = true)]
    sims: Option<usize>,

    /// Komi (compensation points awarded to White).
    #[arg(long, global = true)]
    komi: Option<f32>,

    /// Path to the large-pattern probability file.
    #[arg(long, default_value = "patterns.prob", global = true)]
    patterns_prob: PathBuf,

    /// Path to the large-pattern spatial dictionary file.
    #[arg(long, default_value = "patterns.spat", global = true)]
    patterns_spat: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console play, human=White, computer=Black.
    White,
    /// Start the GTP (Go Text Protocol) server for use with GUI applications.
    Gtp,
    /// Run one playout from the empty position with verbose per-move logging.
    Mcdebug,
    /// Run N playouts from the empty position and report average score/timing.
    Mcbenchmark { n: Option<usize> },
    /// Run one tree_search of N simulations from the empty position, timed.
    Tsbenchmark { n: Option<usize> },
    /// Run one tree_search of N_SIMS simulations and dump the resulting subtree.
    Tsdebug,
}

fn main() {
    flexi_logger::Logger::try_with_env_or_str("info")
        .expect("invalid RUST_LOG filter")
        .start()
        .expect("failed to start logger");

    let cli = Cli::parse();
    let sims = cli.sims.unwrap_or(N_SIMS);
    let komi = cli.komi.unwrap_or(7.5);

    init_pattern_store(load_patterns(&cli.patterns_prob, &cli.patterns_spat));

    match cli.command {
        Some(Commands::White) => run_console(false, sims, komi),
        Some(Commands::Gtp) => {
            let mut engine = GtpEngine::with_simulations(sims);
            engine.run();
        }
        Some(Commands::Mcdebug) => run_mcdebug(komi),
        Some(Commands::Mcbenchmark { n }) => run_mcbenchmark(n.unwrap_or(20), komi),
        Some(Commands::Tsbenchmark { n }) => run_tsbenchmark(n.unwrap_or(sims), komi),
        Some(Commands::Tsdebug) => run_tsdebug(sims, komi),
        None => run_console(true, sims, komi),
    }
}

/// Load the large-pattern dictionaries, degrading to an empty store (and a
/// logged warning) if either file is missing or unreadable.
fn load_patterns(prob_path: &PathBuf, spat_path: &PathBuf) -> PatternStore {
    match load_large_patterns_from(prob_path, spat_path) {
        Ok(store) => store,
        Err(e) => {
            log::warn!("large pattern files not loaded ({e:#}); continuing without them");
            PatternStore::empty()
        }
    }
}

/// Interactive console play against the engine.
///
/// `human_plays_black` selects which side the human takes; the other side is
/// driven by `tree_search`. Moves are entered as board coordinates (e.g.
/// `D4`) or `pass`; unparseable input or illegal moves are reported and
/// re-prompted, never aborting the process.
fn run_console(human_plays_black: bool, sims: usize, komi: f32) {
    let mut pos = Position::new();
    pos.komi = komi;

    let stdin = std::io::stdin();
    loop {
        print_pos(&pos);

        let black_to_play = pos.is_black_to_play();
        let human_to_play = black_to_play == human_plays_black;

        if human_to_play {
            eprint!("Your move: ");
            let mut line = String::new();
            if stdin.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            let line = line.trim();
            if line.eq_ignore_ascii_case("quit") {
                break;
            }

            if line.eq_ignore_ascii_case("pass") {
                pass_move(&mut pos);
                continue;
            }

            let pt = parse_coord(line);
            if pt == PASS_MOVE {
                eprintln!("cannot parse move: {line}");
                continue;
            }
            match play_move(&mut pos, pt) {
                Ok(()) => {}
                Err(e) => {
                    eprintln!("illegal move: {e}");
                }
            }
        } else {
            let mut root = TreeNode::new(&pos);
            let pt = tree_search(&mut root, sims);
            let winrate = root
                .children
                .iter()
                .max_by_key(|c| c.v)
                .map(|c| c.winrate())
                .unwrap_or(0.0);

            if winrate < RESIGN_THRES && pt != PASS_MOVE {
                println!("computer resigns");
                break;
            } else if pt == PASS_MOVE || pt == RESIGN_MOVE {
                eprintln!("computer passes");
                pass_move(&mut pos);
            } else {
                eprintln!("computer plays {}", str_coord(pt));
                let _ = play_move(&mut pos, pt);
            }
        }
    }
}

/// Run one playout from the empty position, logging every move as it's
/// chosen (see `log::trace!` calls inside `heuristics::mcplayout`), and
/// print the final score.
fn run_mcdebug(komi: f32) {
    let mut pos = Position::new();
    pos.komi = komi;
    let score = mcplayout(&mut pos, None, None);
    println!("score: {score:.1} (after {} plies)", pos.n);
}

/// Run `n` playouts from the empty position and report average score and
/// per-playout timing.
fn run_mcbenchmark(n: usize, komi: f32) {
    let start = Instant::now();
    let mut total_score = 0.0;
    for _ in 0..n {
        let mut pos = Position::new();
        pos.komi = komi;
        total_score += mcplayout(&mut pos, None, None);
    }
    let elapsed = start.elapsed();
    println!(
        "{n} playouts in {:.3}s ({:.3}ms/playout), average score {:.2}",
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1000.0 / n as f64,
        total_score / n as f64
    );
}

/// Run one `tree_search` of `n` simulations from the empty position, timed,
/// reporting simulations/second and simulations/thread/second.
fn run_tsbenchmark(n: usize, komi: f32) {
    let mut pos = Position::new();
    pos.komi = komi;
    let mut root = TreeNode::new(&pos);

    let workers = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4);

    let start = Instant::now();
    let best = tree_search(&mut root, n);
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "{n} sims in {elapsed:.3}s: {:.1} sims/s, {:.1} sims/thread/s, best move {}",
        n as f64 / elapsed,
        n as f64 / elapsed / workers as f64,
        str_coord(best)
    );
}

/// Run one `tree_search` of N_SIMS simulations from the empty position and
/// dump the resulting subtree plus owner map to stderr.
fn run_tsdebug(sims: usize, komi: f32) {
    let mut pos = Position::new();
    pos.komi = komi;
    let mut root = TreeNode::new(&pos);
    let mut owner_map = vec![0i32; michi_rust::constants::BOARDSIZE];

    let best = tree_search_with_display(&mut root, sims, &mut owner_map);

    dump_subtree(&root, (sims / 50) as u32, "", true);
    eprint!("{}", format_position_with_owner(&pos, Some(&owner_map), sims));
    println!("best move: {}", str_coord(best));
}
