//! Rush Hour stream replay
//!
//! Feeds a recorded stream of board configurations through a fresh tracker
//! and reports what the session would have explored.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rushhour_core::{dot, RevisitPolicy, SlideRules, Tracker, TrackerOptions, DEFAULT_BOARD_SIZE};
use rushhour_tools::{replay, stream, LoadError};

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay a recorded board stream through a tracker")]
struct Args {
    /// File with one `{"cars": {...}}` message per line
    stream: PathBuf,

    /// JSON file with the starting configuration (defaults to the red/blue board)
    #[arg(long)]
    initial: Option<PathBuf>,

    /// Side length of the square board
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
    board_size: u16,

    /// Also record edges for moves back into already-visited states
    #[arg(long)]
    revisit_edges: bool,

    /// Write the explored graph in Graphviz format
    #[arg(long)]
    dot: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), LoadError> {
    let initial = stream::initial_configuration(args.initial.as_deref(), args.board_size)?;
    let entries = stream::read_stream(&args.stream)?;

    let options = TrackerOptions {
        board_size: args.board_size,
        revisit: if args.revisit_edges {
            RevisitPolicy::Record
        } else {
            RevisitPolicy::Skip
        },
    };
    let mut tracker = Tracker::with_options(initial, SlideRules::new(args.board_size), options);

    println!("Rush Hour Replay");
    println!("================");
    println!("Stream: {}", args.stream.display());
    println!("Board: {0}x{0}", args.board_size);
    println!("Revisit edges: {}", args.revisit_edges);
    println!();

    info!(lines = entries.len(), "replaying stream");
    let stats = replay(&mut tracker, entries);

    let state = tracker.state();
    stats.print_summary(state.visited().len(), state.transitions().len());
    println!();
    println!("Final board:");
    print!("{}", tracker.view().grid());
    if let Some(message) = state.message() {
        println!();
        println!("Pending: {}", message);
    }

    if let Some(path) = &args.dot {
        stream::write_file(path, &dot::to_dot(&tracker.view()))?;
        println!("\nWrote {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
