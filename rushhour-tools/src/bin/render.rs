//! Render board configurations to SVG.
//!
//! Usage:
//!   # Single configuration
//!   cargo run --release --bin render -- --config board.json -o board.svg
//!
//!   # One frame per accepted move in a recorded stream
//!   cargo run --release --bin render -- --stream session.jsonl --output-dir ./frames/

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rushhour_core::{
    starting_configuration, Cell, Configuration, Observed, PieceId, SlideRules, Tracker,
    TrackerOptions, DEFAULT_BOARD_SIZE,
};
use rushhour_tools::{stream, LoadError};

// ============================================================================
// Constants
// ============================================================================

const CELL_SIZE: f32 = 64.0;
const CELL_GAP: f32 = 6.0;
const BOARD_PADDING: f32 = 12.0;
const CELL_RADIUS: f32 = 6.0;
const BOARD_RADIUS: f32 = 12.0;
const PIECE_INSET: f32 = 5.0;
const PIECE_RADIUS: f32 = 10.0;

// Image padding (space around the entire content)
const IMAGE_PADDING: f32 = 16.0;

// Colors
const BG_COLOR: &str = "#1a1a1a";
const BOARD_BG: &str = "#2a2a2a";
const CELL_BG: &str = "#3a3a3a";
const RED_CAR: &str = "#e74c3c";
const HIGHLIGHT_LAST_MOVE: &str = "#f39c12";

const PALETTE: [&str; 8] = [
    "#3498db", "#2ecc71", "#9b59b6", "#f1c40f", "#1abc9c", "#e67e22", "#95a5a6", "#16a085",
];

// ============================================================================
// SVG generation
// ============================================================================

/// Options for rendering
struct RenderOptions {
    board_size: u16,
    highlight: Option<PieceId>, // Piece moved into this frame
    scale: f32,                 // Scale factor (1.0 = 64px cells)
}

fn piece_color(id: &PieceId) -> &'static str {
    match id {
        PieceId::Tag(tag) if tag == "red" => RED_CAR,
        PieceId::Number(n) => PALETTE[*n as usize % PALETTE.len()],
        PieceId::Tag(tag) => {
            let sum: usize = tag.bytes().map(usize::from).sum();
            PALETTE[sum % PALETTE.len()]
        }
    }
}

/// Top-left corner of a cell in image coordinates
fn cell_origin(row: i64, col: i64) -> (f32, f32) {
    let x = IMAGE_PADDING + BOARD_PADDING + col as f32 * (CELL_SIZE + CELL_GAP);
    let y = IMAGE_PADDING + BOARD_PADDING + row as f32 * (CELL_SIZE + CELL_GAP);
    (x, y)
}

/// Generate SVG for a configuration
fn render_board_svg(config: &Configuration, opts: &RenderOptions) -> String {
    let scale = if opts.scale > 0.0 { opts.scale } else { 1.0 };
    let n = opts.board_size as f32;

    let board_inner = n * CELL_SIZE + (n - 1.0).max(0.0) * CELL_GAP;
    let board_outer = board_inner + 2.0 * BOARD_PADDING;
    let size = board_outer + 2.0 * IMAGE_PADDING;
    let scaled = size * scale;

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        scaled, scaled, size, size
    ));
    svg.push('\n');

    svg.push_str(&format!(
        r#"  <rect width="{}" height="{}" fill="{}"/>"#,
        size, size, BG_COLOR
    ));
    svg.push('\n');
    svg.push_str(&format!(
        r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}"/>"#,
        IMAGE_PADDING, IMAGE_PADDING, board_outer, board_outer, BOARD_RADIUS, BOARD_BG
    ));
    svg.push('\n');

    for row in 0..opts.board_size {
        for col in 0..opts.board_size {
            let (x, y) = cell_origin(i64::from(row), i64::from(col));
            svg.push_str(&format!(
                r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}"/>"#,
                x, y, CELL_SIZE, CELL_SIZE, CELL_RADIUS, CELL_BG
            ));
            svg.push('\n');
        }
    }

    for (id, cells) in config.pieces() {
        svg.push_str(&render_piece_svg(id, cells, opts));
    }

    svg.push_str("</svg>\n");
    svg
}

/// One piece as a rounded bar spanning its cells. Cells off the board are
/// not drawn.
fn render_piece_svg(id: &PieceId, cells: &[Cell], opts: &RenderOptions) -> String {
    let on_board: Vec<_> = cells
        .iter()
        .filter(|c| c.in_bounds(opts.board_size))
        .collect();
    let (Some(min_row), Some(max_row), Some(min_col), Some(max_col)) = (
        on_board.iter().map(|c| c.row).min(),
        on_board.iter().map(|c| c.row).max(),
        on_board.iter().map(|c| c.col).min(),
        on_board.iter().map(|c| c.col).max(),
    ) else {
        return String::new();
    };

    let (x0, y0) = cell_origin(min_row, min_col);
    let (x1, y1) = cell_origin(max_row, max_col);
    let x = x0 + PIECE_INSET;
    let y = y0 + PIECE_INSET;
    let width = x1 + CELL_SIZE - x0 - 2.0 * PIECE_INSET;
    let height = y1 + CELL_SIZE - y0 - 2.0 * PIECE_INSET;

    let (stroke, stroke_width) = if opts.highlight.as_ref() == Some(id) {
        (HIGHLIGHT_LAST_MOVE, 3.0)
    } else {
        ("rgba(0,0,0,0.2)", 2.0)
    };

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="{}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
        x, y, width, height, PIECE_RADIUS, piece_color(id), stroke, stroke_width
    ));
    svg.push('\n');
    svg.push_str(&format!(
        r#"  <text x="{}" y="{}" font-family="system-ui, sans-serif" font-size="16" font-weight="bold" fill="white" text-anchor="middle" dominant-baseline="central">{}</text>"#,
        x + width / 2.0,
        y + height / 2.0,
        escape(&id.to_string())
    ));
    svg.push('\n');
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The piece whose cells differ between two configurations, if exactly one.
fn moved_piece(before: &Configuration, after: &Configuration) -> Option<PieceId> {
    let mut moved = after
        .pieces()
        .filter(|(id, cells)| before.get(id) != Some(*cells))
        .map(|(id, _)| id.clone());
    let first = moved.next();
    if moved.next().is_some() {
        None
    } else {
        first
    }
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "render", about = "Render Rush Hour configurations to SVG")]
struct Args {
    /// Configuration file to render (defaults to the red/blue board)
    #[arg(long, conflicts_with = "stream")]
    config: Option<PathBuf>,

    /// Stream of `{"cars": {...}}` lines; renders one frame per accepted move
    #[arg(long, requires = "output_dir")]
    stream: Option<PathBuf>,

    /// Output file in single mode
    #[arg(short, long, default_value = "board.svg")]
    output: PathBuf,

    /// Output directory in stream mode
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Side length of the square board
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
    board_size: u16,

    /// Scale factor
    #[arg(long, default_value_t = 1.0)]
    scale: f32,
}

/// Render the starting frame and one frame per accepted move. Returns the
/// number of frames written.
fn render_stream(
    initial: Configuration,
    stream_path: &Path,
    dir: &Path,
    board_size: u16,
    scale: f32,
) -> Result<usize, LoadError> {
    let entries = stream::read_stream(stream_path)?;
    let options = TrackerOptions {
        board_size,
        ..TrackerOptions::default()
    };
    let mut tracker = Tracker::with_options(initial, SlideRules::new(board_size), options);

    let mut opts = RenderOptions {
        board_size,
        highlight: None,
        scale,
    };
    let mut frames = 0;
    let mut write_frame = |config: &Configuration, opts: &RenderOptions| {
        let path = dir.join(format!("frame-{:03}.svg", frames));
        stream::write_file(&path, &render_board_svg(config, opts))?;
        println!("Wrote {}", path.display());
        frames += 1;
        Ok::<(), LoadError>(())
    };

    write_frame(tracker.state().current(), &opts)?;

    for entry in entries {
        let cars = match entry.parsed {
            Ok(cars) => cars,
            Err(e) => {
                warn!(line = entry.line, error = %e, "skipping malformed line");
                continue;
            }
        };
        let before = tracker.state().current().clone();
        match tracker.observe(cars) {
            Observed::Discovered { .. } | Observed::Revisited { .. } => {
                let current = tracker.state().current();
                opts.highlight = moved_piece(&before, current);
                write_frame(current, &opts)?;
            }
            outcome => info!(line = entry.line, ?outcome, "no frame"),
        }
    }

    Ok(frames)
}

fn run(args: Args) -> Result<(), LoadError> {
    let initial = match &args.config {
        Some(path) => stream::load_configuration(path, args.board_size)?,
        None => starting_configuration(),
    };

    if let (Some(stream_path), Some(dir)) = (&args.stream, &args.output_dir) {
        let frames = render_stream(initial, stream_path, dir, args.board_size, args.scale)?;
        println!("\nRendered {} frames", frames);
        return Ok(());
    }

    let opts = RenderOptions {
        board_size: args.board_size,
        highlight: None,
        scale: args.scale,
    };
    stream::write_file(&args.output, &render_board_svg(&initial, &opts))?;
    println!("Wrote {}", args.output.display());
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

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(board_size: u16) -> RenderOptions {
        RenderOptions {
            board_size,
            highlight: None,
            scale: 1.0,
        }
    }

    #[test]
    fn test_render_starting_board() {
        let svg = render_board_svg(&starting_configuration(), &opts(6));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>\n"));
        // background + board + 36 cells + 2 pieces
        assert_eq!(svg.matches("<rect").count(), 40);
        assert!(svg.contains(RED_CAR));
        assert!(svg.contains(">blue</text>"));
        assert!(!svg.contains(HIGHLIGHT_LAST_MOVE));
    }

    #[test]
    fn test_piece_spans_its_cells() {
        let config = Configuration::from_pieces([("1", [[2, 0], [2, 1], [2, 2]])]);
        let svg = render_piece_svg(
            &PieceId::Number(1),
            config.get(&PieceId::Number(1)).unwrap(),
            &opts(6),
        );
        let width = 3.0 * CELL_SIZE + 2.0 * CELL_GAP - 2.0 * PIECE_INSET;
        let height = CELL_SIZE - 2.0 * PIECE_INSET;
        assert!(svg.contains(&format!(r#"width="{}" height="{}""#, width, height)));
        assert!(svg.contains(PALETTE[1]));
    }

    #[test]
    fn test_off_board_piece_is_skipped() {
        let config = Configuration::from_pieces([("ghost", [[9, 9]])]);
        let svg = render_board_svg(&config, &opts(6));
        assert!(!svg.contains("ghost"));
    }

    #[test]
    fn test_moved_piece() {
        let after = Configuration::from_pieces([
            ("red", [[0, 1], [0, 2]]),
            ("blue", [[5, 4], [5, 5]]),
        ]);
        assert_eq!(
            moved_piece(&starting_configuration(), &after),
            Some(PieceId::from("red"))
        );
        assert_eq!(moved_piece(&after, &after), None);
    }

    #[test]
    fn test_render_stream_frames() {
        let dir = tempfile::tempdir().unwrap();
        let stream_path = dir.path().join("session.jsonl");
        std::fs::write(
            &stream_path,
            concat!(
                "{\"cars\": {\"red\": [[0, 1], [0, 2]], \"blue\": [[5, 4], [5, 5]]}}\n",
                "{\"cars\": {\"red\": [[0, 1], [0, 2]], \"blue\": [[0, 1], [0, 2]]}}\n",
                "{\"cars\": {\"red\": [[0, 0], [0, 1]], \"blue\": [[5, 4], [5, 5]]}}\n",
            ),
        )
        .unwrap();
        let frames_dir = dir.path().join("frames");

        let frames =
            render_stream(starting_configuration(), &stream_path, &frames_dir, 6, 1.0).unwrap();

        // start, red right, red back; the illegal line gets no frame
        assert_eq!(frames, 3);
        let last = std::fs::read_to_string(frames_dir.join("frame-002.svg")).unwrap();
        assert!(last.contains(HIGHLIGHT_LAST_MOVE));
        assert!(!frames_dir.join("frame-003.svg").exists());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["render"]).unwrap();
        assert_eq!(args.output, PathBuf::from("board.svg"));
        assert!(Args::try_parse_from(["render", "--stream", "s.jsonl"]).is_err());
    }
}
