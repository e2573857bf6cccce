//! Rush Hour board encoding and explored state-space tracking.
//!
//! A [`Configuration`] assigns every piece on the board an ordered list of
//! occupied cells. The [`Tracker`] consumes a stream of observed
//! configurations and builds the graph of visited states keyed by their
//! [`Fingerprint`].
//!
//! # Fingerprint (32-bit)
//!
//! ```text
//! h = 0
//! for each piece, in identifier order:
//!     h = h * 9973 + byte        for every byte of the identifier string
//!     h = h * 9973 + 0x100       identifier terminator
//!     h = h * 9973 + (row + 1)   for every cell, in stored order
//!     h = h * 9973 + (col + 1)
//!     h = h * 9973 + 0x101       piece terminator
//!
//! All arithmetic wraps at 2^32. The empty configuration folds nothing
//! and therefore fingerprints to 0.
//! ```
//!
//! # Identifier order
//!
//! ```text
//! Number(0) < Number(1) < ... < Number(u32::MAX) < Tag("") < Tag("a") < ...
//! ```
//!
//! Numeric identifiers arrive on the wire as canonical decimal strings
//! (`"7"`); every other string is a symbolic tag (`"red"`, `"07"`).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod dot;
pub mod message;
pub mod rules;
pub mod tracker;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use message::{parse_configuration, InboundMessage, OutboundMessage};
pub use rules::{LegalityGate, SlideRules};
pub use tracker::{
    Observed, OrderedSet, Presenter, RevisitPolicy, SessionState, SessionView, Snapshot,
    Tracker, TrackerOptions, Transition, ILLEGAL_MOVE_NOTICE,
};

/// Side length of the reference Rush Hour board.
pub const DEFAULT_BOARD_SIZE: u16 = 6;

/// Canonical 32-bit identifier of a configuration.
pub type Fingerprint = u32;

const FINGERPRINT_BASE: u32 = 9973;
const ID_TERMINATOR: u32 = 0x100;
const PIECE_TERMINATOR: u32 = 0x101;

/// Piece identifier.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PieceId {
    /// Numeric identifier, written as canonical decimal.
    Number(u32),
    /// Any other identifier.
    Tag(String),
}

impl From<String> for PieceId {
    fn from(s: String) -> Self {
        match s.parse::<u32>() {
            Ok(n) if n.to_string() == s => PieceId::Number(n),
            _ => PieceId::Tag(s),
        }
    }
}

impl From<&str> for PieceId {
    fn from(s: &str) -> Self {
        PieceId::from(s.to_string())
    }
}

impl From<u32> for PieceId {
    fn from(n: u32) -> Self {
        PieceId::Number(n)
    }
}

impl From<PieceId> for String {
    fn from(id: PieceId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceId::Number(n) => write!(f, "{}", n),
            PieceId::Tag(tag) => f.write_str(tag),
        }
    }
}

/// A board cell, `[row, col]` on the wire.
///
/// Coordinates are signed so that any integer pair a feed sends parses;
/// cells off the board are caught by [`Configuration::validate`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i64; 2]", into = "[i64; 2]")]
pub struct Cell {
    pub row: i64,
    pub col: i64,
}

impl Cell {
    #[inline]
    pub const fn new(row: i64, col: i64) -> Cell {
        Cell { row, col }
    }

    /// Check if the cell lies on a `size × size` board.
    #[inline]
    pub fn in_bounds(self, size: u16) -> bool {
        let size = i64::from(size);
        (0..size).contains(&self.row) && (0..size).contains(&self.col)
    }

    /// Shift the cell by a signed offset. `None` on overflow.
    pub fn offset(self, dr: i64, dc: i64) -> Option<Cell> {
        Some(Cell {
            row: self.row.checked_add(dr)?,
            col: self.col.checked_add(dc)?,
        })
    }
}

impl From<[i64; 2]> for Cell {
    fn from([row, col]: [i64; 2]) -> Self {
        Cell { row, col }
    }
}

impl From<Cell> for [i64; 2] {
    fn from(cell: Cell) -> Self {
        [cell.row, cell.col]
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Reasons a configuration does not describe a physical board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("piece {piece} occupies {cell}, outside the {size}x{size} board")]
    OutOfBounds { piece: PieceId, cell: Cell, size: u16 },
    #[error("pieces {first} and {second} both occupy {cell}")]
    Overlap {
        cell: Cell,
        first: PieceId,
        second: PieceId,
    },
    #[error("piece {piece} occupies no cells")]
    EmptyPiece { piece: PieceId },
    #[error("piece {piece} lists {cell} more than once")]
    RepeatedCell { piece: PieceId, cell: Cell },
}

/// Assignment of every piece to its occupied cells.
///
/// Pieces are kept sorted by identifier; the cell order of each piece is
/// preserved exactly as given.
#[derive(Clone, Default, Debug, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    pieces: BTreeMap<PieceId, Vec<Cell>>,
}

impl Configuration {
    /// Create an empty configuration.
    pub fn new() -> Configuration {
        Configuration::default()
    }

    /// Build a configuration from `(id, cells)` pairs. Later duplicates of
    /// an identifier replace earlier ones.
    pub fn from_pieces<I, K, C>(pieces: I) -> Configuration
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<PieceId>,
        C: IntoIterator<Item = [i64; 2]>,
    {
        let pieces = pieces
            .into_iter()
            .map(|(id, cells)| (id.into(), cells.into_iter().map(Cell::from).collect()))
            .collect();
        Configuration { pieces }
    }

    /// Insert or replace a piece, returning its previous cells.
    pub fn insert(&mut self, id: impl Into<PieceId>, cells: Vec<Cell>) -> Option<Vec<Cell>> {
        self.pieces.insert(id.into(), cells)
    }

    /// Cells of a piece.
    pub fn get(&self, id: &PieceId) -> Option<&[Cell]> {
        self.pieces.get(id).map(Vec::as_slice)
    }

    /// Iterate over pieces in identifier order.
    pub fn pieces(&self) -> impl Iterator<Item = (&PieceId, &[Cell])> + '_ {
        self.pieces.iter().map(|(id, cells)| (id, cells.as_slice()))
    }

    /// Iterate over identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = &PieceId> + '_ {
        self.pieces.keys()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Map each occupied cell to its owner. On overlap the first owner in
    /// identifier order wins.
    pub fn occupancy(&self) -> HashMap<Cell, &PieceId> {
        let mut occupied = HashMap::new();
        for (id, cells) in &self.pieces {
            for &cell in cells {
                occupied.entry(cell).or_insert(id);
            }
        }
        occupied
    }

    /// Check the configuration against a `size × size` board.
    pub fn validate(&self, size: u16) -> Result<(), ConfigurationError> {
        let mut owners: HashMap<Cell, &PieceId> = HashMap::new();
        for (id, cells) in &self.pieces {
            if cells.is_empty() {
                return Err(ConfigurationError::EmptyPiece { piece: id.clone() });
            }
            for (i, &cell) in cells.iter().enumerate() {
                if !cell.in_bounds(size) {
                    return Err(ConfigurationError::OutOfBounds {
                        piece: id.clone(),
                        cell,
                        size,
                    });
                }
                if cells[..i].contains(&cell) {
                    return Err(ConfigurationError::RepeatedCell {
                        piece: id.clone(),
                        cell,
                    });
                }
                if let Some(first) = owners.insert(cell, id) {
                    return Err(ConfigurationError::Overlap {
                        cell,
                        first: first.clone(),
                        second: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Canonical fingerprint. See the module docs for the scheme.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(self)
    }

    /// Project onto a `size × size` grid.
    pub fn grid(&self, size: u16) -> Grid {
        to_grid(self, size)
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        same_configuration(self, other)
    }
}

/// The reference starting board: a red and a blue car in opposite corners.
pub fn starting_configuration() -> Configuration {
    Configuration::from_pieces([
        ("red", [[0, 0], [0, 1]]),
        ("blue", [[5, 4], [5, 5]]),
    ])
}

/// Structural equality: same identifier set and, per identifier, the same
/// cells in the same order.
pub fn same_configuration(a: &Configuration, b: &Configuration) -> bool {
    a.pieces.len() == b.pieces.len()
        && a.pieces.iter().all(|(id, cells)| {
            b.pieces
                .get(id)
                .is_some_and(|other| other.as_slice() == cells.as_slice())
        })
}

#[inline]
fn fold(h: u32, value: u32) -> u32 {
    h.wrapping_mul(FINGERPRINT_BASE).wrapping_add(value)
}

/// Derive the fingerprint of a configuration.
pub fn fingerprint(config: &Configuration) -> Fingerprint {
    let mut h = 0u32;
    for (id, cells) in config.pieces() {
        for byte in id.to_string().bytes() {
            h = fold(h, u32::from(byte));
        }
        h = fold(h, ID_TERMINATOR);
        for cell in cells {
            h = fold(h, cell.row.wrapping_add(1) as u32);
            h = fold(h, cell.col.wrapping_add(1) as u32);
        }
        h = fold(h, PIECE_TERMINATOR);
    }
    h
}

/// Square grid of cell owners; `None` marks an empty cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: u16,
    cells: Vec<Vec<Option<PieceId>>>,
}

impl Grid {
    /// An all-empty grid.
    pub fn empty(size: u16) -> Grid {
        let side = usize::from(size);
        Grid {
            size,
            cells: vec![vec![None; side]; side],
        }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    /// Owner of a cell, if any.
    pub fn get(&self, cell: Cell) -> Option<&PieceId> {
        let (row, col) = (usize::try_from(cell.row).ok()?, usize::try_from(cell.col).ok()?);
        self.cells.get(row)?.get(col)?.as_ref()
    }

    /// Rows, top to bottom.
    pub fn rows(&self) -> &[Vec<Option<PieceId>>] {
        &self.cells
    }

    fn set(&mut self, cell: Cell, id: &PieceId) {
        let (Ok(row), Ok(col)) = (usize::try_from(cell.row), usize::try_from(cell.col)) else {
            return;
        };
        if let Some(slot) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = Some(id.clone());
        }
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .cells
            .iter()
            .flatten()
            .flatten()
            .map(|id| id.to_string().len())
            .max()
            .unwrap_or(1);
        for row in &self.cells {
            let line: Vec<String> = row
                .iter()
                .map(|slot| match slot {
                    Some(id) => format!("{:>width$}", id.to_string()),
                    None => format!("{:>width$}", "."),
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Paint a configuration onto a `size × size` grid. Cells outside the grid
/// are skipped; later pieces in identifier order overwrite earlier ones.
pub fn to_grid(config: &Configuration, size: u16) -> Grid {
    let mut grid = Grid::empty(size);
    if config.is_empty() {
        return grid;
    }
    for (id, cells) in config.pieces() {
        for &cell in cells {
            grid.set(cell, id);
        }
    }
    grid
}
