//! Move legality.
//!
//! The tracker never decides legality itself; it asks a [`LegalityGate`].
//! [`SlideRules`] is the sliding-car rule set used by the binaries.

use crate::{Cell, Configuration, PieceId};

/// Judges whether `candidate` may follow `previous`.
///
/// Implementations must be pure and total: a malformed candidate is
/// illegal, never a panic.
pub trait LegalityGate {
    fn is_legal(&self, previous: &Configuration, candidate: &Configuration) -> bool;
}

impl<F> LegalityGate for F
where
    F: Fn(&Configuration, &Configuration) -> bool,
{
    fn is_legal(&self, previous: &Configuration, candidate: &Configuration) -> bool {
        self(previous, candidate)
    }
}

/// Rush Hour movement: one car slides along its own axis through empty
/// cells and stays on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlideRules {
    pub size: u16,
}

/// Axis a piece may travel along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
    /// Single-cell piece.
    Either,
    /// Cells not in one line; the piece cannot move.
    Fixed,
}

impl SlideRules {
    pub fn new(size: u16) -> SlideRules {
        SlideRules { size }
    }

    /// Find the one piece that differs between the two configurations.
    /// `Ok(None)` means nothing moved; `Err(())` means the piece sets or
    /// sizes disagree, or more than one piece moved.
    #[allow(clippy::type_complexity)]
    fn moved_piece<'a>(
        previous: &'a Configuration,
        candidate: &'a Configuration,
    ) -> Result<Option<(&'a PieceId, &'a [Cell], &'a [Cell])>, ()> {
        if previous.len() != candidate.len() {
            return Err(());
        }
        let mut moved = None;
        for (id, before) in previous.pieces() {
            let after = candidate.get(id).ok_or(())?;
            if before.len() != after.len() {
                return Err(());
            }
            if before != after {
                if moved.is_some() {
                    return Err(());
                }
                moved = Some((id, before, after));
            }
        }
        Ok(moved)
    }
}

fn axis(cells: &[Cell]) -> Axis {
    match cells {
        [] => Axis::Fixed,
        [_] => Axis::Either,
        [first, rest @ ..] => {
            if rest.iter().all(|c| c.row == first.row) {
                Axis::Horizontal
            } else if rest.iter().all(|c| c.col == first.col) {
                Axis::Vertical
            } else {
                Axis::Fixed
            }
        }
    }
}

/// The single straight-line offset mapping `before` onto `after`, cell by
/// cell, if there is one.
fn translation(before: &[Cell], after: &[Cell]) -> Option<(i64, i64)> {
    let (first_before, first_after) = (before.first()?, after.first()?);
    let dr = first_after.row.checked_sub(first_before.row)?;
    let dc = first_after.col.checked_sub(first_before.col)?;
    if dr != 0 && dc != 0 {
        return None;
    }
    let consistent = before
        .iter()
        .zip(after)
        .all(|(b, a)| b.offset(dr, dc) == Some(*a));
    consistent.then_some((dr, dc))
}

/// Every cell swept on the way must be empty or owned by the moving piece.
fn path_is_clear(
    previous: &Configuration,
    mover: &PieceId,
    cells: &[Cell],
    (dr, dc): (i64, i64),
) -> bool {
    let occupied = previous.occupancy();
    let steps = dr.abs().max(dc.abs());
    let (step_r, step_c) = (dr.signum(), dc.signum());
    (1..=steps).all(|k| {
        cells.iter().all(|cell| match cell.offset(step_r * k, step_c * k) {
            Some(swept) => occupied.get(&swept).map_or(true, |owner| *owner == mover),
            None => false,
        })
    })
}

impl LegalityGate for SlideRules {
    fn is_legal(&self, previous: &Configuration, candidate: &Configuration) -> bool {
        if candidate.validate(self.size).is_err() {
            return false;
        }
        let (id, before, after) = match Self::moved_piece(previous, candidate) {
            Ok(Some(moved)) => moved,
            Ok(None) => return true,
            Err(()) => return false,
        };
        let Some(delta) = translation(before, after) else {
            return false;
        };
        let along_axis = match axis(before) {
            Axis::Horizontal => delta.0 == 0,
            Axis::Vertical => delta.1 == 0,
            Axis::Either => true,
            Axis::Fixed => false,
        };
        along_axis && path_is_clear(previous, id, before, delta)
    }
}
