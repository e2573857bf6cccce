//! Offline tooling for recorded Rush Hour board streams.

pub mod stats;
pub mod stream;

use rushhour_core::{LegalityGate, Tracker};
use tracing::{debug, warn};

pub use stats::ReplayStats;
pub use stream::{LoadError, StreamEntry};

/// Feed every parsed entry through `tracker` in order.
///
/// Malformed lines are counted and skipped; they never reach the tracker.
pub fn replay<G: LegalityGate>(tracker: &mut Tracker<G>, entries: Vec<StreamEntry>) -> ReplayStats {
    let mut stats = ReplayStats::new();
    for entry in entries {
        match entry.parsed {
            Ok(cars) => {
                let outcome = tracker.observe(cars);
                debug!(line = entry.line, ?outcome, "replayed");
                stats.record(&outcome);
            }
            Err(e) => {
                warn!(line = entry.line, error = %e, "skipping malformed line");
                stats.record_malformed();
            }
        }
    }
    stats
}
