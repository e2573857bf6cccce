//! Replay statistics tracking.

use std::time::{Duration, Instant};

use rushhour_core::Observed;

/// Counts collected while replaying a stream.
#[derive(Debug, Default)]
pub struct ReplayStats {
    /// Lines that parsed and reached the tracker
    pub events: u64,

    /// Legal moves into new states
    pub discovered: u64,

    /// Legal moves back into known states
    pub revisited: u64,

    /// Legal events that left the fingerprint unchanged
    pub unchanged: u64,

    /// Illegal moves that set the message
    pub rejected: u64,

    /// Illegal resends of the current board
    pub echoes: u64,

    /// Edges added to the graph
    pub edges_recorded: u64,

    /// Lines that did not parse as inbound messages
    pub malformed: u64,

    start_time: Option<Instant>,
}

impl ReplayStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Record one tracker outcome
    pub fn record(&mut self, outcome: &Observed) {
        self.events += 1;
        match outcome {
            Observed::Discovered { .. } => self.discovered += 1,
            Observed::Revisited { .. } => self.revisited += 1,
            Observed::Unchanged => self.unchanged += 1,
            Observed::Rejected => self.rejected += 1,
            Observed::Echo => self.echoes += 1,
        }
        if outcome.transition().is_some() {
            self.edges_recorded += 1;
        }
    }

    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Events per second since the replay started
    pub fn events_per_sec(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.events as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print final summary
    pub fn print_summary(&self, visited: usize, transitions: usize) {
        println!("Events: {}", self.events);
        println!("  - Discovered: {}", self.discovered);
        println!("  - Revisited: {}", self.revisited);
        println!("  - Unchanged: {}", self.unchanged);
        println!("  - Rejected: {}", self.rejected);
        println!("  - Echoes: {}", self.echoes);
        println!("Malformed lines: {}", self.malformed);
        println!("Visited states: {}", visited);
        println!("Transitions: {}", transitions);
        println!(
            "Elapsed: {:.3}s ({:.0} events/sec)",
            self.elapsed().as_secs_f64(),
            self.events_per_sec()
        );
    }
}
