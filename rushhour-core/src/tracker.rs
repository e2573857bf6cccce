//! Explored state-space tracking.
//!
//! A [`Tracker`] owns one [`SessionState`] and is the only thing that
//! mutates it. Each observed configuration runs through exactly one
//! [`Tracker::observe`] pass:
//!
//! ```text
//! legal, unseen fingerprint      -> Discovered  (edge unless first legal event or empty source)
//! legal, seen, different         -> Revisited   (no edge under RevisitPolicy::Skip)
//! legal, same fingerprint        -> Unchanged
//! illegal, structurally changed  -> Rejected    (message set, current kept)
//! illegal, structurally equal    -> Echo        (nothing happens)
//! ```
//!
//! Every legal event clears the message; only `Rejected` sets it.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::rules::LegalityGate;
use crate::{
    same_configuration, to_grid, Configuration, Fingerprint, Grid, DEFAULT_BOARD_SIZE,
};

/// Message shown while the board disagrees with the last accepted state.
pub const ILLEGAL_MOVE_NOTICE: &str = "Illegal move, please put it back to the last position";

/// Directed edge between two fingerprints, `[source, target]` on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(from = "[Fingerprint; 2]", into = "[Fingerprint; 2]")]
pub struct Transition {
    pub source: Fingerprint,
    pub target: Fingerprint,
}

impl Transition {
    #[inline]
    pub const fn new(source: Fingerprint, target: Fingerprint) -> Transition {
        Transition { source, target }
    }
}

impl From<[Fingerprint; 2]> for Transition {
    fn from([source, target]: [Fingerprint; 2]) -> Self {
        Transition { source, target }
    }
}

impl From<Transition> for [Fingerprint; 2] {
    fn from(t: Transition) -> Self {
        [t.source, t.target]
    }
}

/// Insertion-ordered set that only grows.
#[derive(Clone, Debug)]
pub struct OrderedSet<T> {
    order: Vec<T>,
    index: HashSet<T>,
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        OrderedSet {
            order: Vec::new(),
            index: HashSet::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> OrderedSet<T> {
    /// Insert a value. Returns `false` if it was already present.
    fn insert(&mut self, value: T) -> bool {
        if self.index.insert(value) {
            self.order.push(value);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.index.contains(value)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Values in insertion order.
    pub fn as_slice(&self) -> &[T] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter()
    }
}

/// Whether a legal move into an already-visited state gets an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RevisitPolicy {
    /// Only moves that discover a new state are edged.
    #[default]
    Skip,
    /// Every legal move between distinct states is edged.
    Record,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackerOptions {
    pub board_size: u16,
    pub revisit: RevisitPolicy,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        TrackerOptions {
            board_size: DEFAULT_BOARD_SIZE,
            revisit: RevisitPolicy::default(),
        }
    }
}

/// What a single observation did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Observed {
    /// Legal move into a state not seen before.
    Discovered { transition: Option<Transition> },
    /// Legal move back into a known state.
    Revisited { transition: Option<Transition> },
    /// Legal, but the fingerprint did not change.
    Unchanged,
    /// Illegal move; the message is set and the board is not advanced.
    Rejected,
    /// Illegal resend of the current configuration; ignored.
    Echo,
}

impl Observed {
    pub fn is_legal(&self) -> bool {
        !matches!(self, Observed::Rejected | Observed::Echo)
    }

    pub fn transition(&self) -> Option<Transition> {
        match self {
            Observed::Discovered { transition } | Observed::Revisited { transition } => *transition,
            _ => None,
        }
    }
}

/// Everything one session knows.
#[derive(Clone, Debug)]
pub struct SessionState {
    current: Configuration,
    visited: OrderedSet<Fingerprint>,
    transitions: OrderedSet<Transition>,
    message: Option<&'static str>,
    seen_legal: bool,
}

impl SessionState {
    fn new(initial: Configuration) -> SessionState {
        let mut visited = OrderedSet::default();
        visited.insert(initial.fingerprint());
        SessionState {
            current: initial,
            visited,
            transitions: OrderedSet::default(),
            message: None,
            seen_legal: false,
        }
    }

    pub fn current(&self) -> &Configuration {
        &self.current
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.current.fingerprint()
    }

    pub fn visited(&self) -> &OrderedSet<Fingerprint> {
        &self.visited
    }

    pub fn transitions(&self) -> &OrderedSet<Transition> {
        &self.transitions
    }

    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    pub fn is_rejected(&self) -> bool {
        self.message.is_some()
    }
}

/// Read-only view handed to a [`Presenter`].
#[derive(Clone, Copy, Debug)]
pub struct SessionView<'a> {
    pub state: &'a SessionState,
    pub board_size: u16,
}

impl SessionView<'_> {
    pub fn grid(&self) -> Grid {
        to_grid(self.state.current(), self.board_size)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board_size: self.board_size,
            cars: self.state.current().clone(),
            fingerprint: self.state.fingerprint(),
            grid: self.grid(),
            visited: self.state.visited().as_slice().to_vec(),
            transitions: self.state.transitions().as_slice().to_vec(),
            message: self.state.message().map(str::to_string),
        }
    }
}

/// Owned, serializable copy of a session view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub board_size: u16,
    pub cars: Configuration,
    pub fingerprint: Fingerprint,
    pub grid: Grid,
    pub visited: Vec<Fingerprint>,
    pub transitions: Vec<Transition>,
    pub message: Option<String>,
}

/// Receives a render pass after every observation.
pub trait Presenter {
    fn render(&mut self, view: &SessionView<'_>);
}

impl<F> Presenter for F
where
    F: FnMut(&SessionView<'_>),
{
    fn render(&mut self, view: &SessionView<'_>) {
        self(view)
    }
}

/// Stateful core: applies observed configurations to the session.
#[derive(Clone, Debug)]
pub struct Tracker<G> {
    gate: G,
    options: TrackerOptions,
    initial: Configuration,
    state: SessionState,
}

impl<G: LegalityGate> Tracker<G> {
    /// Start a session from `initial` with default options.
    pub fn new(initial: Configuration, gate: G) -> Tracker<G> {
        Tracker::with_options(initial, gate, TrackerOptions::default())
    }

    pub fn with_options(initial: Configuration, gate: G, options: TrackerOptions) -> Tracker<G> {
        let state = SessionState::new(initial.clone());
        debug!(fingerprint = state.fingerprint(), "session started");
        Tracker {
            gate,
            options,
            initial,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn options(&self) -> TrackerOptions {
        self.options
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn initial(&self) -> &Configuration {
        &self.initial
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            state: &self.state,
            board_size: self.options.board_size,
        }
    }

    /// Apply one observed configuration.
    pub fn observe(&mut self, candidate: Configuration) -> Observed {
        let candidate_fp = candidate.fingerprint();
        let current_fp = self.state.current.fingerprint();

        if !self.gate.is_legal(&self.state.current, &candidate) {
            if same_configuration(&self.state.current, &candidate) {
                debug!(fingerprint = current_fp, "echo of current board ignored");
                return Observed::Echo;
            }
            info!(
                current = current_fp,
                candidate = candidate_fp,
                "illegal move rejected"
            );
            self.state.message = Some(ILLEGAL_MOVE_NOTICE);
            return Observed::Rejected;
        }

        // The first legal event and moves off an empty board never get an edge.
        let may_edge = self.state.seen_legal && current_fp != 0;

        let outcome = if self.state.visited.insert(candidate_fp) {
            let transition = may_edge.then(|| Transition::new(current_fp, candidate_fp));
            if let Some(t) = transition {
                self.state.transitions.insert(t);
            }
            Observed::Discovered { transition }
        } else if candidate_fp != current_fp {
            self.state.visited.insert(current_fp);
            let transition = match self.options.revisit {
                RevisitPolicy::Record if may_edge => {
                    let t = Transition::new(current_fp, candidate_fp);
                    self.state.transitions.insert(t);
                    Some(t)
                }
                _ => None,
            };
            Observed::Revisited { transition }
        } else {
            Observed::Unchanged
        };

        self.state.current = candidate;
        self.state.message = None;
        self.state.seen_legal = true;

        debug!(
            from = current_fp,
            to = candidate_fp,
            visited = self.state.visited.len(),
            transitions = self.state.transitions.len(),
            ?outcome,
            "move applied"
        );
        outcome
    }

    /// Apply one observed configuration, then render.
    ///
    /// The presenter sees the session after every event, including echoes
    /// and rejections.
    pub fn handle<P: Presenter + ?Sized>(
        &mut self,
        candidate: Configuration,
        presenter: &mut P,
    ) -> Observed {
        let outcome = self.observe(candidate);
        presenter.render(&self.view());
        outcome
    }

    /// Discard the session and start again from the initial configuration.
    pub fn reset(&mut self) {
        self.state = SessionState::new(self.initial.clone());
        info!(fingerprint = self.state.fingerprint(), "session reset");
    }
}
