//! Graphviz export of the explored state graph.

use crate::tracker::{SessionView, Snapshot, Transition};
use crate::Fingerprint;

const CURRENT_FILL: &str = "#f39c12";
const START_FILL: &str = "#88cc88";

/// Render visited states as nodes and transitions as edges.
///
/// The starting state (first visited) is filled green, the current state
/// orange.
pub fn graph_dot(current: Fingerprint, nodes: &[Fingerprint], edges: &[Transition]) -> String {
    let start = nodes.first().copied();

    let mut out = String::new();
    out.push_str("digraph states {\n");
    out.push_str("    node [shape=circle, style=filled, fillcolor=\"#3a3a3a\", fontcolor=white];\n");
    for &node in nodes {
        let fill = if node == current {
            Some(CURRENT_FILL)
        } else if Some(node) == start {
            Some(START_FILL)
        } else {
            None
        };
        match fill {
            Some(fill) => out.push_str(&format!("    \"{}\" [fillcolor=\"{}\"];\n", node, fill)),
            None => out.push_str(&format!("    \"{}\";\n", node)),
        }
    }
    for t in edges {
        out.push_str(&format!("    \"{}\" -> \"{}\";\n", t.source, t.target));
    }
    out.push_str("}\n");
    out
}

/// DOT for a live session.
pub fn to_dot(view: &SessionView<'_>) -> String {
    let state = view.state;
    graph_dot(
        state.fingerprint(),
        state.visited().as_slice(),
        state.transitions().as_slice(),
    )
}

/// DOT for a published snapshot.
pub fn snapshot_dot(snapshot: &Snapshot) -> String {
    graph_dot(snapshot.fingerprint, &snapshot.visited, &snapshot.transitions)
}
