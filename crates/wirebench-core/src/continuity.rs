//! Continuity testing: can current find a path, devices aside.
//!
//! A multimeter in continuity mode beeps on any conductive path whether or
//! not the circuit is live, so the tester ignores device state entirely and
//! looks only at `connected` edges. Probing a dead-but-intact run reads as
//! continuous; probing across a separated splice does not.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::graph::CircuitGraph;
use crate::id::NodeId;

/// True when some path of connected edges joins `a` and `b`.
///
/// A point always has continuity with itself. A probe on an id the graph
/// does not contain reads as no continuity (logged at debug level), even
/// against itself: there is nothing to land the probe on.
pub fn has_continuity(graph: &CircuitGraph, a: &str, b: &str) -> bool {
    if !graph.contains_node(a) || !graph.contains_node(b) {
        debug!(a, b, "continuity probe on unknown node");
        return false;
    }
    if a == b {
        return true;
    }

    let start = NodeId::new(a);
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    visited.insert(start.clone());
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for &eid in graph.adjacent_edges(&current) {
            let Some(edge) = graph.edge(eid) else { continue };
            if !edge.connected {
                continue;
            }
            let Some(next) = edge.other_end(&current) else {
                continue;
            };
            if next.as_str() == b {
                return true;
            }
            if visited.insert(next.clone()) {
                queue.push_back(next.clone());
            }
        }
    }
    false
}

// ===========================================================================
// Tests
// ===========================================================================
