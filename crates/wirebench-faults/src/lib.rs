//! Fault modeling for troubleshooting exercises.
//!
//! Where [`wirebench_core`] answers "is this circuit wired and powered",
//! this crate answers "what is wrong with it and did the trainee find out".
//! Exercises build a [`FaultStateModel`] -- a deliberately simplified
//! node-state graph, separate from the circuit graph -- inject faults into
//! it with a [`FaultInjector`], and log the trainee's probing in a
//! [`DiagnosticRecorder`] for scoring.
//!
//! # Design
//!
//! - The model is its own store: diagnostic views often simplify or regroup
//!   the physical circuit, so nothing here aliases `CircuitGraph` state.
//!   Only the [`NodeId`] vocabulary is shared.
//! - Each node carries one [`NodeState`] and a voltage derived from it.
//!   Changing any state recomputes every voltage; intermittent nodes draw a
//!   fresh jitter sample on each recompute, so repeated probing of a loose
//!   connection reads differently each time.
//! - All randomness comes from the model's owned, seeded
//!   [`SessionRng`](wirebench_core::rng::SessionRng): identical seeds replay
//!   identical readings.
//! - Continuity checks walk the model's links and are blocked by
//!   intermediate `Open` nodes; the probe endpoints themselves are exempt.

pub mod injector;
pub mod recorder;

pub use injector::{FaultError, FaultEvent, FaultInjector, FaultKind, InjectedFault};
pub use recorder::{DiagnosticRecorder, DiagnosticStep};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use wirebench_core::graph::Insert;
use wirebench_core::id::NodeId;
use wirebench_core::power::NOMINAL_VOLTAGE;
use wirebench_core::rng::SessionRng;

// ---------------------------------------------------------------------------
// Node states and voltage rules
// ---------------------------------------------------------------------------

/// Electrical condition of one point in the diagnostic view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Powered at nominal voltage.
    Energized,
    /// Intact but unpowered.
    DeEnergized,
    /// Broken path: no voltage, and continuity cannot cross it.
    Open,
    /// Poor joint dropping voltage under load.
    HighResistance,
    /// Loose connection: the reading wanders on every probe.
    Intermittent,
    /// Too much load on the run.
    Overloaded,
}

const HIGH_RESISTANCE_FACTOR: f32 = 0.7;
const OVERLOADED_FACTOR: f32 = 0.85;
const INTERMITTENT_MIN: f32 = 0.3;
const INTERMITTENT_MAX: f32 = 1.0;

/// One point in the fault-state model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultStateNode {
    pub id: NodeId,
    pub state: NodeState,
    /// Derived from `state` on the last recompute.
    pub voltage: f32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from fault-state model operations.
#[derive(Debug, thiserror::Error)]
pub enum FaultModelError {
    /// The referenced node id is not in the model.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
}

// ---------------------------------------------------------------------------
// FaultStateModel
// ---------------------------------------------------------------------------

/// Node-state graph for one troubleshooting exercise.
///
/// Nodes are keyed by caller-supplied [`NodeId`]s and joined by undirected
/// links. State changes go through [`set_state`](Self::set_state) (usually
/// via a [`FaultInjector`]), which recomputes every node's voltage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultStateModel {
    nodes: HashMap<NodeId, FaultStateNode>,
    /// Node ids in insertion order; fixes the order jitter samples are
    /// drawn in, which keeps seeded sessions reproducible.
    order: Vec<NodeId>,
    links: HashMap<NodeId, Vec<NodeId>>,
    nominal: f32,
    rng: SessionRng,
}

impl FaultStateModel {
    /// Model at the standard 120 V nominal, with all randomness derived
    /// from `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_nominal(NOMINAL_VOLTAGE, seed)
    }

    pub fn with_nominal(nominal: f32, seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            links: HashMap::new(),
            nominal,
            rng: SessionRng::new(seed),
        }
    }

    pub fn nominal(&self) -> f32 {
        self.nominal
    }

    // -- construction ----------------------------------------------------------

    /// Add a node, initially [`NodeState::Energized`] at nominal voltage.
    /// A duplicate id leaves the model untouched.
    pub fn add_node(&mut self, id: impl Into<NodeId>) -> Insert<NodeId> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            debug!(id = %id, "add_node: id already present");
            return Insert::Existing(id);
        }
        self.order.push(id.clone());
        self.links.insert(id.clone(), Vec::new());
        self.nodes.insert(
            id.clone(),
            FaultStateNode {
                id: id.clone(),
                state: NodeState::Energized,
                voltage: self.nominal,
            },
        );
        Insert::Added(id)
    }

    /// Link two nodes (undirected). Duplicate links are ignored.
    pub fn link(&mut self, a: &str, b: &str) -> Result<(), FaultModelError> {
        let a = self.resolve(a)?;
        let b = self.resolve(b)?;
        if let Some(list) = self.links.get_mut(&a)
            && !list.contains(&b)
        {
            list.push(b.clone());
        }
        if a != b
            && let Some(list) = self.links.get_mut(&b)
            && !list.contains(&a)
        {
            list.push(a);
        }
        Ok(())
    }

    // -- state -----------------------------------------------------------------

    /// Change one node's state. Every voltage in the model is recomputed,
    /// including fresh jitter for intermittent nodes.
    pub fn set_state(&mut self, id: &str, state: NodeState) -> Result<(), FaultModelError> {
        match self.nodes.get_mut(id) {
            Some(node) => node.state = state,
            None => {
                debug!(id, "set_state: unknown node");
                return Err(FaultModelError::NodeNotFound(NodeId::new(id)));
            }
        }
        self.recompute_voltages();
        Ok(())
    }

    /// Re-derive every voltage from its state, in insertion order.
    ///
    /// Public because re-probing matters: a loose connection should not
    /// read the same twice, so hosts recompute between measurements.
    pub fn recompute_voltages(&mut self) {
        for i in 0..self.order.len() {
            let Some(node) = self.nodes.get_mut(&self.order[i]) else {
                continue;
            };
            node.voltage = match node.state {
                NodeState::Energized => self.nominal,
                NodeState::DeEnergized | NodeState::Open => 0.0,
                NodeState::HighResistance => self.nominal * HIGH_RESISTANCE_FACTOR,
                NodeState::Intermittent => {
                    self.nominal * self.rng.range_f32(INTERMITTENT_MIN, INTERMITTENT_MAX)
                }
                NodeState::Overloaded => self.nominal * OVERLOADED_FACTOR,
            };
        }
    }

    /// Put every node back to [`NodeState::Energized`] (exercise re-init on
    /// a fixed topology).
    pub fn reset_states(&mut self) {
        for node in self.nodes.values_mut() {
            node.state = NodeState::Energized;
        }
        self.recompute_voltages();
    }

    // -- queries -----------------------------------------------------------------

    pub fn node(&self, id: &str) -> Option<&FaultStateNode> {
        self.nodes.get(id)
    }

    pub fn state(&self, id: &str) -> Option<NodeState> {
        self.nodes.get(id).map(|n| n.state)
    }

    /// Last computed voltage at `id`; unknown ids read zero.
    pub fn voltage(&self, id: &str) -> f32 {
        self.nodes.get(id).map(|n| n.voltage).unwrap_or(0.0)
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Direct neighbors of `id`, insertion order. Empty for unknown ids.
    pub fn links_of(&self, id: &str) -> &[NodeId] {
        self.links.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when a path of links joins `a` and `b` without crossing an
    /// intermediate [`NodeState::Open`] node. The probe endpoints are
    /// exempt: you can always reach the point you are touching.
    pub fn check_continuity(&self, a: &str, b: &str) -> bool {
        if !self.nodes.contains_key(a) || !self.nodes.contains_key(b) {
            debug!(a, b, "continuity probe on unknown node");
            return false;
        }
        if a == b {
            return true;
        }

        let start = NodeId::new(a);
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = vec![start.clone()];
        visited.insert(start);

        while let Some(current) = stack.pop() {
            // An open point other than the probe source cannot be crossed.
            if current.as_str() != a && self.state(current.as_str()) == Some(NodeState::Open) {
                continue;
            }
            for next in self.links_of(current.as_str()) {
                if next.as_str() == b {
                    return true;
                }
                if visited.insert(next.clone()) {
                    stack.push(next.clone());
                }
            }
        }
        false
    }

    // -- internals ----------------------------------------------------------------

    fn resolve(&self, id: &str) -> Result<NodeId, FaultModelError> {
        match self.nodes.get(id) {
            Some(node) => Ok(node.id.clone()),
            None => {
                debug!(id, "unknown node");
                Err(FaultModelError::NodeNotFound(NodeId::new(id)))
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: panel -> splice -> outlet, all linked, seed 7.
    fn make_run() -> FaultStateModel {
        let mut model = FaultStateModel::new(7);
        model.add_node("panel");
        model.add_node("splice");
        model.add_node("outlet");
        model.link("panel", "splice").unwrap();
        model.link("splice", "outlet").unwrap();
        model
    }

    // -----------------------------------------------------------------------
    // Test 1: Fresh nodes are energized at nominal
    // -----------------------------------------------------------------------
    #[test]
    fn fresh_nodes_energized() {
        let model = make_run();
        assert_eq!(model.node_count(), 3);
        assert_eq!(model.state("panel"), Some(NodeState::Energized));
        assert_eq!(model.voltage("panel"), 120.0);
    }

    // -----------------------------------------------------------------------
    // Test 2: Duplicate add returns the existing node, state preserved
    // -----------------------------------------------------------------------
    #[test]
    fn duplicate_add_keeps_state() {
        let mut model = make_run();
        model.set_state("splice", NodeState::Open).unwrap();

        let outcome = model.add_node("splice");
        assert!(!outcome.is_added());
        assert_eq!(model.state("splice"), Some(NodeState::Open));
        assert_eq!(model.node_count(), 3);
    }

    // -----------------------------------------------------------------------
    // Test 3: Voltage rules per state
    // -----------------------------------------------------------------------
    #[test]
    fn voltage_rules() {
        let mut model = make_run();

        model.set_state("splice", NodeState::DeEnergized).unwrap();
        assert_eq!(model.voltage("splice"), 0.0);

        model.set_state("splice", NodeState::Open).unwrap();
        assert_eq!(model.voltage("splice"), 0.0);

        model.set_state("splice", NodeState::HighResistance).unwrap();
        assert_eq!(model.voltage("splice"), 120.0 * 0.7);

        model.set_state("splice", NodeState::Overloaded).unwrap();
        assert_eq!(model.voltage("splice"), 120.0 * 0.85);

        model.set_state("splice", NodeState::Energized).unwrap();
        assert_eq!(model.voltage("splice"), 120.0);
        // Untouched neighbors stay at nominal throughout.
        assert_eq!(model.voltage("outlet"), 120.0);
    }

    // -----------------------------------------------------------------------
    // Test 4: Intermittent readings jitter inside the band, probe to probe
    // -----------------------------------------------------------------------
    #[test]
    fn intermittent_jitters_in_band() {
        let mut model = make_run();
        model.set_state("splice", NodeState::Intermittent).unwrap();

        let mut readings = Vec::new();
        for _ in 0..8 {
            model.recompute_voltages();
            let v = model.voltage("splice");
            assert!((36.0..120.0).contains(&v), "reading out of band: {v}");
            readings.push(v);
        }
        // Eight identical draws would mean the jitter is not jittering.
        assert!(readings.windows(2).any(|w| w[0] != w[1]));
    }

    // -----------------------------------------------------------------------
    // Test 5: Unknown ids are typed failures or safe defaults
    // -----------------------------------------------------------------------
    #[test]
    fn unknown_ids() {
        let mut model = make_run();
        assert!(matches!(
            model.set_state("attic", NodeState::Open),
            Err(FaultModelError::NodeNotFound(_))
        ));
        assert!(matches!(
            model.link("panel", "attic"),
            Err(FaultModelError::NodeNotFound(_))
        ));
        assert_eq!(model.state("attic"), None);
        assert_eq!(model.voltage("attic"), 0.0);
        assert!(model.links_of("attic").is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 6: Duplicate links collapse
    // -----------------------------------------------------------------------
    #[test]
    fn duplicate_links_collapse() {
        let mut model = make_run();
        model.link("panel", "splice").unwrap();
        model.link("splice", "panel").unwrap();
        assert_eq!(model.links_of("panel").len(), 1);
        assert_eq!(model.links_of("splice").len(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 7: Continuity crosses intact runs and stops at an open point
    // -----------------------------------------------------------------------
    #[test]
    fn continuity_blocked_by_open_intermediate() {
        let mut model = make_run();
        assert!(model.check_continuity("panel", "outlet"));

        model.set_state("splice", NodeState::Open).unwrap();
        assert!(!model.check_continuity("panel", "outlet"));
        assert!(!model.check_continuity("outlet", "panel"));
    }

    // -----------------------------------------------------------------------
    // Test 8: The probe target is exempt from the open rule
    // -----------------------------------------------------------------------
    #[test]
    fn open_target_still_reachable() {
        let mut model = make_run();
        model.set_state("splice", NodeState::Open).unwrap();
        // You can reach the open point itself, just not through it.
        assert!(model.check_continuity("panel", "splice"));
        assert!(model.check_continuity("outlet", "splice"));
    }

    // -----------------------------------------------------------------------
    // Test 9: The probe source is exempt too
    // -----------------------------------------------------------------------
    #[test]
    fn open_source_can_probe_out() {
        let mut model = make_run();
        model.set_state("panel", NodeState::Open).unwrap();
        assert!(model.check_continuity("panel", "splice"));
    }

    // -----------------------------------------------------------------------
    // Test 10: Degraded-but-closed states do not block continuity
    // -----------------------------------------------------------------------
    #[test]
    fn degraded_states_conduct() {
        let mut model = make_run();
        for state in [
            NodeState::DeEnergized,
            NodeState::HighResistance,
            NodeState::Intermittent,
            NodeState::Overloaded,
        ] {
            model.set_state("splice", state).unwrap();
            assert!(
                model.check_continuity("panel", "outlet"),
                "{state:?} should conduct"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Test 11: Self and unknown probes
    // -----------------------------------------------------------------------
    #[test]
    fn probe_edge_cases() {
        let model = make_run();
        assert!(model.check_continuity("panel", "panel"));
        assert!(!model.check_continuity("panel", "attic"));
        assert!(!model.check_continuity("attic", "attic"));
    }

    // -----------------------------------------------------------------------
    // Test 12: reset_states re-energizes the whole model
    // -----------------------------------------------------------------------
    #[test]
    fn reset_states_restores() {
        let mut model = make_run();
        model.set_state("panel", NodeState::Open).unwrap();
        model.set_state("splice", NodeState::Intermittent).unwrap();

        model.reset_states();
        for id in ["panel", "splice", "outlet"] {
            assert_eq!(model.state(id), Some(NodeState::Energized));
            assert_eq!(model.voltage(id), 120.0);
        }
    }

    // -----------------------------------------------------------------------
    // Test 13: Same seed, same readings
    // -----------------------------------------------------------------------
    #[test]
    fn seeded_sessions_replay() {
        let build = || {
            let mut model = FaultStateModel::new(99);
            model.add_node("a");
            model.add_node("b");
            model.link("a", "b").unwrap();
            model.set_state("a", NodeState::Intermittent).unwrap();
            model
        };
        let mut first = build();
        let mut second = build();
        for _ in 0..10 {
            first.recompute_voltages();
            second.recompute_voltages();
            assert_eq!(first.voltage("a"), second.voltage("a"));
        }
    }

    // -----------------------------------------------------------------------
    // Test 14: Serde round-trip resumes the jitter sequence exactly
    // -----------------------------------------------------------------------
    #[test]
    fn serde_round_trip_resumes() {
        let mut model = make_run();
        model.set_state("splice", NodeState::Intermittent).unwrap();
        model.recompute_voltages();

        let json = serde_json::to_string(&model).unwrap();
        let mut restored: FaultStateModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.voltage("splice"), model.voltage("splice"));

        model.recompute_voltages();
        restored.recompute_voltages();
        assert_eq!(restored.voltage("splice"), model.voltage("splice"));
    }

    // -----------------------------------------------------------------------
    // Test 15: Custom nominal flows through every rule
    // -----------------------------------------------------------------------
    #[test]
    fn custom_nominal() {
        let mut model = FaultStateModel::with_nominal(240.0, 1);
        model.add_node("feeder");
        assert_eq!(model.voltage("feeder"), 240.0);

        model.set_state("feeder", NodeState::HighResistance).unwrap();
        assert_eq!(model.voltage("feeder"), 240.0 * 0.7);
    }
}
