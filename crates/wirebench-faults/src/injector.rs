//! Fault injection and lifecycle tracking.
//!
//! A [`FaultInjector`] plants faults into a [`FaultStateModel`] and walks
//! each one through Active -> Identified -> Repaired as the trainee works.
//! Faults are never deleted mid-exercise; the record of what was planted is
//! the record the exercise is scored against.

use serde::{Deserialize, Serialize};
use tracing::debug;

use wirebench_core::id::NodeId;
use wirebench_core::rng::SessionRng;

use crate::{FaultModelError, FaultStateModel, NodeState};

// ---------------------------------------------------------------------------
// Fault kinds
// ---------------------------------------------------------------------------

/// What went wrong, in trainee-facing terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    LooseConnection,
    BadSplice,
    TrippedGfci,
    TrippedBreaker,
    BrokenWire,
    OverloadedCircuit,
}

impl FaultKind {
    pub const ALL: [FaultKind; 6] = [
        FaultKind::LooseConnection,
        FaultKind::BadSplice,
        FaultKind::TrippedGfci,
        FaultKind::TrippedBreaker,
        FaultKind::BrokenWire,
        FaultKind::OverloadedCircuit,
    ];

    /// The node state this fault leaves behind at its target.
    pub fn node_state(self) -> NodeState {
        match self {
            FaultKind::LooseConnection => NodeState::Intermittent,
            FaultKind::BadSplice => NodeState::HighResistance,
            FaultKind::TrippedGfci | FaultKind::TrippedBreaker | FaultKind::BrokenWire => {
                NodeState::Open
            }
            FaultKind::OverloadedCircuit => NodeState::Overloaded,
        }
    }
}

/// One planted fault and its lifecycle flags.
///
/// `active` clears only on repair; `identified` and `repaired` only ever go
/// from false to true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedFault {
    pub kind: FaultKind,
    pub target: NodeId,
    pub active: bool,
    pub identified: bool,
    pub repaired: bool,
}

/// Lifecycle transitions, for host UI (scoring popups, sound cues).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultEvent {
    Injected { node: NodeId, kind: FaultKind },
    Identified { node: NodeId, kind: FaultKind },
    Repaired { node: NodeId, kind: FaultKind },
}

/// Errors from fault injection.
#[derive(Debug, thiserror::Error)]
pub enum FaultError {
    /// The target node is not in the fault-state model.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    /// The target already carries a live fault.
    #[error("node already faulted: {0}")]
    AlreadyFaulted(NodeId),
    /// Random injection found no fault-free node to hit.
    #[error("no fault-free nodes available")]
    NoCandidates,
}

// ---------------------------------------------------------------------------
// FaultInjector
// ---------------------------------------------------------------------------

/// Plants faults and tracks their lifecycle for one exercise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaultInjector {
    faults: Vec<InjectedFault>,
    /// Pending lifecycle events; not part of saved state.
    #[serde(skip)]
    events: Vec<FaultEvent>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self::default()
    }

    // -- lifecycle ---------------------------------------------------------------

    /// Plant `kind` at `target`, degrading the model node accordingly.
    ///
    /// One live fault per node: a second injection at a node whose fault is
    /// not yet repaired is refused with [`FaultError::AlreadyFaulted`].
    pub fn inject_fault(
        &mut self,
        model: &mut FaultStateModel,
        kind: FaultKind,
        target: &str,
    ) -> Result<(), FaultError> {
        if self.live_fault_at(target).is_some() {
            debug!(target, "inject refused: node already carries a live fault");
            return Err(FaultError::AlreadyFaulted(NodeId::new(target)));
        }
        match model.set_state(target, kind.node_state()) {
            Ok(()) => {}
            Err(FaultModelError::NodeNotFound(id)) => return Err(FaultError::NodeNotFound(id)),
        }
        let node = NodeId::new(target);
        self.faults.push(InjectedFault {
            kind,
            target: node.clone(),
            active: true,
            identified: false,
            repaired: false,
        });
        self.events.push(FaultEvent::Injected { node, kind });
        Ok(())
    }

    /// Plant `kind` at a node drawn uniformly from the model, skipping nodes
    /// that already carry a live fault. Returns the chosen target.
    pub fn inject_random(
        &mut self,
        model: &mut FaultStateModel,
        kind: FaultKind,
        rng: &mut SessionRng,
    ) -> Result<NodeId, FaultError> {
        let mut candidates: Vec<NodeId> = model
            .node_ids()
            .iter()
            .filter(|id| self.live_fault_at(id.as_str()).is_none())
            .cloned()
            .collect();
        let Some(index) = rng.pick_index(candidates.len()) else {
            return Err(FaultError::NoCandidates);
        };
        let target = candidates.swap_remove(index);
        self.inject_fault(model, kind, target.as_str())?;
        Ok(target)
    }

    /// Record that the trainee named the fault at `target`.
    ///
    /// True only when a live fault is there and `guess` matches its kind
    /// exactly. A near miss (`TrippedBreaker` for a `TrippedGfci`) is a
    /// plain false and leaves the fault merely active. Re-identifying an
    /// already-identified fault is true but emits no second event.
    pub fn identify_fault(&mut self, target: &str, guess: FaultKind) -> bool {
        let Some(fault) = self.live_fault_at_mut(target) else {
            return false;
        };
        if fault.kind != guess {
            return false;
        }
        let first_time = !fault.identified;
        fault.identified = true;
        let node = fault.target.clone();
        if first_time {
            self.events.push(FaultEvent::Identified { node, kind: guess });
        }
        true
    }

    /// Repair the identified fault at `target`, restoring the model node to
    /// [`NodeState::Energized`]. A fault that was never identified cannot be
    /// repaired; that and every other mismatch returns false.
    pub fn repair_fault(&mut self, model: &mut FaultStateModel, target: &str) -> bool {
        let Some(fault) = self
            .faults
            .iter_mut()
            .find(|f| f.target.as_str() == target && f.identified && !f.repaired)
        else {
            debug!(target, "repair refused: no identified fault here");
            return false;
        };
        fault.repaired = true;
        fault.active = false;
        let kind = fault.kind;
        let node = fault.target.clone();
        if model.set_state(target, NodeState::Energized).is_err() {
            debug!(target, "repaired fault names a node missing from the model");
        }
        self.events.push(FaultEvent::Repaired { node, kind });
        true
    }

    // -- queries -----------------------------------------------------------------

    /// Every fault planted this exercise, injection order, repaired included.
    pub fn faults(&self) -> &[InjectedFault] {
        &self.faults
    }

    /// Most recently planted fault at `target`, live or not.
    pub fn fault_at(&self, target: &str) -> Option<&InjectedFault> {
        self.faults.iter().rev().find(|f| f.target.as_str() == target)
    }

    pub fn active_faults(&self) -> Vec<&InjectedFault> {
        self.faults.iter().filter(|f| f.active).collect()
    }

    pub fn fault_count(&self) -> usize {
        self.faults.len()
    }

    /// True when every planted fault has been identified. An exercise with
    /// no faults planted has identified nothing, so this is false.
    pub fn all_identified(&self) -> bool {
        !self.faults.is_empty() && self.faults.iter().all(|f| f.identified)
    }

    /// True when every planted fault has been repaired; false when none were
    /// planted.
    pub fn all_repaired(&self) -> bool {
        !self.faults.is_empty() && self.faults.iter().all(|f| f.repaired)
    }

    /// Take the lifecycle events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<FaultEvent> {
        std::mem::take(&mut self.events)
    }

    /// Forget all faults and pending events.
    pub fn reset(&mut self) {
        self.faults.clear();
        self.events.clear();
    }

    // -- internals ----------------------------------------------------------------

    fn live_fault_at(&self, target: &str) -> Option<&InjectedFault> {
        self.faults
            .iter()
            .find(|f| f.active && f.target.as_str() == target)
    }

    fn live_fault_at_mut(&mut self, target: &str) -> Option<&mut InjectedFault> {
        self.faults
            .iter_mut()
            .find(|f| f.active && f.target.as_str() == target)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: three-node run (panel -> splice -> outlet), seed 11.
    fn make_run() -> FaultStateModel {
        let mut model = FaultStateModel::new(11);
        model.add_node("panel");
        model.add_node("splice");
        model.add_node("outlet");
        model.link("panel", "splice").unwrap();
        model.link("splice", "outlet").unwrap();
        model
    }

    // -----------------------------------------------------------------------
    // Test 1: Every kind degrades its target to the mapped state
    // -----------------------------------------------------------------------
    #[test]
    fn each_kind_maps_to_its_state() {
        for kind in FaultKind::ALL {
            let mut model = make_run();
            let mut injector = FaultInjector::new();
            injector.inject_fault(&mut model, kind, "splice").unwrap();
            assert_eq!(
                model.state("splice"),
                Some(kind.node_state()),
                "{kind:?} mapped wrong"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Test 2: Injection drops the target's voltage per its state
    // -----------------------------------------------------------------------
    #[test]
    fn injection_degrades_voltage() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();

        injector
            .inject_fault(&mut model, FaultKind::BadSplice, "splice")
            .unwrap();
        assert_eq!(model.voltage("splice"), 120.0 * 0.7);
        assert_eq!(model.voltage("outlet"), 120.0);
    }

    // -----------------------------------------------------------------------
    // Test 3: Unknown target is a typed failure and plants nothing
    // -----------------------------------------------------------------------
    #[test]
    fn unknown_target_rejected() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        let result = injector.inject_fault(&mut model, FaultKind::BrokenWire, "attic");
        assert!(matches!(result, Err(FaultError::NodeNotFound(_))));
        assert_eq!(injector.fault_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Test 4: One live fault per node
    // -----------------------------------------------------------------------
    #[test]
    fn one_live_fault_per_node() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "splice")
            .unwrap();

        let second = injector.inject_fault(&mut model, FaultKind::BadSplice, "splice");
        assert!(matches!(second, Err(FaultError::AlreadyFaulted(_))));
        // A different node is still fair game.
        injector
            .inject_fault(&mut model, FaultKind::BadSplice, "outlet")
            .unwrap();
        assert_eq!(injector.fault_count(), 2);
    }

    // -----------------------------------------------------------------------
    // Test 5: Identification demands the exact kind
    // -----------------------------------------------------------------------
    #[test]
    fn identify_requires_exact_kind() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::TrippedGfci, "outlet")
            .unwrap();

        // Close is not correct.
        assert!(!injector.identify_fault("outlet", FaultKind::TrippedBreaker));
        assert!(!injector.fault_at("outlet").unwrap().identified);

        assert!(injector.identify_fault("outlet", FaultKind::TrippedGfci));
        assert!(injector.fault_at("outlet").unwrap().identified);
    }

    // -----------------------------------------------------------------------
    // Test 6: Identifying where nothing is wrong is a quiet false
    // -----------------------------------------------------------------------
    #[test]
    fn identify_without_fault_is_false() {
        let mut injector = FaultInjector::new();
        assert!(!injector.identify_fault("panel", FaultKind::BrokenWire));
        assert!(!injector.identify_fault("attic", FaultKind::BrokenWire));
    }

    // -----------------------------------------------------------------------
    // Test 7: Re-identifying stays true but emits one event
    // -----------------------------------------------------------------------
    #[test]
    fn reidentify_emits_once() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "splice")
            .unwrap();
        injector.drain_events();

        assert!(injector.identify_fault("splice", FaultKind::BrokenWire));
        assert!(injector.identify_fault("splice", FaultKind::BrokenWire));
        assert_eq!(
            injector.drain_events(),
            vec![FaultEvent::Identified {
                node: NodeId::new("splice"),
                kind: FaultKind::BrokenWire,
            }]
        );
    }

    // -----------------------------------------------------------------------
    // Test 8: Repair is gated on identification
    // -----------------------------------------------------------------------
    #[test]
    fn repair_requires_identification() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "splice")
            .unwrap();

        assert!(!injector.repair_fault(&mut model, "splice"));
        assert_eq!(model.state("splice"), Some(NodeState::Open));

        injector.identify_fault("splice", FaultKind::BrokenWire);
        assert!(injector.repair_fault(&mut model, "splice"));
        assert_eq!(model.state("splice"), Some(NodeState::Energized));
        assert_eq!(model.voltage("splice"), 120.0);

        // Already repaired: nothing left to repair.
        assert!(!injector.repair_fault(&mut model, "splice"));
    }

    // -----------------------------------------------------------------------
    // Test 9: Full lifecycle events arrive in order
    // -----------------------------------------------------------------------
    #[test]
    fn lifecycle_events_in_order() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::LooseConnection, "outlet")
            .unwrap();
        injector.identify_fault("outlet", FaultKind::LooseConnection);
        injector.repair_fault(&mut model, "outlet");

        let node = NodeId::new("outlet");
        let kind = FaultKind::LooseConnection;
        assert_eq!(
            injector.drain_events(),
            vec![
                FaultEvent::Injected { node: node.clone(), kind },
                FaultEvent::Identified { node: node.clone(), kind },
                FaultEvent::Repaired { node, kind },
            ]
        );
        assert!(injector.drain_events().is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 10: A broken wire opens the run; repairing it closes it again
    // -----------------------------------------------------------------------
    #[test]
    fn repair_restores_continuity() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        assert!(model.check_continuity("panel", "outlet"));

        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "splice")
            .unwrap();
        assert!(!model.check_continuity("panel", "outlet"));

        assert!(injector.identify_fault("splice", FaultKind::BrokenWire));
        assert!(injector.repair_fault(&mut model, "splice"));
        assert!(model.check_continuity("panel", "outlet"));
    }

    // -----------------------------------------------------------------------
    // Test 11: A repaired node can be faulted again
    // -----------------------------------------------------------------------
    #[test]
    fn repaired_node_faultable_again() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "splice")
            .unwrap();
        injector.identify_fault("splice", FaultKind::BrokenWire);
        injector.repair_fault(&mut model, "splice");

        injector
            .inject_fault(&mut model, FaultKind::BadSplice, "splice")
            .unwrap();
        assert_eq!(injector.fault_count(), 2);
        // fault_at reports the newest plant.
        let newest = injector.fault_at("splice").unwrap();
        assert_eq!(newest.kind, FaultKind::BadSplice);
        assert!(newest.active);
    }

    // -----------------------------------------------------------------------
    // Test 12: all_identified / all_repaired refuse vacuous success
    // -----------------------------------------------------------------------
    #[test]
    fn completion_checks_never_vacuous() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        assert!(!injector.all_identified());
        assert!(!injector.all_repaired());

        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "panel")
            .unwrap();
        injector
            .inject_fault(&mut model, FaultKind::BadSplice, "outlet")
            .unwrap();

        injector.identify_fault("panel", FaultKind::BrokenWire);
        assert!(!injector.all_identified());
        injector.identify_fault("outlet", FaultKind::BadSplice);
        assert!(injector.all_identified());
        assert!(!injector.all_repaired());

        injector.repair_fault(&mut model, "panel");
        injector.repair_fault(&mut model, "outlet");
        assert!(injector.all_repaired());
        assert!(injector.active_faults().is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 13: Random injection is seed-deterministic and skips live faults
    // -----------------------------------------------------------------------
    #[test]
    fn inject_random_deterministic() {
        let run = |seed| {
            let mut model = make_run();
            let mut injector = FaultInjector::new();
            let mut rng = SessionRng::new(seed);
            injector
                .inject_random(&mut model, FaultKind::BrokenWire, &mut rng)
                .unwrap()
        };
        assert_eq!(run(42), run(42));

        let mut model = make_run();
        let mut injector = FaultInjector::new();
        let mut rng = SessionRng::new(42);
        let mut hit = Vec::new();
        for _ in 0..3 {
            hit.push(
                injector
                    .inject_random(&mut model, FaultKind::BrokenWire, &mut rng)
                    .unwrap(),
            );
        }
        // Three nodes, three live faults, all distinct targets.
        hit.sort();
        hit.dedup();
        assert_eq!(hit.len(), 3);

        let exhausted = injector.inject_random(&mut model, FaultKind::BadSplice, &mut rng);
        assert!(matches!(exhausted, Err(FaultError::NoCandidates)));
    }

    // -----------------------------------------------------------------------
    // Test 14: Saved state omits pending events, keeps the fault record
    // -----------------------------------------------------------------------
    #[test]
    fn serde_drops_pending_events() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::OverloadedCircuit, "panel")
            .unwrap();

        let json = serde_json::to_string(&injector).unwrap();
        let mut restored: FaultInjector = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.fault_count(), 1);
        assert_eq!(restored.faults(), injector.faults());
        assert!(restored.drain_events().is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 15: reset clears faults and events
    // -----------------------------------------------------------------------
    #[test]
    fn reset_clears_everything() {
        let mut model = make_run();
        let mut injector = FaultInjector::new();
        injector
            .inject_fault(&mut model, FaultKind::BrokenWire, "splice")
            .unwrap();

        injector.reset();
        assert_eq!(injector.fault_count(), 0);
        assert!(injector.drain_events().is_empty());
        assert!(!injector.all_identified());
    }
}
