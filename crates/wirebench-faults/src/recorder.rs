//! Audit trail of the trainee's diagnostic work.
//!
//! Hosts log every probe as a [`DiagnosticStep`] and route identification
//! guesses through [`DiagnosticRecorder::attempt_identification`], which
//! also latches the first correct call for scoring. The engine keeps no
//! clock; timestamps are whatever tick or wall time the host supplies.

use serde::{Deserialize, Serialize};

use wirebench_core::id::NodeId;

use crate::injector::{FaultInjector, FaultKind};

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// One recorded action: what was done, where, and what it read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticStep {
    pub action: String,
    pub target: NodeId,
    pub reading: String,
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// DiagnosticRecorder
// ---------------------------------------------------------------------------

/// Append-only log of diagnostic steps plus the identification latch.
///
/// Steps are never edited or removed once recorded; a trainee's wrong turns
/// stay in the trail. Only [`reset`](Self::reset) clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticRecorder {
    steps: Vec<DiagnosticStep>,
    /// First correct identification, kept even if later guesses also land.
    identified: Option<(NodeId, FaultKind)>,
}

impl DiagnosticRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step to the trail.
    pub fn record_step(
        &mut self,
        action: impl Into<String>,
        target: impl Into<NodeId>,
        reading: impl Into<String>,
        timestamp: u64,
    ) {
        self.steps.push(DiagnosticStep {
            action: action.into(),
            target: target.into(),
            reading: reading.into(),
            timestamp,
        });
    }

    /// Steps in the order they were recorded.
    pub fn steps(&self) -> &[DiagnosticStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Route a guess through the injector and latch the first success.
    ///
    /// Returns whatever [`FaultInjector::identify_fault`] returns. The latch
    /// records only the first winning (target, kind) pair; a later correct
    /// guess against some other fault does not overwrite it.
    pub fn attempt_identification(
        &mut self,
        injector: &mut FaultInjector,
        target: &str,
        guess: FaultKind,
    ) -> bool {
        let correct = injector.identify_fault(target, guess);
        if correct && self.identified.is_none() {
            self.identified = Some((NodeId::new(target), guess));
        }
        correct
    }

    /// True once any identification attempt has succeeded.
    pub fn fault_correctly_identified(&self) -> bool {
        self.identified.is_some()
    }

    /// The first correctly identified fault, if any.
    pub fn identified_fault(&self) -> Option<(&NodeId, FaultKind)> {
        self.identified.as_ref().map(|(node, kind)| (node, *kind))
    }

    /// Clear the trail and the latch.
    pub fn reset(&mut self) {
        self.steps.clear();
        self.identified = None;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
