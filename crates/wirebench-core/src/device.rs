//! Device state: the seam between the engine and host hardware models.
//!
//! Gating nodes (breakers, switches, GFCIs) carry an opaque
//! [`DeviceId`](crate::id::DeviceId). During propagation the engine asks a
//! [`DeviceStateProvider`] capability questions about those ids and nothing
//! else, so hosts keep whatever device representation they already have.
//! [`DeviceDirectory`] is the in-memory implementation for hosts without
//! their own device layer, and for tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

// ---------------------------------------------------------------------------
// Device states
// ---------------------------------------------------------------------------

/// Breaker handle position. `Off` and `Tripped` both interrupt the circuit;
/// they differ only for host presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakerState {
    On,
    Off,
    Tripped,
}

/// Wall switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchState {
    On,
    Off,
}

/// GFCI receptacle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GfciState {
    Normal,
    Tripped,
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// Read-only capability queries the propagator asks about gating devices.
///
/// Answers must be stable for the duration of one propagation sweep.
/// Unknown ids should take the permissive defaults (power flows), matching
/// the behavior of nodes with no device attached at all.
pub trait DeviceStateProvider {
    /// Whether the breaker is on (neither switched off nor tripped).
    fn is_breaker_on(&self, device: &DeviceId) -> bool;
    /// Whether the switch is closed.
    fn is_switch_on(&self, device: &DeviceId) -> bool;
    /// Whether the GFCI has tripped.
    fn is_gfci_tripped(&self, device: &DeviceId) -> bool;
}

// ---------------------------------------------------------------------------
// DeviceDirectory
// ---------------------------------------------------------------------------

/// In-memory device registry.
///
/// Hosts that model devices elsewhere implement [`DeviceStateProvider`] on
/// their own types; everyone else registers states here. Devices never
/// registered answer with the permissive defaults: breakers and switches
/// read as on, GFCIs as untripped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceDirectory {
    breakers: HashMap<DeviceId, BreakerState>,
    switches: HashMap<DeviceId, SwitchState>,
    gfcis: HashMap<DeviceId, GfciState>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // -- breakers -------------------------------------------------------------

    pub fn set_breaker(&mut self, device: impl Into<DeviceId>, state: BreakerState) {
        self.breakers.insert(device.into(), state);
    }

    /// Record an overload trip. The engine never trips breakers itself;
    /// hosts decide when that happens.
    pub fn trip_breaker(&mut self, device: impl Into<DeviceId>) {
        self.set_breaker(device, BreakerState::Tripped);
    }

    pub fn reset_breaker(&mut self, device: impl Into<DeviceId>) {
        self.set_breaker(device, BreakerState::On);
    }

    pub fn breaker(&self, device: &str) -> Option<BreakerState> {
        self.breakers.get(device).copied()
    }

    // -- switches -------------------------------------------------------------

    pub fn set_switch(&mut self, device: impl Into<DeviceId>, state: SwitchState) {
        self.switches.insert(device.into(), state);
    }

    /// Flip a switch. Unregistered switches count as on, so the first
    /// toggle turns them off.
    pub fn toggle_switch(&mut self, device: impl Into<DeviceId>) {
        let device = device.into();
        let next = match self.switches.get(&device) {
            None | Some(SwitchState::On) => SwitchState::Off,
            Some(SwitchState::Off) => SwitchState::On,
        };
        self.switches.insert(device, next);
    }

    pub fn switch(&self, device: &str) -> Option<SwitchState> {
        self.switches.get(device).copied()
    }

    // -- GFCIs ----------------------------------------------------------------

    pub fn set_gfci(&mut self, device: impl Into<DeviceId>, state: GfciState) {
        self.gfcis.insert(device.into(), state);
    }

    pub fn trip_gfci(&mut self, device: impl Into<DeviceId>) {
        self.set_gfci(device, GfciState::Tripped);
    }

    pub fn reset_gfci(&mut self, device: impl Into<DeviceId>) {
        self.set_gfci(device, GfciState::Normal);
    }

    pub fn gfci(&self, device: &str) -> Option<GfciState> {
        self.gfcis.get(device).copied()
    }
}

impl DeviceStateProvider for DeviceDirectory {
    fn is_breaker_on(&self, device: &DeviceId) -> bool {
        matches!(self.breakers.get(device), None | Some(BreakerState::On))
    }

    fn is_switch_on(&self, device: &DeviceId) -> bool {
        matches!(self.switches.get(device), None | Some(SwitchState::On))
    }

    fn is_gfci_tripped(&self, device: &DeviceId) -> bool {
        matches!(self.gfcis.get(device), Some(GfciState::Tripped))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
