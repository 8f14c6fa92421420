//! Identifier newtypes shared across the workspace.
//!
//! Circuit nodes are named by their hosts ("panel", "kitchen-outlet-2"), so
//! [`NodeId`] wraps a caller-supplied string instead of a generated key, and
//! the same vocabulary keys the fault-state model. Edges have no natural
//! name and churn as wiring changes, so [`EdgeId`] is a slotmap key that
//! stays valid across unrelated removals.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

// ---------------------------------------------------------------------------
// String-keyed identifiers
// ---------------------------------------------------------------------------

/// Identifies a node in a circuit graph or fault-state model.
///
/// Caller-supplied and unique per graph. Implements `Borrow<str>` so maps
/// keyed by `NodeId` answer plain `&str` lookups without allocating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to a host-side device (a breaker handle, a switch, a
/// GFCI reset button). The engine never inspects it; it only hands it back
/// to the [`DeviceStateProvider`](crate::device::DeviceStateProvider).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Slotmap keys
// ---------------------------------------------------------------------------

new_key_type! {
    /// Key for edges in a [`CircuitGraph`](crate::graph::CircuitGraph).
    pub struct EdgeId;
}
