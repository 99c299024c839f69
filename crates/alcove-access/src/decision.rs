//! Join verdicts and denial reasons.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a join evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinVerdict {
    /// The actor may enter (or remain in) the room.
    Allow,
    /// The actor must be kept out, with the winning reason.
    Deny(DenyReason),
}

impl JoinVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, JoinVerdict::Allow)
    }
}

/// Why a join was denied.
///
/// Variants are listed in evaluation order: a blacklisted actor is reported
/// as `Blacklisted` even when the room is also locked and full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// Actor is on the room blacklist or the global denylist.
    Blacklisted,
    /// Room is locked and the actor is neither owner nor administrator.
    Locked,
    /// Room is at its capacity limit and the actor is not an administrator.
    CapacityExceeded,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Blacklisted => write!(f, "blacklisted"),
            DenyReason::Locked => write!(f, "locked"),
            DenyReason::CapacityExceeded => write!(f, "capacity exceeded"),
        }
    }
}
