//! The ordered join/administer decision rules.
//!
//! Everything here is pure: rules consume a [`RoomRecord`] snapshot plus
//! facts the caller already fetched (admin status, global denylist
//! membership) and return a verdict. The precedence between the checks is
//! fixed in one place so call sites cannot disagree about it:
//!
//! 1. `Blacklisted` — room blacklist or global denylist; nobody bypasses
//!    this, administrators included. A blacklist is a deliberate exclusion
//!    by the owner, and an admin who wants back in must be unblacklisted,
//!    not let through.
//! 2. `Locked` — owner and administrators bypass.
//! 3. `CapacityExceeded` — administrators bypass. The owner is exempt from
//!    their own limit: capacity counts non-owner guests, so the snapshot's
//!    `member_count` must already exclude the owner and the joining actor.

use crate::decision::{DenyReason, JoinVerdict};
use crate::error::CapacityError;
use alcove_types::{ActorId, RoomRecord, MAX_ROOM_CAPACITY};

/// Decide whether `actor` may join (or remain in) the room.
///
/// `globally_denied` is the actor's membership in the global denylist;
/// `is_admin` their administrator capability in the room's scope.
pub fn evaluate_join(
    record: &RoomRecord,
    actor: ActorId,
    is_admin: bool,
    globally_denied: bool,
) -> JoinVerdict {
    if record.is_blacklisted(actor) || globally_denied {
        return JoinVerdict::Deny(DenyReason::Blacklisted);
    }

    let is_owner = record.is_owner(actor);

    if record.locked && !is_owner && !is_admin {
        return JoinVerdict::Deny(DenyReason::Locked);
    }

    if record.at_capacity() && !is_owner && !is_admin {
        return JoinVerdict::Deny(DenyReason::CapacityExceeded);
    }

    JoinVerdict::Allow
}

/// Whether `actor` may run owner commands against the room.
pub fn can_administer(record: &RoomRecord, actor: ActorId, is_admin: bool) -> bool {
    record.is_owner(actor) || is_admin
}

/// Validate a user-supplied capacity value.
///
/// Accepts `[0, 99]`; `0` means unbounded.
pub fn validate_capacity(n: i64) -> Result<u32, CapacityError> {
    if (0..=MAX_ROOM_CAPACITY as i64).contains(&n) {
        Ok(n as u32)
    } else {
        Err(CapacityError::OutOfRange {
            given: n,
            max: MAX_ROOM_CAPACITY,
        })
    }
}
