//! Property tests: the join precedence rules hold for every room shape.

use alcove_access::{can_administer, evaluate_join, validate_capacity, DenyReason, JoinVerdict};
use alcove_types::{ActorId, ChannelId, RoomRecord, RoomState, ScopeId};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Generate a room with arbitrary governance settings. The owner is always
/// actor 1; other actors are drawn from a small range so collisions with the
/// blacklist actually happen.
fn arb_record() -> impl Strategy<Value = RoomRecord> {
    (
        0u32..10,
        any::<bool>(),
        prop::collection::hash_set(1u64..20, 0..8),
        0u32..15,
    )
        .prop_map(|(capacity, locked, blacklist, member_count)| {
            let mut r = RoomRecord::new(
                ChannelId::new(100),
                ScopeId::new(1),
                ActorId::new(1),
                capacity,
            );
            r.state = RoomState::Active;
            r.locked = locked;
            r.blacklist = blacklist.into_iter().map(ActorId::new).collect();
            r.member_count = member_count;
            r
        })
}

fn arb_actor() -> impl Strategy<Value = ActorId> {
    (1u64..20).prop_map(ActorId::new)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// A blacklisted actor is denied no matter what else is true of the
    /// room or the actor, administrator status included.
    #[test]
    fn blacklist_always_wins(record in arb_record(), actor in arb_actor(), is_admin: bool) {
        let mut record = record;
        record.blacklist.insert(actor);
        prop_assert_eq!(
            evaluate_join(&record, actor, is_admin, false),
            JoinVerdict::Deny(DenyReason::Blacklisted)
        );
    }

    /// Global denylist membership is indistinguishable from a room
    /// blacklist at the verdict level.
    #[test]
    fn global_denylist_always_wins(record in arb_record(), actor in arb_actor(), is_admin: bool) {
        prop_assert_eq!(
            evaluate_join(&record, actor, is_admin, true),
            JoinVerdict::Deny(DenyReason::Blacklisted)
        );
    }

    /// An administrator who is not blacklisted is always admitted: lock and
    /// capacity never deny admins.
    #[test]
    fn admins_bypass_lock_and_capacity(record in arb_record(), actor in arb_actor()) {
        let mut record = record;
        record.blacklist.remove(&actor);
        prop_assert_eq!(evaluate_join(&record, actor, true, false), JoinVerdict::Allow);
    }

    /// The owner is never kept out of their own room by lock or capacity.
    #[test]
    fn owner_bypasses_lock_and_capacity(record in arb_record()) {
        let mut record = record;
        let owner = record.owner;
        record.blacklist.remove(&owner);
        prop_assert_eq!(evaluate_join(&record, owner, false, false), JoinVerdict::Allow);
    }

    /// A plain guest is denied exactly when the room is locked or full, and
    /// the reported reason respects lock-before-capacity precedence.
    #[test]
    fn guest_verdict_matches_room_shape(record in arb_record(), actor in arb_actor()) {
        let mut record = record;
        record.blacklist.remove(&actor);
        prop_assume!(!record.is_owner(actor));

        let expected = if record.locked {
            JoinVerdict::Deny(DenyReason::Locked)
        } else if record.at_capacity() {
            JoinVerdict::Deny(DenyReason::CapacityExceeded)
        } else {
            JoinVerdict::Allow
        };
        prop_assert_eq!(evaluate_join(&record, actor, false, false), expected);
    }

    /// Administer rights are exactly owner-or-admin.
    #[test]
    fn administer_is_owner_or_admin(record in arb_record(), actor in arb_actor(), is_admin: bool) {
        prop_assert_eq!(
            can_administer(&record, actor, is_admin),
            record.is_owner(actor) || is_admin
        );
    }

    /// Capacity validation accepts exactly the range [0, 99] and echoes the
    /// value back unchanged.
    #[test]
    fn capacity_validation_is_the_range_check(n in -1000i64..1000) {
        match validate_capacity(n) {
            Ok(v) => {
                prop_assert!((0..=99).contains(&n));
                prop_assert_eq!(v as i64, n);
            }
            Err(_) => prop_assert!(!(0..=99).contains(&n)),
        }
    }
}
