//! Room records and lifecycle states.

use crate::ids::{ActorId, ChannelId, ScopeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum accepted room capacity; `0` means unbounded.
pub const MAX_ROOM_CAPACITY: u32 = 99;

/// Lifecycle state of an ephemeral room.
///
/// `Provisioning` and `Draining` bracket the host-platform round trips so
/// that a half-created or half-deleted room is a representable state rather
/// than an inferred race condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    /// Reserved in the registry; host-side creation still in flight.
    Provisioning,
    /// Live and accepting admissions.
    Active,
    /// Emptied; host-side deletion in flight.
    Draining,
    /// Deletion committed or judged unrecoverable; the record is about to
    /// leave the registry and must not be acted upon.
    Destroyed,
}

impl RoomState {
    pub fn is_active(&self) -> bool {
        matches!(self, RoomState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoomState::Destroyed)
    }
}

/// One live ephemeral room and its governance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Host-assigned channel id.
    pub id: ChannelId,

    /// Scope the room lives in.
    pub scope: ScopeId,

    /// Current owner: the creator, or a prior occupant who claimed it.
    pub owner: ActorId,

    /// Maximum occupancy; `0` means unbounded.
    pub capacity: u32,

    /// When locked, default join permission is denied.
    pub locked: bool,

    /// Actors explicitly denied entry regardless of lock state.
    pub blacklist: HashSet<ActorId>,

    /// Observed occupancy, refreshed from live host state on every event
    /// touching this room. Never derived by counting events.
    pub member_count: u32,

    /// Lifecycle state.
    pub state: RoomState,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRecord {
    /// Create a record for a freshly host-created room.
    pub fn new(id: ChannelId, scope: ScopeId, owner: ActorId, capacity: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            scope,
            owner,
            capacity,
            locked: false,
            blacklist: HashSet::new(),
            member_count: 0,
            state: RoomState::Provisioning,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owner(&self, actor: ActorId) -> bool {
        self.owner == actor
    }

    pub fn is_blacklisted(&self, actor: ActorId) -> bool {
        self.blacklist.contains(&actor)
    }

    /// Whether the room is full for non-privileged joiners.
    pub fn at_capacity(&self) -> bool {
        self.capacity > 0 && self.member_count >= self.capacity
    }

    /// Bump the updated timestamp after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RoomRecord {
        RoomRecord::new(
            ChannelId::new(10),
            ScopeId::new(1),
            ActorId::new(100),
            5,
        )
    }

    #[test]
    fn test_new_record_starts_provisioning() {
        let r = record();
        assert_eq!(r.state, RoomState::Provisioning);
        assert!(!r.state.is_active());
        assert_eq!(r.member_count, 0);
        assert!(!r.locked);
    }

    #[test]
    fn test_at_capacity() {
        let mut r = record();
        r.member_count = 4;
        assert!(!r.at_capacity());
        r.member_count = 5;
        assert!(r.at_capacity());

        // 0 means unbounded
        r.capacity = 0;
        r.member_count = 500;
        assert!(!r.at_capacity());
    }

    #[test]
    fn test_blacklist_membership() {
        let mut r = record();
        let actor = ActorId::new(7);
        assert!(!r.is_blacklisted(actor));
        r.blacklist.insert(actor);
        assert!(r.is_blacklisted(actor));
    }

    #[test]
    fn test_destroyed_is_terminal() {
        assert!(RoomState::Destroyed.is_terminal());
        assert!(!RoomState::Draining.is_terminal());
    }
}
