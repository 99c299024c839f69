//! The authoritative room store and owner index.
//!
//! One `RoomRegistry` per engine. Records are only ever read and mutated
//! through this type; no other component holds a record across an await
//! point. `mutate` is linearizable per key because DashMap hands out an
//! exclusive shard lock for the entry, and no registry method acquires a
//! second entry while holding one.
//!
//! The owner index is two-phase. `reserve_owner` occupies the owner's slot
//! before the host-side create round trip begins; the returned RAII guard
//! releases the slot on drop unless the caller commits a record into it.
//! Two racing provision attempts for the same owner therefore cannot both
//! create a room: the second reservation fails `OwnerAlreadyBound` while
//! the first is still in flight.

use crate::error::{RegistryError, Result};
use alcove_types::{ActorId, ChannelId, RoomRecord, ScopeId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// State of one owner's slot in the secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnerSlot {
    /// Provisioning in flight; no record exists yet.
    Reserved,
    /// The owner's live room.
    Bound(ChannelId),
}

/// Authoritative in-memory store of live rooms.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<ChannelId, RoomRecord>,
    owners: DashMap<ActorId, OwnerSlot>,
}

/// RAII guard for an owner slot taken before the host create round trip.
///
/// Dropping the guard without committing releases the slot, so a failed
/// host call can never leave a pending reservation behind.
#[must_use = "an uncommitted reservation releases the owner slot on drop"]
#[derive(Debug)]
pub struct OwnerReservation<'a> {
    registry: &'a RoomRegistry,
    owner: ActorId,
    committed: bool,
}

impl<'a> OwnerReservation<'a> {
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    /// Insert the record and bind the owner slot to it.
    pub fn commit(mut self, record: RoomRecord) {
        debug_assert_eq!(record.owner, self.owner);
        let id = record.id;
        self.registry.rooms.insert(id, record);
        self.registry.owners.insert(self.owner, OwnerSlot::Bound(id));
        self.committed = true;
    }
}

impl Drop for OwnerReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.registry
                .owners
                .remove_if(&self.owner, |_, slot| *slot == OwnerSlot::Reserved);
            debug!(owner = %self.owner, "released uncommitted owner reservation");
        }
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Occupy the owner's index slot ahead of provisioning.
    pub fn reserve_owner(&self, owner: ActorId) -> Result<OwnerReservation<'_>> {
        match self.owners.entry(owner) {
            Entry::Occupied(_) => Err(RegistryError::OwnerAlreadyBound(owner)),
            Entry::Vacant(slot) => {
                slot.insert(OwnerSlot::Reserved);
                Ok(OwnerReservation {
                    registry: self,
                    owner,
                    committed: false,
                })
            }
        }
    }

    /// Snapshot of a record by id.
    pub fn get(&self, id: ChannelId) -> Option<RoomRecord> {
        self.rooms.get(&id).map(|r| r.clone())
    }

    /// Snapshot of the room currently bound to `owner`, if any.
    pub fn get_by_owner(&self, owner: ActorId) -> Option<RoomRecord> {
        // Copy the id out before touching the rooms map so no two shard
        // locks are ever held at once.
        let id = match self.owners.get(&owner).map(|slot| *slot) {
            Some(OwnerSlot::Bound(id)) => id,
            _ => return None,
        };
        self.get(id)
    }

    /// Atomic read-modify-write on the record under `id`.
    ///
    /// Returns the updated snapshot. Fails `NotFound` when absent and
    /// `Conflict` when the record was already destroyed, which callers
    /// treat as a stale event.
    pub fn mutate<F>(&self, id: ChannelId, f: F) -> Result<RoomRecord>
    where
        F: FnOnce(&mut RoomRecord),
    {
        match self.rooms.get_mut(&id) {
            None => Err(RegistryError::NotFound(id)),
            Some(mut record) => {
                if record.state.is_terminal() {
                    return Err(RegistryError::Conflict(id));
                }
                f(&mut record);
                record.touch();
                Ok(record.clone())
            }
        }
    }

    /// Reassign ownership of a room, updating both index entries.
    ///
    /// The old owner's binding is removed only if it still points at this
    /// room, so a claim can never clobber an unrelated binding.
    pub fn rebind_owner(&self, id: ChannelId, new_owner: ActorId) -> Result<RoomRecord> {
        let (old_owner, updated) = match self.rooms.get_mut(&id) {
            None => return Err(RegistryError::NotFound(id)),
            Some(mut record) => {
                if record.state.is_terminal() {
                    return Err(RegistryError::Conflict(id));
                }
                let old_owner = record.owner;
                record.owner = new_owner;
                record.touch();
                (old_owner, record.clone())
            }
        };

        self.owners
            .remove_if(&old_owner, |_, slot| *slot == OwnerSlot::Bound(id));
        self.owners.insert(new_owner, OwnerSlot::Bound(id));
        Ok(updated)
    }

    /// Delete a record and every index entry pointing at it. Idempotent.
    pub fn remove(&self, id: ChannelId) {
        self.rooms.remove(&id);
        self.owners.retain(|_, slot| *slot != OwnerSlot::Bound(id));
    }

    /// Ids of all rooms tracked in a scope.
    pub fn ids_in_scope(&self, scope: ScopeId) -> Vec<ChannelId> {
        self.rooms
            .iter()
            .filter(|r| r.scope == scope)
            .map(|r| r.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alcove_types::RoomState;

    const SCOPE: ScopeId = ScopeId::new(1);
    const OWNER: ActorId = ActorId::new(100);
    const ROOM: ChannelId = ChannelId::new(10);

    fn registry_with_room() -> RoomRegistry {
        let registry = RoomRegistry::new();
        let reservation = registry.reserve_owner(OWNER).unwrap();
        let mut record = RoomRecord::new(ROOM, SCOPE, OWNER, 5);
        record.state = RoomState::Active;
        reservation.commit(record);
        registry
    }

    #[test]
    fn test_reserve_commit_and_lookup() {
        let registry = registry_with_room();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ROOM).unwrap().owner, OWNER);
        assert_eq!(registry.get_by_owner(OWNER).unwrap().id, ROOM);
    }

    #[test]
    fn test_second_reservation_fails_while_first_pending() {
        let registry = RoomRegistry::new();
        let first = registry.reserve_owner(OWNER).unwrap();
        assert_eq!(
            registry.reserve_owner(OWNER).unwrap_err(),
            RegistryError::OwnerAlreadyBound(OWNER)
        );
        drop(first);
        // Released on drop without a commit.
        assert!(registry.reserve_owner(OWNER).is_ok());
    }

    #[test]
    fn test_reservation_blocks_after_commit() {
        let registry = registry_with_room();
        assert_eq!(
            registry.reserve_owner(OWNER).unwrap_err(),
            RegistryError::OwnerAlreadyBound(OWNER)
        );
    }

    #[test]
    fn test_mutate_missing_and_destroyed() {
        let registry = registry_with_room();
        assert_eq!(
            registry.mutate(ChannelId::new(999), |_| {}).unwrap_err(),
            RegistryError::NotFound(ChannelId::new(999))
        );

        registry.mutate(ROOM, |r| r.state = RoomState::Destroyed).unwrap();
        assert_eq!(
            registry.mutate(ROOM, |r| r.member_count = 3).unwrap_err(),
            RegistryError::Conflict(ROOM)
        );
    }

    #[test]
    fn test_mutate_returns_updated_snapshot() {
        let registry = registry_with_room();
        let updated = registry.mutate(ROOM, |r| r.locked = true).unwrap();
        assert!(updated.locked);
        assert!(registry.get(ROOM).unwrap().locked);
    }

    #[test]
    fn test_remove_is_idempotent_and_clears_index() {
        let registry = registry_with_room();
        registry.remove(ROOM);
        registry.remove(ROOM);
        assert!(registry.is_empty());
        assert!(registry.get_by_owner(OWNER).is_none());
        // The owner can provision again.
        assert!(registry.reserve_owner(OWNER).is_ok());
    }

    #[test]
    fn test_rebind_owner_moves_both_index_entries() {
        let registry = registry_with_room();
        let claimant = ActorId::new(200);

        let updated = registry.rebind_owner(ROOM, claimant).unwrap();
        assert_eq!(updated.owner, claimant);
        assert!(registry.get_by_owner(OWNER).is_none());
        assert_eq!(registry.get_by_owner(claimant).unwrap().id, ROOM);
    }

    #[test]
    fn test_rebind_destroyed_room_conflicts() {
        let registry = registry_with_room();
        registry.mutate(ROOM, |r| r.state = RoomState::Destroyed).unwrap();
        assert_eq!(
            registry.rebind_owner(ROOM, ActorId::new(200)).unwrap_err(),
            RegistryError::Conflict(ROOM)
        );
    }

    #[test]
    fn test_ids_in_scope_filters() {
        let registry = registry_with_room();
        let other_owner = ActorId::new(300);
        let reservation = registry.reserve_owner(other_owner).unwrap();
        reservation.commit(RoomRecord::new(
            ChannelId::new(20),
            ScopeId::new(2),
            other_owner,
            0,
        ));

        assert_eq!(registry.ids_in_scope(SCOPE), vec![ROOM]);
        assert_eq!(registry.ids_in_scope(ScopeId::new(2)), vec![ChannelId::new(20)]);
        assert!(registry.ids_in_scope(ScopeId::new(3)).is_empty());
    }

    #[test]
    fn test_concurrent_mutations_all_apply() {
        let registry = std::sync::Arc::new(registry_with_room());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        registry.mutate(ROOM, |r| r.member_count += 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.get(ROOM).unwrap().member_count, 800);
    }
}
