//! The room lifecycle engine.
//!
//! One `RoomLifecycle` per process, shared by every scope worker. All
//! methods take `&self`; the per-scope serialization the state machine
//! depends on is the dispatcher's job, not this type's. Within one scope a
//! presence event is fully applied (registry mutation, access decision,
//! relocation side effects) before the next job starts, so the only
//! suspension points that matter are the host round trips, and the
//! registry always reads `Provisioning`/`Draining` before a round trip and
//! `Active`/removed after it.

use crate::command::{CommandAck, CommandRejected, RoomCommand};
use crate::config::LifecycleConfig;
use alcove_access::{can_administer, evaluate_join, validate_capacity, JoinVerdict};
use alcove_platform::{HostError, HostPlatform};
use alcove_registry::{RegistryError, RoomRegistry};
use alcove_types::{
    ActorId, ChannelId, EventSeverity, PresenceTransition, RoomEvent, RoomEventEnvelope,
    RoomRecord, RoomState, ScopeBinding, ScopeId,
};
use dashmap::DashSet;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The provision/admit/claim/drain state machine.
pub struct RoomLifecycle {
    host: Arc<dyn HostPlatform>,
    registry: Arc<RoomRegistry>,
    bindings: HashMap<ScopeId, ScopeBinding>,
    config: LifecycleConfig,
    denylist: DashSet<ActorId>,
    events: broadcast::Sender<RoomEventEnvelope>,
}

impl RoomLifecycle {
    pub fn new(
        host: Arc<dyn HostPlatform>,
        registry: Arc<RoomRegistry>,
        bindings: Vec<ScopeBinding>,
        config: LifecycleConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            host,
            registry,
            bindings: bindings.into_iter().map(|b| (b.scope, b)).collect(),
            config,
            denylist: DashSet::new(),
            events,
        }
    }

    /// Subscribe to the observability stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEventEnvelope> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn is_globally_denied(&self, actor: ActorId) -> bool {
        self.denylist.contains(&actor)
    }

    fn emit(&self, scope: ScopeId, severity: EventSeverity, event: RoomEvent) {
        // Nobody listening is fine.
        let _ = self
            .events
            .send(RoomEventEnvelope::new(scope, severity, event));
    }

    // ── Presence transitions ─────────────────────────────────────────

    /// Provision check: actor landed in the scope's trigger channel.
    ///
    /// Returns whether the event was a trigger join, handled or rejected.
    pub async fn maybe_provision(&self, transition: &PresenceTransition) -> bool {
        let scope = transition.scope;
        let actor = transition.actor;
        let Some(binding) = self.bindings.get(&scope) else {
            return false;
        };
        let is_trigger = transition
            .new
            .is_some_and(|channel| binding.is_trigger(channel));
        if !is_trigger {
            return false;
        }

        // Reject-fast: a denied actor's room must never exist, even
        // momentarily, so they are moved out before anything is created.
        if self.denylist.contains(&actor) {
            let _ = self.host.relocate_actor(scope, actor, None).await;
            info!(%scope, %actor, "denylisted actor rejected at trigger");
            self.emit(
                scope,
                EventSeverity::Warning,
                RoomEvent::ProvisionRejected {
                    actor,
                    reason: "globally denied".to_string(),
                },
            );
            return true;
        }

        // An owner re-entering the trigger gets their existing room back
        // instead of a second one.
        if let Some(existing) = self.registry.get_by_owner(actor) {
            if existing.scope == scope && existing.state.is_active() {
                let _ = self
                    .host
                    .relocate_actor(scope, actor, Some(existing.id))
                    .await;
                self.refresh_occupancy(existing.id).await;
                debug!(%actor, room = %existing.id, "relocated owner into existing room");
            } else {
                let _ = self.host.relocate_actor(scope, actor, None).await;
                self.emit(
                    scope,
                    EventSeverity::Warning,
                    RoomEvent::ProvisionRejected {
                        actor,
                        reason: "owner already bound elsewhere".to_string(),
                    },
                );
            }
            return true;
        }

        match self
            .provision_room(scope, actor, *binding, None, self.config.default_capacity)
            .await
        {
            Ok(room) => {
                // A failed move here is survivable: the room sits empty and
                // the next reconcile or leave event cleans it up.
                if let Err(err) = self.host.relocate_actor(scope, actor, Some(room)).await {
                    warn!(%actor, %room, error = %err, "owner relocation failed after create");
                } else {
                    self.refresh_occupancy(room).await;
                }
                self.emit(
                    scope,
                    EventSeverity::Info,
                    RoomEvent::RoomProvisioned { room, owner: actor },
                );
            }
            Err(reason) => {
                self.emit(
                    scope,
                    EventSeverity::Warning,
                    RoomEvent::ProvisionRejected { actor, reason },
                );
            }
        }
        true
    }

    /// Reserve the owner slot, run the host create, commit the record, and
    /// flip it `Active`. On any failure the reservation drops and releases
    /// the slot; no partial record is left behind.
    async fn provision_room(
        &self,
        scope: ScopeId,
        owner: ActorId,
        binding: ScopeBinding,
        name: Option<String>,
        capacity: u32,
    ) -> Result<ChannelId, String> {
        let reservation = match self.registry.reserve_owner(owner) {
            Ok(r) => r,
            Err(err) => return Err(err.to_string()),
        };

        let name = match name {
            Some(n) => n,
            None => match self.host.display_name(scope, owner).await {
                Ok(display) => format!("{display}'s room"),
                Err(_) => format!("room-{}", owner.as_u64()),
            },
        };

        let id = self
            .host
            .create_sub_channel(scope, owner, binding.container_channel, &name, capacity)
            .await
            .map_err(|err| {
                warn!(%owner, error = %err, "host create failed");
                err.to_string()
            })?;

        reservation.commit(RoomRecord::new(id, scope, owner, capacity));
        // The commit wrote `Provisioning`; the room is fully usable now.
        let _ = self.registry.mutate(id, |r| r.state = RoomState::Active);
        info!(%scope, %owner, room = %id, "room provisioned");
        Ok(id)
    }

    /// Admit check: actor landed in a tracked room.
    pub async fn maybe_admit(&self, transition: &PresenceTransition) {
        let scope = transition.scope;
        let actor = transition.actor;
        let Some(room) = transition.new else { return };
        let Some(record) = self.registry.get(room) else {
            return;
        };
        if !record.state.is_active() {
            return;
        }

        let is_admin = self
            .host
            .is_administrator(scope, actor)
            .await
            .unwrap_or(false);

        // Occupancy is re-read from the host, never derived from a counter.
        // The joining actor is already inside by the time the event arrives,
        // and the owner is exempt from their own limit, so the count fed to
        // the capacity rule excludes both.
        let live = match self.host.live_members(room).await {
            Ok(members) => members,
            Err(err) => {
                debug!(%room, error = %err, "occupancy read failed; admit skipped");
                return;
            }
        };
        let owner = record.owner;
        let mut snapshot = record;
        snapshot.member_count = live
            .iter()
            .filter(|m| **m != actor && **m != owner)
            .count() as u32;

        match evaluate_join(&snapshot, actor, is_admin, self.denylist.contains(&actor)) {
            JoinVerdict::Allow => {
                let member_count = live.len() as u32;
                match self.registry.mutate(room, |r| r.member_count = member_count) {
                    Ok(_) => {
                        self.emit(
                            scope,
                            EventSeverity::Info,
                            RoomEvent::AdmitAllowed {
                                room,
                                actor,
                                member_count,
                            },
                        );
                    }
                    Err(RegistryError::Conflict(_)) | Err(RegistryError::NotFound(_)) => {
                        debug!(%room, %actor, "admit raced a destroyed room; dropped");
                    }
                    Err(err) => debug!(%room, error = %err, "admit bookkeeping failed"),
                }
            }
            JoinVerdict::Deny(reason) => {
                let _ = self.host.relocate_actor(scope, actor, None).await;
                info!(%room, %actor, %reason, "admit denied");
                self.emit(
                    scope,
                    EventSeverity::Info,
                    RoomEvent::AdmitDenied {
                        room,
                        actor,
                        reason: reason.to_string(),
                    },
                );
            }
        }
    }

    /// Drain check: actor's previous location was a tracked room.
    pub async fn maybe_drain(&self, transition: &PresenceTransition) {
        let Some(room) = transition.previous else { return };
        let Some(record) = self.registry.get(room) else {
            return;
        };
        if !record.state.is_active() {
            return;
        }

        match self.host.live_members(room).await {
            Ok(members) if members.is_empty() => {
                self.destroy_room(transition.scope, room).await;
            }
            Ok(members) => {
                let count = members.len() as u32;
                let _ = self.registry.mutate(room, |r| r.member_count = count);
            }
            Err(HostError::ChannelNotFound(_)) => {
                // Deleted out from under us on the platform side.
                self.registry.remove(room);
                self.emit(
                    transition.scope,
                    EventSeverity::Info,
                    RoomEvent::RoomDestroyed { room },
                );
            }
            Err(err) => {
                debug!(%room, error = %err, "occupancy read failed; drain deferred");
            }
        }
    }

    /// Mark the room `Draining`, delete it host-side with bounded retries,
    /// and drop it from the registry. When retries run out the entry is
    /// force-removed anyway: a leaked channel beats an unreclaimable
    /// registry entry, and the discrepancy is reported, not hidden.
    async fn destroy_room(&self, scope: ScopeId, room: ChannelId) {
        if self.registry.mutate(room, |r| r.state = RoomState::Draining).is_err() {
            // Already draining or gone; another path got here first.
            return;
        }

        let policy = self.config.delete_retry;
        let mut attempt = 1;
        loop {
            match self.host.delete_channel(room).await {
                Ok(()) | Err(HostError::ChannelNotFound(_)) => {
                    let _ = self.registry.mutate(room, |r| r.state = RoomState::Destroyed);
                    self.registry.remove(room);
                    info!(%scope, %room, "room destroyed");
                    self.emit(scope, EventSeverity::Info, RoomEvent::RoomDestroyed { room });
                    return;
                }
                Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                    debug!(%room, attempt, error = %err, "delete failed; retrying");
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(%room, attempts = attempt, error = %err,
                        "delete retries exhausted; force-removing registry entry");
                    let _ = self.registry.mutate(room, |r| r.state = RoomState::Destroyed);
                    self.registry.remove(room);
                    self.emit(
                        scope,
                        EventSeverity::Error,
                        RoomEvent::RoomLeaked {
                            room,
                            attempts: attempt,
                        },
                    );
                    return;
                }
            }
        }
    }

    async fn refresh_occupancy(&self, room: ChannelId) {
        if let Ok(members) = self.host.live_members(room).await {
            let count = members.len() as u32;
            let _ = self.registry.mutate(room, |r| r.member_count = count);
        }
    }

    // ── Reconnect reconciliation ─────────────────────────────────────

    /// Rebuild the scope's registry slice against the live platform state.
    ///
    /// Runs after a reconnect: the in-memory registry has no persistent
    /// backing, so channels the host no longer knows are pruned and rooms
    /// that emptied while disconnected are destroyed.
    pub async fn reconcile(&self, scope: ScopeId) {
        let live_channels = match self.host.list_channels(scope).await {
            Ok(channels) => channels,
            Err(err) => {
                warn!(%scope, error = %err, "channel listing failed; reconcile skipped");
                return;
            }
        };
        let live: std::collections::HashSet<ChannelId> = live_channels.into_iter().collect();

        let mut pruned = 0;
        let mut drained = 0;
        for room in self.registry.ids_in_scope(scope) {
            if !live.contains(&room) {
                self.registry.remove(room);
                pruned += 1;
                continue;
            }
            match self.host.live_members(room).await {
                Ok(members) if members.is_empty() => {
                    self.destroy_room(scope, room).await;
                    drained += 1;
                }
                Ok(members) => {
                    let count = members.len() as u32;
                    let _ = self.registry.mutate(room, |r| {
                        r.member_count = count;
                        // A create that never finished activating is live
                        // on the host, so it is live here too.
                        if r.state == RoomState::Provisioning {
                            r.state = RoomState::Active;
                        }
                    });
                }
                Err(_) => {}
            }
        }

        info!(%scope, pruned, drained, "registry reconciled");
        self.emit(
            scope,
            EventSeverity::Info,
            RoomEvent::RegistryReconciled { pruned, drained },
        );
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Apply a governance command for `actor`.
    pub async fn handle_command(
        &self,
        scope: ScopeId,
        actor: ActorId,
        command: RoomCommand,
    ) -> Result<CommandAck, CommandRejected> {
        let is_admin = self
            .host
            .is_administrator(scope, actor)
            .await
            .unwrap_or(false);

        let result = match command {
            RoomCommand::Lock => self.cmd_set_lock(scope, actor, is_admin, true).await,
            RoomCommand::Unlock => self.cmd_set_lock(scope, actor, is_admin, false).await,
            RoomCommand::SetCapacity(n) => self.cmd_set_capacity(scope, actor, is_admin, n).await,
            RoomCommand::Blacklist(target) => {
                self.cmd_blacklist(scope, actor, is_admin, target).await
            }
            RoomCommand::Unblacklist(target) => {
                self.cmd_unblacklist(scope, actor, is_admin, target).await
            }
            RoomCommand::Claim => self.cmd_claim(scope, actor).await,
            RoomCommand::Create { name, capacity } => {
                self.cmd_create(scope, actor, name, capacity).await
            }
            RoomCommand::Release => self.cmd_release(scope, actor, is_admin).await,
            RoomCommand::Rename(name) => self.cmd_rename(scope, actor, is_admin, name).await,
            RoomCommand::GlobalDeny(target) => {
                self.cmd_global_deny(scope, actor, is_admin, target, true).await
            }
            RoomCommand::GlobalAllow(target) => {
                self.cmd_global_deny(scope, actor, is_admin, target, false).await
            }
        };

        match &result {
            Ok(ack) => {
                if let Some(room) = ack.room {
                    self.emit(
                        scope,
                        EventSeverity::Info,
                        RoomEvent::CommandApplied {
                            room,
                            actor,
                            description: ack.detail.clone(),
                        },
                    );
                }
            }
            Err(rejected) => {
                self.emit(
                    scope,
                    EventSeverity::Info,
                    RoomEvent::CommandRejected {
                        actor,
                        description: rejected.to_string(),
                    },
                );
            }
        }
        result
    }

    /// The room a command acts on: the actor's owned room in this scope,
    /// or the room they currently occupy when they can administer it.
    async fn resolve_target(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
    ) -> Result<RoomRecord, CommandRejected> {
        if let Some(record) = self.registry.get_by_owner(actor) {
            if record.scope == scope && record.state.is_active() {
                return Ok(record);
            }
        }
        if let Some(record) = self.occupied_room(scope, actor).await {
            if can_administer(&record, actor, is_admin) {
                return Ok(record);
            }
            return Err(CommandRejected::PermissionDenied);
        }
        Err(CommandRejected::NoRoom)
    }

    /// The tracked room whose live members include `actor`, if any.
    async fn occupied_room(&self, scope: ScopeId, actor: ActorId) -> Option<RoomRecord> {
        for room in self.registry.ids_in_scope(scope) {
            if let Ok(members) = self.host.live_members(room).await {
                if members.contains(&actor) {
                    return self.registry.get(room).filter(|r| r.state.is_active());
                }
            }
        }
        None
    }

    fn map_registry_err(err: RegistryError) -> CommandRejected {
        match err {
            RegistryError::NotFound(_) | RegistryError::Conflict(_) => CommandRejected::RoomGone,
            RegistryError::OwnerAlreadyBound(_) => {
                CommandRejected::Internal("owner index collision".to_string())
            }
        }
    }

    async fn cmd_set_lock(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
        locked: bool,
    ) -> Result<CommandAck, CommandRejected> {
        let record = self.resolve_target(scope, actor, is_admin).await?;
        self.registry
            .mutate(record.id, |r| r.locked = locked)
            .map_err(Self::map_registry_err)?;
        // Permission edits are best-effort; the registry flag is what the
        // admit path enforces.
        if let Err(err) = self
            .host
            .set_default_join_permission(record.id, !locked)
            .await
        {
            debug!(room = %record.id, error = %err, "join permission edit failed");
        }
        Ok(CommandAck::on_room(
            record.id,
            if locked { "locked" } else { "unlocked" },
        ))
    }

    async fn cmd_set_capacity(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
        requested: i64,
    ) -> Result<CommandAck, CommandRejected> {
        let capacity =
            validate_capacity(requested).map_err(|_| CommandRejected::InvalidCapacity)?;
        let record = self.resolve_target(scope, actor, is_admin).await?;
        self.registry
            .mutate(record.id, |r| r.capacity = capacity)
            .map_err(Self::map_registry_err)?;
        Ok(CommandAck::on_room(
            record.id,
            format!("capacity set to {capacity}"),
        ))
    }

    async fn cmd_blacklist(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
        target: ActorId,
    ) -> Result<CommandAck, CommandRejected> {
        let record = self.resolve_target(scope, actor, is_admin).await?;
        if target == record.owner {
            return Err(CommandRejected::PermissionDenied);
        }
        self.registry
            .mutate(record.id, |r| {
                r.blacklist.insert(target);
            })
            .map_err(Self::map_registry_err)?;

        // A mid-session target is thrown out on the spot; the blacklist is
        // not just a gate on the next join.
        if let Ok(members) = self.host.live_members(record.id).await {
            if members.contains(&target) {
                let _ = self.host.relocate_actor(scope, target, None).await;
                info!(room = %record.id, %target, "blacklisted actor relocated out");
                self.refresh_occupancy(record.id).await;
            }
        }
        Ok(CommandAck::on_room(
            record.id,
            format!("blacklisted {target}"),
        ))
    }

    async fn cmd_unblacklist(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
        target: ActorId,
    ) -> Result<CommandAck, CommandRejected> {
        let record = self.resolve_target(scope, actor, is_admin).await?;
        self.registry
            .mutate(record.id, |r| {
                r.blacklist.remove(&target);
            })
            .map_err(Self::map_registry_err)?;
        Ok(CommandAck::on_room(
            record.id,
            format!("unblacklisted {target}"),
        ))
    }

    async fn cmd_claim(
        &self,
        scope: ScopeId,
        actor: ActorId,
    ) -> Result<CommandAck, CommandRejected> {
        let Some(record) = self.occupied_room(scope, actor).await else {
            return Err(CommandRejected::NoRoom);
        };
        if record.owner == actor {
            // Claiming what you already own changes nothing.
            return Ok(CommandAck::on_room(record.id, "already the owner"));
        }

        // The decision is about live presence, not the owner field: the
        // owner may have left without the field ever changing.
        let members = self
            .host
            .live_members(record.id)
            .await
            .map_err(|_| CommandRejected::RoomGone)?;
        if members.contains(&record.owner) {
            return Err(CommandRejected::OwnerStillPresent);
        }

        let previous_owner = record.owner;
        self.registry
            .rebind_owner(record.id, actor)
            .map_err(Self::map_registry_err)?;

        // Cosmetic rename; failure does not undo the claim.
        if let Ok(display) = self.host.display_name(scope, actor).await {
            let _ = self
                .host
                .rename_channel(record.id, &format!("{display}'s room"))
                .await;
        }

        info!(room = %record.id, %previous_owner, new_owner = %actor, "room claimed");
        self.emit(
            scope,
            EventSeverity::Info,
            RoomEvent::OwnerClaimed {
                room: record.id,
                previous_owner,
                new_owner: actor,
            },
        );
        Ok(CommandAck::on_room(record.id, "claimed"))
    }

    async fn cmd_create(
        &self,
        scope: ScopeId,
        actor: ActorId,
        name: Option<String>,
        capacity: Option<i64>,
    ) -> Result<CommandAck, CommandRejected> {
        if self.denylist.contains(&actor) {
            return Err(CommandRejected::Denylisted);
        }
        let Some(binding) = self.bindings.get(&scope).copied() else {
            return Err(CommandRejected::Internal("scope not configured".to_string()));
        };
        if let Some(existing) = self.registry.get_by_owner(actor) {
            if existing.scope == scope && existing.state.is_active() {
                return Ok(CommandAck::on_room(existing.id, "room already exists"));
            }
            return Err(CommandRejected::Internal(
                "owner already bound elsewhere".to_string(),
            ));
        }
        let capacity = match capacity {
            Some(n) => validate_capacity(n).map_err(|_| CommandRejected::InvalidCapacity)?,
            None => self.config.default_capacity,
        };

        let room = self
            .provision_room(scope, actor, binding, name, capacity)
            .await
            .map_err(CommandRejected::Internal)?;

        // Pull the creator in if they are connected; a failure just leaves
        // the room empty for cleanup.
        let _ = self.host.relocate_actor(scope, actor, Some(room)).await;
        self.refresh_occupancy(room).await;
        self.emit(
            scope,
            EventSeverity::Info,
            RoomEvent::RoomProvisioned { room, owner: actor },
        );
        Ok(CommandAck::on_room(room, "created"))
    }

    async fn cmd_release(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
    ) -> Result<CommandAck, CommandRejected> {
        let record = self.resolve_target(scope, actor, is_admin).await?;
        self.destroy_room(scope, record.id).await;
        Ok(CommandAck::on_room(record.id, "released"))
    }

    async fn cmd_rename(
        &self,
        scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
        name: String,
    ) -> Result<CommandAck, CommandRejected> {
        let record = self.resolve_target(scope, actor, is_admin).await?;
        match self.host.rename_channel(record.id, &name).await {
            Ok(()) => Ok(CommandAck::on_room(record.id, format!("renamed to {name}"))),
            Err(HostError::ChannelNotFound(_)) => Err(CommandRejected::RoomGone),
            Err(err) => Err(CommandRejected::Internal(err.to_string())),
        }
    }

    async fn cmd_global_deny(
        &self,
        _scope: ScopeId,
        actor: ActorId,
        is_admin: bool,
        target: ActorId,
        denied: bool,
    ) -> Result<CommandAck, CommandRejected> {
        if !is_admin {
            return Err(CommandRejected::PermissionDenied);
        }
        if denied {
            self.denylist.insert(target);
            info!(%actor, %target, "actor added to global denylist");
            Ok(CommandAck::global(format!("globally denied {target}")))
        } else {
            self.denylist.remove(&target);
            info!(%actor, %target, "actor removed from global denylist");
            Ok(CommandAck::global(format!("globally allowed {target}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alcove_platform::InMemoryHost;
    use std::time::Duration;

    const SCOPE: ScopeId = ScopeId::new(1);
    const OWNER: ActorId = ActorId::new(100);

    struct Fixture {
        host: Arc<InMemoryHost>,
        engine: RoomLifecycle,
        trigger: ChannelId,
    }

    async fn fixture() -> Fixture {
        fixture_with(LifecycleConfig {
            delete_retry: crate::retry::RetryPolicy::new(2, Duration::from_millis(1)),
            ..LifecycleConfig::default()
        })
        .await
    }

    async fn fixture_with(config: LifecycleConfig) -> Fixture {
        let host = Arc::new(InMemoryHost::new());
        let trigger = host.add_static_channel(SCOPE, "join to create").await;
        let container = host.add_static_channel(SCOPE, "rooms").await;
        let engine = RoomLifecycle::new(
            host.clone(),
            Arc::new(RoomRegistry::new()),
            vec![ScopeBinding::new(SCOPE, trigger, container)],
            config,
        );
        Fixture {
            host,
            engine,
            trigger,
        }
    }

    async fn trigger_join(fx: &Fixture, actor: ActorId) -> Option<ChannelId> {
        fx.host.place_actor(actor, fx.trigger).await;
        let t = PresenceTransition::join(SCOPE, actor, fx.trigger);
        assert!(fx.engine.maybe_provision(&t).await);
        fx.engine.registry().get_by_owner(actor).map(|r| r.id)
    }

    #[tokio::test]
    async fn test_trigger_join_provisions_and_relocates() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();

        let record = fx.engine.registry().get(room).unwrap();
        assert_eq!(record.state, RoomState::Active);
        assert_eq!(record.owner, OWNER);
        assert_eq!(record.capacity, 5);
        // The host was asked for the same limit.
        assert_eq!(fx.host.channel_capacity(room).await, Some(5));
        assert_eq!(fx.host.location_of(OWNER).await, Some(room));
    }

    #[tokio::test]
    async fn test_non_trigger_join_is_ignored() {
        let fx = fixture().await;
        let lounge = fx.host.add_static_channel(SCOPE, "lounge").await;
        let t = PresenceTransition::join(SCOPE, OWNER, lounge);
        assert!(!fx.engine.maybe_provision(&t).await);
        assert!(fx.engine.registry().is_empty());
    }

    #[tokio::test]
    async fn test_denylisted_actor_rejected_before_create() {
        let fx = fixture().await;
        let admin = ActorId::new(1);
        fx.host.grant_admin(SCOPE, admin).await;
        fx.engine
            .handle_command(SCOPE, admin, RoomCommand::GlobalDeny(OWNER))
            .await
            .unwrap();

        assert!(trigger_join(&fx, OWNER).await.is_none());
        assert!(fx.engine.registry().is_empty());
        // Kicked out of the trigger channel entirely.
        assert_eq!(fx.host.location_of(OWNER).await, None);
    }

    #[tokio::test]
    async fn test_repeat_trigger_join_reuses_room() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();

        // Owner wanders back into the trigger channel.
        let again = trigger_join(&fx, OWNER).await.unwrap();
        assert_eq!(again, room);
        assert_eq!(fx.engine.registry().len(), 1);
        assert_eq!(fx.host.location_of(OWNER).await, Some(room));
    }

    #[tokio::test]
    async fn test_failed_create_releases_owner_slot() {
        let fx = fixture().await;
        fx.host.fail_creates(1);
        assert!(trigger_join(&fx, OWNER).await.is_none());
        assert!(fx.engine.registry().is_empty());

        // Next attempt provisions normally.
        assert!(trigger_join(&fx, OWNER).await.is_some());
    }

    #[tokio::test]
    async fn test_guest_capacity_counts_non_owner_members() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        fx.engine
            .handle_command(SCOPE, OWNER, RoomCommand::SetCapacity(2))
            .await
            .unwrap();

        // Two guests fit alongside the owner.
        for guest in [ActorId::new(201), ActorId::new(202)] {
            fx.host.place_actor(guest, room).await;
            fx.engine
                .maybe_admit(&PresenceTransition::join(SCOPE, guest, room))
                .await;
            assert_eq!(fx.host.location_of(guest).await, Some(room));
        }

        // The third guest is bounced.
        let third = ActorId::new(203);
        fx.host.place_actor(third, room).await;
        fx.engine
            .maybe_admit(&PresenceTransition::join(SCOPE, third, room))
            .await;
        assert_eq!(fx.host.location_of(third).await, None);
    }

    #[tokio::test]
    async fn test_empty_room_is_destroyed_on_leave() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();

        fx.host.drop_actor(OWNER).await;
        fx.engine
            .maybe_drain(&PresenceTransition::leave(SCOPE, OWNER, room))
            .await;

        assert!(fx.engine.registry().is_empty());
        assert!(!fx.host.channel_exists(room).await);
    }

    #[tokio::test]
    async fn test_delete_retry_exhaustion_force_removes() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        let mut events = fx.engine.subscribe();

        fx.host.drop_actor(OWNER).await;
        fx.host.fail_deletes(10);
        fx.engine
            .maybe_drain(&PresenceTransition::leave(SCOPE, OWNER, room))
            .await;

        // Registry entry is gone even though the channel survived.
        assert!(fx.engine.registry().is_empty());
        assert!(fx.host.channel_exists(room).await);

        let leaked = std::iter::from_fn(|| events.try_recv().ok())
            .any(|e| matches!(e.event, RoomEvent::RoomLeaked { room: r, .. } if r == room));
        assert!(leaked);
    }

    #[tokio::test]
    async fn test_claim_denied_while_owner_present() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        let guest = ActorId::new(200);
        fx.host.place_actor(guest, room).await;

        let err = fx
            .engine
            .handle_command(SCOPE, guest, RoomCommand::Claim)
            .await
            .unwrap_err();
        assert_eq!(err, CommandRejected::OwnerStillPresent);
    }

    #[tokio::test]
    async fn test_claim_succeeds_after_owner_leaves() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        let guest = ActorId::new(200);
        fx.host.set_display_name(guest, "river").await;
        fx.host.place_actor(guest, room).await;
        fx.host.drop_actor(OWNER).await;

        let ack = fx
            .engine
            .handle_command(SCOPE, guest, RoomCommand::Claim)
            .await
            .unwrap();
        assert_eq!(ack.room, Some(room));
        assert_eq!(fx.engine.registry().get(room).unwrap().owner, guest);
        assert_eq!(
            fx.engine.registry().get_by_owner(guest).unwrap().id,
            room
        );
        assert_eq!(
            fx.host.channel_name(room).await.as_deref(),
            Some("river's room")
        );
    }

    #[tokio::test]
    async fn test_claim_is_idempotent_for_current_owner() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        let ack = fx
            .engine
            .handle_command(SCOPE, OWNER, RoomCommand::Claim)
            .await
            .unwrap();
        assert_eq!(ack.room, Some(room));
        assert_eq!(fx.engine.registry().get(room).unwrap().owner, OWNER);
    }

    #[tokio::test]
    async fn test_commands_without_a_room_are_rejected() {
        let fx = fixture().await;
        let err = fx
            .engine
            .handle_command(SCOPE, OWNER, RoomCommand::Lock)
            .await
            .unwrap_err();
        assert_eq!(err, CommandRejected::NoRoom);
    }

    #[tokio::test]
    async fn test_capacity_validation_at_the_command_surface() {
        let fx = fixture().await;
        trigger_join(&fx, OWNER).await.unwrap();
        for bad in [-1, 100] {
            let err = fx
                .engine
                .handle_command(SCOPE, OWNER, RoomCommand::SetCapacity(bad))
                .await
                .unwrap_err();
            assert_eq!(err, CommandRejected::InvalidCapacity);
        }
        for good in [0, 99] {
            fx.engine
                .handle_command(SCOPE, OWNER, RoomCommand::SetCapacity(good))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_lock_flips_host_permission_and_gates_guests() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        fx.engine
            .handle_command(SCOPE, OWNER, RoomCommand::Lock)
            .await
            .unwrap();
        assert_eq!(fx.host.default_join_allowed(room).await, Some(false));

        let guest = ActorId::new(200);
        fx.host.place_actor(guest, room).await;
        fx.engine
            .maybe_admit(&PresenceTransition::join(SCOPE, guest, room))
            .await;
        assert_eq!(fx.host.location_of(guest).await, None);

        fx.engine
            .handle_command(SCOPE, OWNER, RoomCommand::Unlock)
            .await
            .unwrap();
        assert_eq!(fx.host.default_join_allowed(room).await, Some(true));
    }

    #[tokio::test]
    async fn test_global_denylist_requires_admin() {
        let fx = fixture().await;
        let err = fx
            .engine
            .handle_command(SCOPE, OWNER, RoomCommand::GlobalDeny(ActorId::new(7)))
            .await
            .unwrap_err();
        assert_eq!(err, CommandRejected::PermissionDenied);
    }

    #[tokio::test]
    async fn test_release_destroys_the_room() {
        let fx = fixture().await;
        let room = trigger_join(&fx, OWNER).await.unwrap();
        fx.engine
            .handle_command(SCOPE, OWNER, RoomCommand::Release)
            .await
            .unwrap();
        assert!(fx.engine.registry().is_empty());
        assert!(!fx.host.channel_exists(room).await);
    }

    #[tokio::test]
    async fn test_reconcile_prunes_and_drains() {
        let fx = fixture().await;
        let kept = trigger_join(&fx, OWNER).await.unwrap();

        let ghost_owner = ActorId::new(300);
        let ghost = trigger_join(&fx, ghost_owner).await.unwrap();
        let emptied_owner = ActorId::new(400);
        let emptied = trigger_join(&fx, emptied_owner).await.unwrap();

        // While "disconnected": the ghost room vanished host-side and the
        // other room emptied without the engine seeing a leave.
        fx.host.delete_channel(ghost).await.unwrap();
        fx.host.drop_actor(emptied_owner).await;

        fx.engine.reconcile(SCOPE).await;

        assert_eq!(fx.engine.registry().len(), 1);
        assert!(fx.engine.registry().get(kept).is_some());
        assert!(fx.engine.registry().get(ghost).is_none());
        assert!(fx.engine.registry().get(emptied).is_none());
        assert!(!fx.host.channel_exists(emptied).await);
    }
}
