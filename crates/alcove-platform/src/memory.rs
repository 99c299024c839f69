//! In-memory host platform for tests and the playground.
//!
//! Simulates a single platform process: channels, actor locations, admin
//! grants, and display names. Failures can be scripted per operation class
//! so callers can exercise their retry and cleanup paths.

use crate::error::{HostError, HostResult};
use crate::host::HostPlatform;
use alcove_types::{ActorId, ChannelId, ScopeId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// A host call recorded by the simulator, for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Create(ChannelId),
    Delete(ChannelId),
    Relocate(ActorId, Option<ChannelId>),
    SetJoinPermission(ChannelId, bool),
    Rename(ChannelId, String),
}

#[derive(Debug, Clone)]
struct SimChannel {
    scope: ScopeId,
    name: String,
    capacity: u32,
    default_join_allowed: bool,
}

#[derive(Default)]
struct HostInner {
    channels: HashMap<ChannelId, SimChannel>,
    locations: HashMap<ActorId, ChannelId>,
    admins: HashSet<(ScopeId, ActorId)>,
    display_names: HashMap<ActorId, String>,
    calls: Vec<HostCall>,
}

/// Simulated guild backend.
pub struct InMemoryHost {
    inner: RwLock<HostInner>,
    next_id: AtomicU64,
    creates_to_fail: AtomicU32,
    deletes_to_fail: AtomicU32,
    relocations_to_fail: AtomicU32,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HostInner::default()),
            next_id: AtomicU64::new(1000),
            creates_to_fail: AtomicU32::new(0),
            deletes_to_fail: AtomicU32::new(0),
            relocations_to_fail: AtomicU32::new(0),
        }
    }

    fn mint_id(&self) -> ChannelId {
        ChannelId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    // ── Scenario setup ───────────────────────────────────────────────

    /// Seed a long-lived channel (trigger, container) and return its id.
    pub async fn add_static_channel(&self, scope: ScopeId, name: &str) -> ChannelId {
        let id = self.mint_id();
        let mut inner = self.inner.write().await;
        inner.channels.insert(
            id,
            SimChannel {
                scope,
                name: name.to_string(),
                capacity: 0,
                default_join_allowed: true,
            },
        );
        id
    }

    /// Put an actor into a channel without going through the engine, the
    /// way the platform itself does before the presence event arrives.
    pub async fn place_actor(&self, actor: ActorId, channel: ChannelId) {
        let mut inner = self.inner.write().await;
        inner.locations.insert(actor, channel);
    }

    /// Drop an actor's connection entirely.
    pub async fn drop_actor(&self, actor: ActorId) {
        let mut inner = self.inner.write().await;
        inner.locations.remove(&actor);
    }

    pub async fn grant_admin(&self, scope: ScopeId, actor: ActorId) {
        let mut inner = self.inner.write().await;
        inner.admins.insert((scope, actor));
    }

    pub async fn set_display_name(&self, actor: ActorId, name: &str) {
        let mut inner = self.inner.write().await;
        inner.display_names.insert(actor, name.to_string());
    }

    // ── Fault injection ──────────────────────────────────────────────

    /// Fail the next `n` channel creations with a transient error.
    pub fn fail_creates(&self, n: u32) {
        self.creates_to_fail.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` channel deletions with a transient error.
    pub fn fail_deletes(&self, n: u32) {
        self.deletes_to_fail.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` actor relocations with a transient error.
    pub fn fail_relocations(&self, n: u32) {
        self.relocations_to_fail.store(n, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    // ── Assertions ───────────────────────────────────────────────────

    pub async fn location_of(&self, actor: ActorId) -> Option<ChannelId> {
        self.inner.read().await.locations.get(&actor).copied()
    }

    pub async fn channel_exists(&self, channel: ChannelId) -> bool {
        self.inner.read().await.channels.contains_key(&channel)
    }

    pub async fn channel_name(&self, channel: ChannelId) -> Option<String> {
        self.inner
            .read()
            .await
            .channels
            .get(&channel)
            .map(|c| c.name.clone())
    }

    pub async fn channel_capacity(&self, channel: ChannelId) -> Option<u32> {
        self.inner
            .read()
            .await
            .channels
            .get(&channel)
            .map(|c| c.capacity)
    }

    pub async fn default_join_allowed(&self, channel: ChannelId) -> Option<bool> {
        self.inner
            .read()
            .await
            .channels
            .get(&channel)
            .map(|c| c.default_join_allowed)
    }

    /// Every call the engine has issued, in order.
    pub async fn calls(&self) -> Vec<HostCall> {
        self.inner.read().await.calls.clone()
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostPlatform for InMemoryHost {
    async fn create_sub_channel(
        &self,
        scope: ScopeId,
        _owner: ActorId,
        _container: ChannelId,
        name: &str,
        capacity: u32,
    ) -> HostResult<ChannelId> {
        if Self::take_failure(&self.creates_to_fail) {
            debug!(%scope, name, "scripted create failure fired");
            return Err(HostError::unavailable("simulated create failure"));
        }

        let id = self.mint_id();
        let mut inner = self.inner.write().await;
        inner.channels.insert(
            id,
            SimChannel {
                scope,
                name: name.to_string(),
                capacity,
                default_join_allowed: true,
            },
        );
        inner.calls.push(HostCall::Create(id));
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> HostResult<()> {
        if Self::take_failure(&self.deletes_to_fail) {
            debug!(%channel, "scripted delete failure fired");
            return Err(HostError::unavailable("simulated delete failure"));
        }

        let mut inner = self.inner.write().await;
        inner.calls.push(HostCall::Delete(channel));
        if inner.channels.remove(&channel).is_none() {
            return Err(HostError::ChannelNotFound(channel));
        }
        // The platform disconnects anyone still inside.
        inner.locations.retain(|_, loc| *loc != channel);
        Ok(())
    }

    async fn relocate_actor(
        &self,
        _scope: ScopeId,
        actor: ActorId,
        target: Option<ChannelId>,
    ) -> HostResult<()> {
        if Self::take_failure(&self.relocations_to_fail) {
            debug!(%actor, ?target, "scripted relocation failure fired");
            return Err(HostError::unavailable("simulated relocation failure"));
        }

        let mut inner = self.inner.write().await;
        inner.calls.push(HostCall::Relocate(actor, target));
        match target {
            Some(channel) => {
                if !inner.channels.contains_key(&channel) {
                    return Err(HostError::ChannelNotFound(channel));
                }
                // Only connected actors can be moved.
                if !inner.locations.contains_key(&actor) {
                    return Err(HostError::ActorUnavailable(actor));
                }
                inner.locations.insert(actor, channel);
            }
            None => {
                // Disconnecting an absent actor is a no-op.
                inner.locations.remove(&actor);
            }
        }
        Ok(())
    }

    async fn set_default_join_permission(
        &self,
        channel: ChannelId,
        allowed: bool,
    ) -> HostResult<()> {
        let mut inner = self.inner.write().await;
        inner.calls.push(HostCall::SetJoinPermission(channel, allowed));
        match inner.channels.get_mut(&channel) {
            Some(c) => {
                c.default_join_allowed = allowed;
                Ok(())
            }
            None => Err(HostError::ChannelNotFound(channel)),
        }
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> HostResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .calls
            .push(HostCall::Rename(channel, name.to_string()));
        match inner.channels.get_mut(&channel) {
            Some(c) => {
                c.name = name.to_string();
                Ok(())
            }
            None => Err(HostError::ChannelNotFound(channel)),
        }
    }

    async fn live_members(&self, channel: ChannelId) -> HostResult<Vec<ActorId>> {
        let inner = self.inner.read().await;
        if !inner.channels.contains_key(&channel) {
            return Err(HostError::ChannelNotFound(channel));
        }
        Ok(inner
            .locations
            .iter()
            .filter(|(_, loc)| **loc == channel)
            .map(|(actor, _)| *actor)
            .collect())
    }

    async fn is_administrator(&self, scope: ScopeId, actor: ActorId) -> HostResult<bool> {
        Ok(self.inner.read().await.admins.contains(&(scope, actor)))
    }

    async fn list_channels(&self, scope: ScopeId) -> HostResult<Vec<ChannelId>> {
        Ok(self
            .inner
            .read()
            .await
            .channels
            .iter()
            .filter(|(_, c)| c.scope == scope)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn display_name(&self, _scope: ScopeId, actor: ActorId) -> HostResult<String> {
        Ok(self
            .inner
            .read()
            .await
            .display_names
            .get(&actor)
            .cloned()
            .unwrap_or_else(|| format!("actor-{}", actor.as_u64())))
    }
}
