//! The host platform capability trait.

use crate::error::HostResult;
use alcove_types::{ActorId, ChannelId, ScopeId};
use async_trait::async_trait;

/// Everything the lifecycle engine is allowed to do to the chat platform.
///
/// Each method is one round trip. Implementations must be safe to call
/// concurrently from workers of different scopes; the engine itself
/// serializes calls within a scope.
#[async_trait]
pub trait HostPlatform: Send + Sync {
    /// Create a voice channel under `container` and return its id.
    async fn create_sub_channel(
        &self,
        scope: ScopeId,
        owner: ActorId,
        container: ChannelId,
        name: &str,
        capacity: u32,
    ) -> HostResult<ChannelId>;

    /// Delete a channel.
    async fn delete_channel(&self, channel: ChannelId) -> HostResult<()>;

    /// Move an actor into `target`, or disconnect them when `target` is
    /// `None`.
    async fn relocate_actor(
        &self,
        scope: ScopeId,
        actor: ActorId,
        target: Option<ChannelId>,
    ) -> HostResult<()>;

    /// Flip the default join permission on a channel (lock/unlock).
    async fn set_default_join_permission(
        &self,
        channel: ChannelId,
        allowed: bool,
    ) -> HostResult<()>;

    /// Rename a channel. Cosmetic; callers treat failures as best-effort.
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> HostResult<()>;

    /// Fresh occupancy snapshot for a channel.
    async fn live_members(&self, channel: ChannelId) -> HostResult<Vec<ActorId>>;

    /// Whether the actor holds the administrator capability in the scope.
    async fn is_administrator(&self, scope: ScopeId, actor: ActorId) -> HostResult<bool>;

    /// All channels currently alive in the scope. Used to reconcile the
    /// in-memory registry after a reconnect.
    async fn list_channels(&self, scope: ScopeId) -> HostResult<Vec<ChannelId>>;

    /// Human-readable name for an actor, used when naming their room.
    async fn display_name(&self, scope: ScopeId, actor: ActorId) -> HostResult<String>;
}
