//! Static per-scope wiring: which channel triggers provisioning and where
//! provisioned rooms are placed.
//!
//! Bindings are loaded at startup and immutable thereafter; there is no
//! reload path.

use crate::ids::{ChannelId, ScopeId};
use serde::{Deserialize, Serialize};

/// The trigger/container pair for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeBinding {
    /// Scope this binding applies to.
    pub scope: ScopeId,

    /// Joining this channel provisions a room for the joining actor.
    pub trigger_channel: ChannelId,

    /// Category/parent under which provisioned rooms are created.
    pub container_channel: ChannelId,
}

impl ScopeBinding {
    pub fn new(scope: ScopeId, trigger_channel: ChannelId, container_channel: ChannelId) -> Self {
        Self {
            scope,
            trigger_channel,
            container_channel,
        }
    }

    pub fn is_trigger(&self, channel: ChannelId) -> bool {
        self.trigger_channel == channel
    }
}
