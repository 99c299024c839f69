//! Presence-transition events from the host platform.

use crate::ids::{ActorId, ChannelId, ScopeId};
use serde::{Deserialize, Serialize};

/// A single actor moving between channels within one scope.
///
/// `previous` and `new` are both optional: an actor connecting for the
/// first time has no previous location, an actor disconnecting has no new
/// one, and a move carries both. One transition can therefore be a "leave"
/// and a "join" at the same time, which is why dispatch evaluates
/// provision, admit, and drain against the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceTransition {
    pub scope: ScopeId,
    pub actor: ActorId,
    pub previous: Option<ChannelId>,
    pub new: Option<ChannelId>,
}

impl PresenceTransition {
    /// Actor connected straight into `channel`.
    pub fn join(scope: ScopeId, actor: ActorId, channel: ChannelId) -> Self {
        Self {
            scope,
            actor,
            previous: None,
            new: Some(channel),
        }
    }

    /// Actor disconnected from `channel`.
    pub fn leave(scope: ScopeId, actor: ActorId, channel: ChannelId) -> Self {
        Self {
            scope,
            actor,
            previous: Some(channel),
            new: None,
        }
    }

    /// Actor moved from one channel to another.
    pub fn movement(scope: ScopeId, actor: ActorId, from: ChannelId, to: ChannelId) -> Self {
        Self {
            scope,
            actor,
            previous: Some(from),
            new: Some(to),
        }
    }

    /// True when the transition changes nothing (duplicate platform event).
    pub fn is_noop(&self) -> bool {
        self.previous == self.new
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_has_no_previous() {
        let t = PresenceTransition::join(ScopeId::new(1), ActorId::new(2), ChannelId::new(3));
        assert_eq!(t.previous, None);
        assert_eq!(t.new, Some(ChannelId::new(3)));
        assert!(!t.is_noop());
    }

    #[test]
    fn test_same_channel_is_noop() {
        let c = ChannelId::new(3);
        let t = PresenceTransition::movement(ScopeId::new(1), ActorId::new(2), c, c);
        assert!(t.is_noop());
    }
}
