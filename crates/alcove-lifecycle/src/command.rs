//! The owner/admin command surface.
//!
//! Commands arrive through the dispatcher on the same serial queue as
//! presence events, so a command never interleaves with an event for the
//! same scope. Replies are plain enums for the presentation layer to
//! format; no message text is produced here.

use alcove_types::{ActorId, ChannelId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A governance command issued by an actor against their room.
///
/// None of the variants name a channel: the engine resolves the target to
/// the actor's owned room first, then to the room they occupy when they can
/// administer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomCommand {
    /// Deny default join permission on the room.
    Lock,
    /// Restore default join permission.
    Unlock,
    /// Change the room capacity; validated to `[0, 99]`.
    SetCapacity(i64),
    /// Bar an actor from the room; relocates them out if present.
    Blacklist(ActorId),
    /// Lift a room blacklist entry.
    Unblacklist(ActorId),
    /// Take ownership of the occupied room if its owner has left.
    Claim,
    /// Explicitly provision a room without going through the trigger.
    Create {
        name: Option<String>,
        capacity: Option<i64>,
    },
    /// Explicitly delete the room.
    Release,
    /// Rename the room.
    Rename(String),
    /// Bar an actor from provisioning anywhere in the engine. Admin only.
    GlobalDeny(ActorId),
    /// Lift a global denylist entry. Admin only.
    GlobalAllow(ActorId),
}

/// Successful command outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    /// Room the command acted on, when there is one.
    pub room: Option<ChannelId>,

    /// Short machine-readable description of what happened.
    pub detail: String,
}

impl CommandAck {
    pub fn on_room(room: ChannelId, detail: impl Into<String>) -> Self {
        Self {
            room: Some(room),
            detail: detail.into(),
        }
    }

    pub fn global(detail: impl Into<String>) -> Self {
        Self {
            room: None,
            detail: detail.into(),
        }
    }
}

/// Why a command was refused. Surfaced to the requesting actor; no retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CommandRejected {
    #[error("you do not own or occupy a room")]
    NoRoom,

    #[error("you cannot manage this room")]
    PermissionDenied,

    #[error("the current owner is still in the room")]
    OwnerStillPresent,

    #[error("capacity must be between 0 and 99")]
    InvalidCapacity,

    #[error("the room no longer exists")]
    RoomGone,

    #[error("you are barred from creating rooms")]
    Denylisted,

    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_are_user_facing() {
        assert_eq!(CommandRejected::NoRoom.to_string(), "you do not own or occupy a room");
        assert_eq!(
            CommandRejected::InvalidCapacity.to_string(),
            "capacity must be between 0 and 99"
        );
    }

    #[test]
    fn test_command_serializes() {
        let cmd = RoomCommand::Blacklist(ActorId::new(7));
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("Blacklist"));
    }
}
