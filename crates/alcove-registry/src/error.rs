//! Registry errors.

use alcove_types::{ActorId, ChannelId};
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No record under that id. Stale references land here.
    #[error("room not found: {0}")]
    NotFound(ChannelId),

    /// The record was destroyed concurrently with the call. Callers treat
    /// this as "stale event, drop".
    #[error("room already destroyed: {0}")]
    Conflict(ChannelId),

    /// The owner already has a room (or one being provisioned for them).
    #[error("owner already bound to a room: {0}")]
    OwnerAlreadyBound(ActorId),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
