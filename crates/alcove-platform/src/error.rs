//! Error types for host platform calls.

use alcove_types::{ActorId, ChannelId};
use thiserror::Error;

/// Errors surfaced by the host platform.
///
/// `Unavailable` is the transient class: callers performing destructive
/// cleanup retry it with backoff, everything else treats it as best-effort
/// failure. The other variants describe state that no retry will fix.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The referenced channel does not exist on the platform.
    #[error("channel not found on host: {0}")]
    ChannelNotFound(ChannelId),

    /// The actor is not connected, so it cannot be relocated.
    #[error("actor not connected: {0}")]
    ActorUnavailable(ActorId),

    /// Transient platform failure (rate limit, dropped connection, 5xx).
    #[error("host call failed: {reason}")]
    Unavailable { reason: String },
}

impl HostError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Whether a retry has any chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, HostError::Unavailable { .. })
    }
}

/// Result type for host platform operations.
pub type HostResult<T> = std::result::Result<T, HostError>;
