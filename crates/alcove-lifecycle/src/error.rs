//! Lifecycle errors.

use alcove_platform::HostError;
use alcove_registry::RegistryError;
use alcove_types::ChannelId;
use thiserror::Error;

/// Internal errors of lifecycle transitions.
///
/// Commands translate these into [`crate::command::CommandRejected`] before
/// they reach the presentation layer.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// The referenced room is not tracked. Stale state, not fatal.
    #[error("room not tracked: {0}")]
    NotFound(ChannelId),

    /// The actor may not perform the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// The record was destroyed concurrently; the event is stale.
    #[error("room destroyed concurrently: {0}")]
    Conflict(ChannelId),

    /// A host platform call failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Capacity outside the accepted range.
    #[error("capacity out of range")]
    InvalidCapacity,
}

impl From<RegistryError> for LifecycleError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => LifecycleError::NotFound(id),
            RegistryError::Conflict(id) => LifecycleError::Conflict(id),
            // An owner collision surfaces as a denied operation.
            RegistryError::OwnerAlreadyBound(_) => LifecycleError::PermissionDenied,
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_errors_map_over() {
        let id = ChannelId::new(5);
        assert!(matches!(
            LifecycleError::from(RegistryError::NotFound(id)),
            LifecycleError::NotFound(_)
        ));
        assert!(matches!(
            LifecycleError::from(RegistryError::Conflict(id)),
            LifecycleError::Conflict(_)
        ));
    }

    #[test]
    fn test_host_errors_pass_through() {
        let err = LifecycleError::from(HostError::unavailable("rate limited"));
        assert_eq!(err.to_string(), "host call failed: rate limited");
    }
}
