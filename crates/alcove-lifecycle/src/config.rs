//! Engine tunables.

use crate::retry::RetryPolicy;

/// Tunables for the lifecycle engine.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Capacity given to freshly provisioned rooms; `0` means unbounded.
    pub default_capacity: u32,

    /// Retry schedule for host-side channel deletion.
    pub delete_retry: RetryPolicy,

    /// Buffer depth of the observability broadcast stream.
    pub event_buffer: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_capacity: 5,
            delete_retry: RetryPolicy::default(),
            event_buffer: 256,
        }
    }
}
