//! Daemon configuration.
//!
//! Defaults, then an optional TOML file, then `ALCOVE_*` environment
//! overrides (double underscore as the section separator, e.g.
//! `ALCOVE_ENGINE__DEFAULT_CAPACITY=10`).

use alcove_lifecycle::{LifecycleConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlcoveConfig {
    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Lifecycle engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of freshly provisioned rooms; `0` means unbounded.
    pub default_capacity: u32,

    /// Attempts for host-side channel deletion.
    pub delete_max_attempts: u32,

    /// Backoff before the second delete attempt, in milliseconds.
    pub delete_base_delay_ms: u64,

    /// Buffer depth of the observability stream.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_capacity: 5,
            delete_max_attempts: 3,
            delete_base_delay_ms: 50,
            event_buffer: 256,
        }
    }
}

impl EngineConfig {
    pub fn to_lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            default_capacity: self.default_capacity,
            delete_retry: RetryPolicy::new(
                self.delete_max_attempts,
                Duration::from_millis(self.delete_base_delay_ms),
            ),
            event_buffer: self.event_buffer,
        }
    }
}

/// Playground simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent scopes to drive.
    pub scopes: u64,

    /// Actors per scope.
    pub actors: u64,

    /// Presence ticks to run before stopping.
    pub ticks: u64,

    /// Pause between ticks, in milliseconds.
    pub tick_interval_ms: u64,

    /// RNG seed, for reproducible runs.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scopes: 2,
            actors: 8,
            ticks: 200,
            tick_interval_ms: 10,
            seed: 42,
        }
    }
}

impl AlcoveConfig {
    /// Load configuration: defaults, then `path` if given, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AlcoveConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("ALCOVE")
                .separator("__")
                .try_parsing(true),
        );
        Ok(builder.build()?.try_deserialize()?)
    }
}
