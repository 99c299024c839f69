//! alcoved - the alcove daemon.
//!
//! Wires the lifecycle engine to a host platform and runs it. Today the
//! only backend is the in-memory playground host; the connection layer for
//! a real platform implements [`alcove_platform::HostPlatform`] and slots
//! in where `InMemoryHost` does here.

mod config;
mod simulation;

use crate::config::{AlcoveConfig, LogConfig};
use crate::simulation::{rooms_by_scope, seed_scopes, Simulation};
use alcove_dispatch::ScopeDispatcher;
use alcove_lifecycle::RoomLifecycle;
use alcove_platform::InMemoryHost;
use alcove_registry::RoomRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "alcoved", version, about = "Ephemeral room lifecycle daemon")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "ALCOVE_CONFIG")]
    config: Option<PathBuf>,

    /// Force JSON log output, overriding the config file.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log.level.clone()));
    if log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AlcoveConfig::load(cli.config.as_deref())?;
    if cli.json_logs {
        config.log.json = true;
    }
    init_tracing(&config.log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "alcoved starting (playground mode)"
    );

    let host = Arc::new(InMemoryHost::new());
    let registry = Arc::new(RoomRegistry::new());
    let bindings = seed_scopes(&host, config.simulation.scopes).await;
    let lifecycle = Arc::new(RoomLifecycle::new(
        host.clone(),
        registry.clone(),
        bindings.clone(),
        config.engine.to_lifecycle_config(),
    ));
    let dispatcher = Arc::new(ScopeDispatcher::new(lifecycle));

    // Mirror the observability stream into the log.
    let mut events = dispatcher.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Ok(envelope) = events.recv().await {
            info!(scope = %envelope.scope, event = ?envelope.event, "room event");
        }
    });

    let stats = Simulation::new(
        host,
        registry.clone(),
        dispatcher.clone(),
        bindings.clone(),
        config.simulation.clone(),
    )
    .run()
    .await;

    // Let the final leave events drain, then stop.
    for binding in &bindings {
        dispatcher.reconcile(binding.scope).await;
    }
    match Arc::try_unwrap(dispatcher) {
        Ok(dispatcher) => dispatcher.shutdown().await,
        Err(_) => info!("dispatcher still shared; skipping drain"),
    }
    event_logger.abort();

    let per_scope = rooms_by_scope(&registry, &bindings);
    info!(
        presence_events = stats.presence_events,
        commands = stats.commands_issued,
        rejected = stats.commands_rejected,
        rooms_left = registry.len(),
        ?per_scope,
        "simulation finished"
    );
    Ok(())
}
