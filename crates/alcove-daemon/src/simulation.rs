//! Playground simulation.
//!
//! Drives random presence traffic and commands through the dispatcher
//! against the in-memory host, so the engine can be watched end to end
//! without a platform connection. Deterministic for a given seed.

use crate::config::SimulationConfig;
use alcove_dispatch::ScopeDispatcher;
use alcove_lifecycle::RoomCommand;
use alcove_platform::InMemoryHost;
use alcove_registry::RoomRegistry;
use alcove_types::{ActorId, ChannelId, PresenceTransition, ScopeBinding, ScopeId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulationStats {
    pub presence_events: u64,
    pub commands_issued: u64,
    pub commands_rejected: u64,
}

/// Seed the host with one trigger/container pair per scope.
pub async fn seed_scopes(host: &InMemoryHost, scopes: u64) -> Vec<ScopeBinding> {
    let mut bindings = Vec::new();
    for n in 1..=scopes {
        let scope = ScopeId::new(n);
        let trigger = host.add_static_channel(scope, "join to create").await;
        let container = host.add_static_channel(scope, "rooms").await;
        bindings.push(ScopeBinding::new(scope, trigger, container));
    }
    bindings
}

/// Random walk over joins, leaves, and commands.
pub struct Simulation {
    host: Arc<InMemoryHost>,
    registry: Arc<RoomRegistry>,
    dispatcher: Arc<ScopeDispatcher>,
    bindings: Vec<ScopeBinding>,
    config: SimulationConfig,
    rng: StdRng,
    stats: SimulationStats,
}

impl Simulation {
    pub fn new(
        host: Arc<InMemoryHost>,
        registry: Arc<RoomRegistry>,
        dispatcher: Arc<ScopeDispatcher>,
        bindings: Vec<ScopeBinding>,
        config: SimulationConfig,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            host,
            registry,
            dispatcher,
            bindings,
            config,
            rng,
            stats: SimulationStats::default(),
        }
    }

    /// Actor ids for one scope; disjoint across scopes.
    fn actors_of(&self, scope_index: usize) -> Vec<ActorId> {
        let base = scope_index as u64 * 1000;
        (1..=self.config.actors)
            .map(|n| ActorId::new(base + n))
            .collect()
    }

    pub async fn run(mut self) -> SimulationStats {
        info!(
            scopes = self.bindings.len(),
            actors = self.config.actors,
            ticks = self.config.ticks,
            seed = self.config.seed,
            "playground simulation starting"
        );

        for tick in 0..self.config.ticks {
            self.tick().await;
            if tick % 50 == 49 {
                info!(tick = tick + 1, rooms = self.registry.len(), "simulation progress");
            }
            sleep(Duration::from_millis(self.config.tick_interval_ms)).await;
        }

        // Everyone goes home; rooms should drain to nothing.
        let bindings = self.bindings.clone();
        for (index, binding) in bindings.iter().enumerate() {
            for actor in self.actors_of(index) {
                self.depart(binding.scope, actor).await;
            }
        }

        self.stats
    }

    async fn tick(&mut self) {
        let scope_index = self.rng.gen_range(0..self.bindings.len());
        let binding = self.bindings[scope_index];
        let actors = self.actors_of(scope_index);
        let actor = actors[self.rng.gen_range(0..actors.len())];

        match self.rng.gen_range(0..10u32) {
            // Most of the traffic is presence churn.
            0..=3 => self.enter_trigger(binding, actor).await,
            4..=6 => self.enter_random_room(binding.scope, actor).await,
            7 => self.depart(binding.scope, actor).await,
            _ => self.random_command(binding.scope, actor).await,
        }
    }

    async fn enter_trigger(&mut self, binding: ScopeBinding, actor: ActorId) {
        self.move_actor(binding.scope, actor, Some(binding.trigger_channel))
            .await;
    }

    async fn enter_random_room(&mut self, scope: ScopeId, actor: ActorId) {
        let rooms = self.registry.ids_in_scope(scope);
        if rooms.is_empty() {
            return;
        }
        let room = rooms[self.rng.gen_range(0..rooms.len())];
        self.move_actor(scope, actor, Some(room)).await;
    }

    async fn depart(&mut self, scope: ScopeId, actor: ActorId) {
        self.move_actor(scope, actor, None).await;
    }

    /// Apply the move on the host, then deliver the presence event, the
    /// way the platform reports location changes after the fact.
    async fn move_actor(&mut self, scope: ScopeId, actor: ActorId, target: Option<ChannelId>) {
        let previous = self.host.location_of(actor).await;
        if previous == target {
            return;
        }
        match target {
            Some(channel) => self.host.place_actor(actor, channel).await,
            None => self.host.drop_actor(actor).await,
        }
        self.dispatcher
            .dispatch(PresenceTransition {
                scope,
                actor,
                previous,
                new: target,
            })
            .await;
        self.stats.presence_events += 1;
    }

    async fn random_command(&mut self, scope: ScopeId, actor: ActorId) {
        let capacity = self.rng.gen_range(0..6i64);
        let command = match self.rng.gen_range(0..5u32) {
            0 => RoomCommand::Lock,
            1 => RoomCommand::Unlock,
            2 => RoomCommand::SetCapacity(capacity),
            3 => RoomCommand::Claim,
            _ => RoomCommand::Release,
        };
        self.stats.commands_issued += 1;
        if self.dispatcher.command(scope, actor, command).await.is_err() {
            // Rejections are normal traffic here: most actors own nothing.
            self.stats.commands_rejected += 1;
        }
    }
}

/// Per-scope room totals, for the end-of-run report.
pub fn rooms_by_scope(registry: &RoomRegistry, bindings: &[ScopeBinding]) -> HashMap<ScopeId, usize> {
    bindings
        .iter()
        .map(|b| (b.scope, registry.ids_in_scope(b.scope).len()))
        .collect()
}
