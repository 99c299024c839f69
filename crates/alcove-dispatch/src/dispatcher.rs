//! The per-scope serial queue.
//!
//! Events arrive concurrently from the host connection, but everything
//! touching one scope's rooms must apply one at a time. Each scope gets a
//! lazily spawned worker task fed by a bounded mpsc queue; presence events,
//! commands, and reconcile requests all ride the same queue, so a command
//! can never interleave with an event for the same scope. Different scopes
//! share no state and run fully in parallel.

use alcove_lifecycle::{CommandAck, CommandRejected, RoomCommand, RoomLifecycle};
use alcove_types::{ActorId, PresenceTransition, RoomEventEnvelope, ScopeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Queue depth per scope. Events beyond this apply backpressure on the
/// connection layer rather than piling up unboundedly.
const SCOPE_QUEUE_DEPTH: usize = 256;

/// One unit of work on a scope's queue.
enum ScopeJob {
    Presence(PresenceTransition),
    Command {
        actor: ActorId,
        command: RoomCommand,
        reply: oneshot::Sender<Result<CommandAck, CommandRejected>>,
    },
    Reconcile,
}

struct Worker {
    tx: mpsc::Sender<ScopeJob>,
    handle: JoinHandle<()>,
}

/// Routes presence events and commands onto per-scope serial queues.
pub struct ScopeDispatcher {
    lifecycle: Arc<RoomLifecycle>,
    workers: Mutex<HashMap<ScopeId, Worker>>,
}

impl ScopeDispatcher {
    pub fn new(lifecycle: Arc<RoomLifecycle>) -> Self {
        Self {
            lifecycle,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to the engine's observability stream.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEventEnvelope> {
        self.lifecycle.subscribe()
    }

    /// Enqueue a presence transition for its scope.
    pub async fn dispatch(&self, transition: PresenceTransition) {
        let tx = self.worker_for(transition.scope).await;
        if tx.send(ScopeJob::Presence(transition)).await.is_err() {
            warn!(scope = %transition.scope, "scope worker gone; presence event dropped");
        }
    }

    /// Run a command on the scope's queue and wait for its outcome.
    pub async fn command(
        &self,
        scope: ScopeId,
        actor: ActorId,
        command: RoomCommand,
    ) -> Result<CommandAck, CommandRejected> {
        let (reply, response) = oneshot::channel();
        let tx = self.worker_for(scope).await;
        tx.send(ScopeJob::Command {
            actor,
            command,
            reply,
        })
        .await
        .map_err(|_| CommandRejected::Internal("dispatcher shut down".to_string()))?;
        response
            .await
            .map_err(|_| CommandRejected::Internal("dispatcher shut down".to_string()))?
    }

    /// Enqueue a registry reconciliation for the scope, typically after a
    /// reconnect.
    pub async fn reconcile(&self, scope: ScopeId) {
        let tx = self.worker_for(scope).await;
        if tx.send(ScopeJob::Reconcile).await.is_err() {
            warn!(%scope, "scope worker gone; reconcile dropped");
        }
    }

    /// Stop accepting work and wait for every queue to drain.
    pub async fn shutdown(self) {
        let workers = {
            let mut map = self.workers.lock().await;
            std::mem::take(&mut *map)
        };
        let handles: Vec<_> = workers
            .into_values()
            .map(|worker| {
                // Dropping the sender closes the queue; the worker exits
                // after finishing what was already enqueued.
                drop(worker.tx);
                worker.handle
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            if let Err(err) = result {
                warn!(error = %err, "scope worker panicked during shutdown");
            }
        }
    }

    async fn worker_for(&self, scope: ScopeId) -> mpsc::Sender<ScopeJob> {
        let mut workers = self.workers.lock().await;
        if let Some(worker) = workers.get(&scope) {
            if !worker.tx.is_closed() {
                return worker.tx.clone();
            }
        }
        let (tx, rx) = mpsc::channel(SCOPE_QUEUE_DEPTH);
        let handle = tokio::spawn(run_worker(scope, self.lifecycle.clone(), rx));
        workers.insert(
            scope,
            Worker {
                tx: tx.clone(),
                handle,
            },
        );
        tx
    }
}

/// One scope's serial loop. A job is fully applied before the next is
/// taken off the queue; this is the ordering guarantee everything else
/// leans on.
async fn run_worker(
    scope: ScopeId,
    lifecycle: Arc<RoomLifecycle>,
    mut rx: mpsc::Receiver<ScopeJob>,
) {
    debug!(%scope, "scope worker started");
    while let Some(job) = rx.recv().await {
        match job {
            ScopeJob::Presence(transition) => {
                if transition.is_noop() {
                    continue;
                }
                // One transition can be a leave and a join at once, so all
                // three checks run against the same event, in this order.
                lifecycle.maybe_provision(&transition).await;
                lifecycle.maybe_admit(&transition).await;
                lifecycle.maybe_drain(&transition).await;
            }
            ScopeJob::Command {
                actor,
                command,
                reply,
            } => {
                let result = lifecycle.handle_command(scope, actor, command).await;
                // The caller may have given up waiting; that is their call.
                let _ = reply.send(result);
            }
            ScopeJob::Reconcile => {
                lifecycle.reconcile(scope).await;
            }
        }
    }
    debug!(%scope, "scope worker stopped");
}
