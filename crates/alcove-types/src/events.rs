//! Event types for alcove observability
//!
//! Events provide a unified stream of room lifecycle activity for dashboards
//! and tests. They are emitted after the corresponding registry mutation has
//! been committed and are purely informational.

use crate::ids::{ActorId, ChannelId, ScopeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all alcove events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEventEnvelope {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Scope the event originated in
    pub scope: ScopeId,

    /// Event severity
    pub severity: EventSeverity,

    /// The actual event
    pub event: RoomEvent,
}

impl RoomEventEnvelope {
    pub fn new(scope: ScopeId, severity: EventSeverity, event: RoomEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            scope,
            severity,
            event,
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level event
    Debug,
    /// Informational event
    Info,
    /// Warning event
    Warning,
    /// Error event
    Error,
}

/// Room lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoomEvent {
    /// A room was provisioned and its owner relocated into it.
    RoomProvisioned {
        room: ChannelId,
        owner: ActorId,
    },

    /// A trigger join was rejected before any room was created.
    ProvisionRejected {
        actor: ActorId,
        reason: String,
    },

    /// An actor was admitted into a tracked room.
    AdmitAllowed {
        room: ChannelId,
        actor: ActorId,
        member_count: u32,
    },

    /// An actor was denied entry and relocated out.
    AdmitDenied {
        room: ChannelId,
        actor: ActorId,
        reason: String,
    },

    /// Ownership transferred via claim.
    OwnerClaimed {
        room: ChannelId,
        previous_owner: ActorId,
        new_owner: ActorId,
    },

    /// A room emptied and was deleted.
    RoomDestroyed {
        room: ChannelId,
    },

    /// Host-side deletion kept failing; the registry entry was force-removed
    /// and the channel may survive on the platform.
    RoomLeaked {
        room: ChannelId,
        attempts: u32,
    },

    /// Registry reconciled against the live host state after a reconnect.
    RegistryReconciled {
        pruned: usize,
        drained: usize,
    },

    /// An owner/admin command mutated a room.
    CommandApplied {
        room: ChannelId,
        actor: ActorId,
        description: String,
    },

    /// An owner/admin command was rejected.
    CommandRejected {
        actor: ActorId,
        description: String,
    },
}
