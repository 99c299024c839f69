//! Alcove Types - Core types for the ephemeral room lifecycle engine
//!
//! Alcove watches presence transitions in a chat platform scope (a guild)
//! and provisions, governs, and tears down ephemeral voice rooms owned by
//! the actors who trigger them.
//!
//! ## Architectural Boundaries
//!
//! - **alcove-registry** owns: the authoritative room store and owner index
//! - **alcove-access** owns: join/administer decisions over room snapshots
//! - **alcove-lifecycle** owns: the provision/admit/claim/drain state machine
//! - **alcove-dispatch** owns: per-scope event ordering
//!
//! This crate carries only the shared vocabulary: identifiers, presence
//! transitions, room records, scope bindings, and the observability stream.

#![deny(unsafe_code)]

pub mod binding;
pub mod events;
pub mod ids;
pub mod presence;
pub mod room;

// Re-export main types
pub use binding::ScopeBinding;
pub use events::{EventSeverity, RoomEvent, RoomEventEnvelope};
pub use ids::{ActorId, ChannelId, ScopeId};
pub use presence::PresenceTransition;
pub use room::{RoomRecord, RoomState, MAX_ROOM_CAPACITY};
