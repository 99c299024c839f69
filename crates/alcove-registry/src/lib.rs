//! Alcove Registry - the single source of truth for live rooms
//!
//! Maps room id to its [`alcove_types::RoomRecord`] and owner to room. All
//! other components read and mutate records exclusively through the
//! transactional surface here; none of them caches a record across an
//! event boundary. The two-phase owner index (reserve, then commit) is
//! what makes racing provision attempts collapse into exactly one room.

#![deny(unsafe_code)]

pub mod error;
pub mod registry;

pub use error::{RegistryError, Result};
pub use registry::{OwnerReservation, RoomRegistry};
