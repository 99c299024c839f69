//! Alcove Platform - the host capability surface
//!
//! The lifecycle engine never talks to the chat platform directly; it
//! consumes the narrow [`HostPlatform`] trait defined here. The connection
//! layer implements it against the real platform API, and [`InMemoryHost`]
//! implements it against a simulated guild for tests and the playground.

#![deny(unsafe_code)]

pub mod error;
pub mod host;
pub mod memory;

pub use error::{HostError, HostResult};
pub use host::HostPlatform;
pub use memory::{HostCall, InMemoryHost};
