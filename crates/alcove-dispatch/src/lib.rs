//! Alcove Dispatch - per-scope event ordering
//!
//! The load-bearing guarantee of the whole engine: all presence events,
//! commands, and reconciles for one scope are applied strictly one at a
//! time, in arrival order, while different scopes proceed in parallel.
//! Without this, a leave and a join hitting the same room in the same
//! instant could race the registry.

#![deny(unsafe_code)]

pub mod dispatcher;

pub use dispatcher::ScopeDispatcher;
