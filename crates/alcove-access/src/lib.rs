//! Alcove Access - join and administer decisions
//!
//! Pure decision logic over [`alcove_types::RoomRecord`] snapshots. The
//! lifecycle engine fetches whatever live facts a decision needs (admin
//! status, occupancy) and this crate ranks the denial reasons in a single
//! documented order: blacklist, then lock, then capacity.
//!
//! No side effects and no async: every function here is a plain function,
//! which is what makes the precedence rules property-testable.

#![deny(unsafe_code)]

pub mod decision;
pub mod error;
pub mod rules;

pub use decision::{DenyReason, JoinVerdict};
pub use error::CapacityError;
pub use rules::{can_administer, evaluate_join, validate_capacity};
