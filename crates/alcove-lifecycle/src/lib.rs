//! Alcove Lifecycle - the room state machine
//!
//! Drives a room from `Provisioning` through `Active` to `Draining` and
//! `Destroyed` in response to presence transitions, and applies the
//! owner/admin command surface (lock, capacity, blacklist, claim, rename,
//! release). Registry mutation, access decisions, and host side effects
//! all happen here; ordering between events of one scope is provided by
//! alcove-dispatch.

#![deny(unsafe_code)]

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod retry;

pub use command::{CommandAck, CommandRejected, RoomCommand};
pub use config::LifecycleConfig;
pub use engine::RoomLifecycle;
pub use error::{LifecycleError, Result};
pub use retry::RetryPolicy;
