#![forbid(unsafe_code)]

//! Agent keep-in-touch supervision: session liveness tracking and
//! completion gating over a shared `SQLite` store.
//!
//! Agents report in on a fixed cadence; permission to mark a task
//! complete is derived from how recently they did. Embed [`Supervisor`]
//! for the full surface, or wire the components in
//! [`supervisor`] individually.

pub mod audit;
pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod supervisor;

pub use config::SupervisorConfig;
pub use errors::{AppError, Result};
pub use supervisor::Supervisor;
