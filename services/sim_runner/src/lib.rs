//! # Simulation Runner
//!
//! Builds an [`ActorSystem`](sim_actors::ActorSystem) from a
//! [`RuntimeConfig`](sim_config::RuntimeConfig) and steps it on a fixed step
//! until the application state machine shuts it down.

pub mod app;

pub use app::{application_state_machine, build_system, finish, run, Beacon, RunSummary};
