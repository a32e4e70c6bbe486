//! # Simulation Types Library
//!
//! Shared vocabulary of the simulation runtime: identifiers, message types,
//! typed parameters and payloads.
//!
//! ## Design Philosophy
//!
//! - **Fail-Closed Payload Access**: every typed read names the parameter and
//!   the expected kind; mismatches are [`MessageError`]s, never coercions
//! - **Immutable Dispatch**: messages are built by value and consumed by
//!   reference once handed to the orchestrator
//! - **Stable Identity**: [`ActorId`] survives record and replay so keyframes
//!   can recreate actors under their original ids
//!
//! ## Quick Start
//!
//! ```rust
//! use sim_types::{ActorId, MachineInfo, MessageFactory, MessageType, TimerElapsedPayload};
//!
//! let factory = MessageFactory::new(MachineInfo::new("local"));
//! let actor = ActorId::new();
//! let message = factory
//!     .create_with(
//!         MessageType::TimerElapsed,
//!         &TimerElapsedPayload { timer_name: "heartbeat".into(), late_time: 0.0 },
//!     )
//!     .unwrap()
//!     .with_about_actor(actor);
//!
//! let payload: TimerElapsedPayload = message.payload().unwrap();
//! assert_eq!(payload.timer_name, "heartbeat");
//! ```

pub mod common;
pub mod message_type;
pub mod messages;
pub mod parameters;
pub mod payloads;

pub use common::errors::MessageError;
pub use common::identifiers::{ActorId, ActorType, MachineInfo};
pub use message_type::{MessageCategory, MessageType};
pub use messages::{Message, MessageFactory, MessagePayload};
pub use parameters::{FromParameter, ParameterValue, Parameters};
pub use payloads::{
    ActorUpdatePayload, KeyframeTransactionPayload, MapChangedPayload, RequestRejectedPayload,
    StateChangedPayload, StateTransitionRequest, TickPayload, TimerElapsedPayload,
};

/// Microseconds per second, the resolution of simulation clocks
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Convert seconds to whole microseconds, clamping negative and non-finite values to zero
pub fn seconds_to_micros(seconds: f64) -> u64 {
    if seconds <= 0.0 || !seconds.is_finite() {
        0
    } else {
        (seconds * MICROS_PER_SECOND).round() as u64
    }
}

pub fn micros_to_seconds(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_SECOND
}
