//! # Simulation Runtime Configuration
//!
//! Layered configuration for the simulation runtime and the logging setup
//! every binary shares.
//!
//! ## Sources
//!
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. `SIM_` environment variables, `__` separating nested keys
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sim_config::{init_logging, load_config};
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("config/runtime.toml"))).unwrap();
//! init_logging(&config.global).unwrap();
//! println!("stepping every {}s", config.clock.fixed_step_secs);
//! ```

pub mod logging;
pub mod runtime_config;

// Re-export commonly used types
pub use logging::{env_filter, init_logging};
pub use runtime_config::{
    load_config, ClockConfig, GlobalConfig, ReplayConfig, RuntimeConfig, StreamKind, ENV_PREFIX,
};
