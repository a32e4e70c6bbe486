//! Runtime Configuration Module
//!
//! Loads the simulation runtime configuration from built-in defaults, an
//! optional TOML file and `SIM_` environment variables, in that order of
//! precedence (later sources win).
//!
//! Nested keys use `__` in environment variables:
//! `SIM_CLOCK__TIME_SCALE=2.0` overrides `clock.time_scale`.

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "SIM";

/// Main runtime configuration structure
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub global: GlobalConfig,
    pub clock: ClockConfig,
    pub replay: ReplayConfig,
}

/// Identity and logging
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Name of the local machine identity stamped on every message
    pub machine_name: String,
    /// `EnvFilter` directive, e.g. `info` or `sim_replay=debug,info`
    pub log_level: String,
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    pub time_scale: f64,
    /// Wall clock seconds per simulation step
    pub fixed_step_secs: f64,
    pub start_paused: bool,
}

/// Log backend of the replay recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    #[default]
    Memory,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub enabled: bool,
    pub stream: StreamKind,
    /// Directory of binary logs; `~` and `$VARS` are expanded on load
    pub log_directory: PathBuf,
    pub log_file: String,
    /// Seconds between automatic keyframes; 0 disables them
    pub auto_keyframe_interval: f64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            machine_name: "local".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            fixed_step_secs: 1.0 / 60.0,
            start_paused: false,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stream: StreamKind::Memory,
            log_directory: PathBuf::from("./replays"),
            log_file: "default_log".to_string(),
            auto_keyframe_interval: 30.0,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    /// Environment source used by [`RuntimeConfig::load`]
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Load with an explicit environment source
    pub fn load_with_env(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading runtime config: {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(environment);

        let mut config: RuntimeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.expand_paths()?;
        config.validate()?;
        debug!("Runtime config: {:?}", config);
        Ok(config)
    }

    /// Expand `~` and environment variables in path values
    pub fn expand_paths(&mut self) -> Result<()> {
        let raw = self.replay.log_directory.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&raw)
            .with_context(|| format!("Failed to expand log directory '{}'", raw))?;
        self.replay.log_directory = PathBuf::from(expanded.as_ref());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.global.machine_name.trim().is_empty(),
            "global.machine_name must not be empty"
        );
        ensure!(
            self.clock.time_scale.is_finite() && self.clock.time_scale > 0.0,
            "clock.time_scale must be positive, got {}",
            self.clock.time_scale
        );
        ensure!(
            self.clock.fixed_step_secs.is_finite() && self.clock.fixed_step_secs > 0.0,
            "clock.fixed_step_secs must be positive, got {}",
            self.clock.fixed_step_secs
        );
        ensure!(
            self.replay.auto_keyframe_interval.is_finite()
                && self.replay.auto_keyframe_interval >= 0.0,
            "replay.auto_keyframe_interval must be zero or positive, got {}",
            self.replay.auto_keyframe_interval
        );
        ensure!(
            !self.replay.log_file.trim().is_empty(),
            "replay.log_file must not be empty"
        );
        Ok(())
    }

    /// Render as TOML, e.g. to write a starting config file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Convenience function to load configuration from an optional file
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    RuntimeConfig::load(path)
}
