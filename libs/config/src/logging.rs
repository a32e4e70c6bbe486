//! Logging initialisation
//!
//! Installs the global `tracing` subscriber from [`GlobalConfig`]. `RUST_LOG`
//! takes precedence over the configured level.

use crate::runtime_config::GlobalConfig;
use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter for `global`
pub fn env_filter(global: &GlobalConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&global.log_level)
            .with_context(|| format!("Invalid log level '{}'", global.log_level)),
    }
}

/// Install the global subscriber; a second call leaves the first one in place
pub fn init_logging(global: &GlobalConfig) -> Result<()> {
    let filter = env_filter(global)?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if global.json_logs {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    if installed.is_err() {
        debug!("Global tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_level_is_an_error() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let global = GlobalConfig {
            log_level: "sim_actors=loud".into(),
            ..GlobalConfig::default()
        };
        assert!(env_filter(&global).is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let global = GlobalConfig::default();
        init_logging(&global).unwrap();
        init_logging(&global).unwrap();
    }
}
