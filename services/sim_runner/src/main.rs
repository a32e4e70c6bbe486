//! Simulation runner binary
//!
//! Usage:
//!   sim-runner --config config/runtime.toml --steps 600
//!   sim-runner --record --quit-after 30
//!   sim-runner --dump-config > runtime.toml

use anyhow::Result;
use clap::Parser;
use sim_config::{init_logging, RuntimeConfig};
use sim_runner::{build_system, finish, run};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sim-runner")]
#[command(about = "Simulation runtime driver")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many steps
    #[arg(short, long)]
    steps: Option<u64>,

    /// Start recording on the first step
    #[arg(long)]
    record: bool,

    /// Ask the application to quit once simulation time reaches this many seconds
    #[arg(long)]
    quit_after: Option<f64>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = RuntimeConfig::load(args.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        e
    })?;

    if args.dump_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&config.global)?;
    info!(
        "Starting simulation '{}' (step {:.4}s, scale {})",
        config.global.machine_name, config.clock.fixed_step_secs, config.clock.time_scale
    );
    if args.steps.is_none() && args.quit_after.is_none() {
        info!("No step limit or quit time, running until the application quits");
    }

    let mut system = build_system(&config, args.record).map_err(|e| {
        error!("Failed to build simulation: {:#}", e);
        e
    })?;

    let summary = run(
        &mut system,
        config.clock.fixed_step_secs,
        args.steps,
        args.quit_after,
    );
    finish(&mut system);

    info!(
        "Simulation finished after {} steps at {:.3}s (shutdown requested: {})",
        summary.steps, summary.simulation_time, summary.shutdown_requested
    );
    Ok(())
}
