//! Bee Colony Simulation
//!
//! Headless driver: builds a colony, runs it for a number of ticks and
//! optionally records snapshots as JSON lines.

use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use colony_core::config::{ColonyConfig, DEFAULT_TUNING_PATH};
use colony_core::output::write_snapshot_line;
use colony_core::{SignalKind, Simulation};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "bee_colony")]
#[command(about = "A stigmergic bee colony simulation")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate (defaults to simulation.default_ticks)
    #[arg(long)]
    ticks: Option<u64>,

    /// Seconds per tick (defaults to simulation.default_dt)
    #[arg(long)]
    dt: Option<f32>,

    /// TOML tuning file; colony.toml is used when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the starting worker count
    #[arg(long)]
    workers: Option<usize>,

    /// Override the starting drone count
    #[arg(long)]
    drones: Option<usize>,

    /// Interval between snapshots (in ticks)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Append snapshots to this file as JSON lines
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ColonyConfig, colony_core::ConfigError> {
    let mut config = match &args.config {
        Some(path) => ColonyConfig::from_file(path)?,
        None if Path::new(DEFAULT_TUNING_PATH).exists() => ColonyConfig::load_or_default(),
        None => ColonyConfig::default(),
    };
    if let Some(workers) = args.workers {
        config.spawn.workers = workers;
    }
    if let Some(drones) = args.drones {
        config.spawn.drones = drones;
    }
    if let Some(interval) = args.snapshot_interval {
        config.simulation.snapshot_interval = interval;
    }
    Ok(config)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Could not load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let ticks = args.ticks.unwrap_or(config.simulation.default_ticks);
    let dt = args.dt.unwrap_or(config.simulation.default_dt);

    let mut sim = match Simulation::new(config, args.seed) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Run {}: seed {}, {} ticks of {:.4}s", sim.run_id(), args.seed, ticks, dt);

    let mut out = match &args.snapshot_out {
        Some(path) => match File::options().create(true).append(true).open(path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                error!("Could not open {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(out) = out.as_mut() {
        let snapshot = sim.snapshot("simulation_start");
        if let Err(e) = write_snapshot_line(&snapshot, out) {
            error!("Could not write initial snapshot: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let progress_every = (ticks / 10).max(1);
    for tick in 1..=ticks {
        sim.step(dt);

        if let Some(out) = out.as_mut() {
            if sim.snapshot_due() {
                let snapshot = sim.snapshot("periodic");
                if let Err(e) = write_snapshot_line(&snapshot, out) {
                    error!("Could not write snapshot at tick {}: {}", tick, e);
                    return ExitCode::FAILURE;
                }
            }
        }

        if tick % progress_every == 0 {
            let hive = sim.hive();
            info!(
                "Tick {} / {}: {} bees, queue {:.2}, deposited {:.2}, waggles {}, trembles {}",
                tick,
                ticks,
                sim.population(),
                hive.queue(),
                hive.total_deposited(),
                sim.bus().count(SignalKind::Waggle),
                sim.bus().count(SignalKind::Tremble),
            );
        }
    }

    if let Some(mut out) = out {
        let snapshot = sim.snapshot("simulation_end");
        if let Err(e) = write_snapshot_line(&snapshot, &mut out).and_then(|_| out.flush()) {
            error!("Could not write final snapshot: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let hive = sim.hive();
    info!(
        "Simulation complete: {} ticks, {:.2} nectar deposited, {} hatched",
        ticks,
        hive.total_deposited(),
        hive.hatched_total()
    );
    ExitCode::SUCCESS
}
