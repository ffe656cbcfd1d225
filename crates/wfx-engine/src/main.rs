//! `wfx`: windowed feature extraction over many recordings

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wfx_core::UnitId;
use wfx_engine::source::save_recording;
use wfx_engine::{EngineConfig, RunContext};
use wfx_simulation::{RecordingSimulator, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "wfx", version, about = "Resumable, parallel windowed feature extraction")]
struct Cli {
    /// Log filter, e.g. `info` or `wfx_engine=debug`; defaults to RUST_LOG, then `info`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract features for every requested unit and merge the final table
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Units to process, overriding the configuration file
        #[arg(long, num_args = 1..)]
        units: Option<Vec<String>>,
        /// Worker threads (0 = available parallelism)
        #[arg(long)]
        workers: Option<usize>,
        /// Process units one at a time on the main thread
        #[arg(long, conflicts_with = "workers")]
        serial: bool,
        /// Reprocess units that already have results
        #[arg(long)]
        force: bool,
        /// Keep per-unit partial artifacts after merging
        #[arg(long)]
        keep_partials: bool,
    },
    /// Print the output column layout for a configuration
    Schema {
        #[arg(long)]
        config: PathBuf,
    },
    /// Write a configuration file with the default EEG preset
    Init {
        #[arg(long, default_value = "wfx.json")]
        out: PathBuf,
    },
    /// Write synthetic recordings for demos and smoke tests
    Simulate {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, num_args = 1.., required = true)]
        units: Vec<String>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Run { config, units, workers, serial, force, keep_partials } => {
            let mut engine = EngineConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            if let Some(units) = units {
                engine.run.units = units;
            }
            if let Some(workers) = workers {
                engine.run.workers = workers;
            }
            if serial {
                engine.run.workers = 1;
            }
            engine.run.force |= force;
            engine.run.keep_partials |= keep_partials;

            let ctx = RunContext::new(engine).context("invalid configuration")?;
            let report = wfx_engine::run(Arc::new(ctx)).context("run failed")?;
            println!("{}", report);
        }
        Command::Schema { config } => {
            let engine = EngineConfig::load(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let validated = engine.extraction.validate().context("invalid configuration")?;
            for column in validated.schema().columns() {
                println!("{}", column);
            }
        }
        Command::Init { out } => {
            let json = EngineConfig::default().to_json()?;
            std::fs::write(&out, json).with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), "default configuration written");
        }
        Command::Simulate { out, units, seed } => {
            for (i, raw) in units.iter().enumerate() {
                let unit = UnitId::new(raw.as_str())?;
                let config = SimulationConfig { seed: Some(seed + i as u64), ..SimulationConfig::default() };
                let recording = RecordingSimulator::new(config)?.generate()?;
                let path = out.join(format!("{}.json", unit));
                save_recording(&path, &recording)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(unit = %unit, path = %path.display(), "recording written");
            }
        }
    }

    Ok(())
}
