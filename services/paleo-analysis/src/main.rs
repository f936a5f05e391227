//! Paleoclimate forcing analysis.
//!
//! Runs the full anomaly / EOF / correlation / spectral pipeline once and
//! exits. Exit status is non-zero on any failure.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use paleo_analysis::{Analysis, AnalysisConfig, BackendKind, RunOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "paleo-analysis")]
#[command(about = "Forcing-response analysis of paleoclimate simulation ensembles")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "PALEO_CONFIG", default_value = "config/analysis.yaml")]
    config: PathBuf,

    /// Log level (overrides the configuration file; RUST_LOG overrides both)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Decomposition backend (overrides the configuration file)
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Recompute the EOF decomposition even when a cached entry matches
    #[arg(long)]
    refresh_eof: bool,

    /// Skip writing figures
    #[arg(long)]
    skip_render: bool,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = AnalysisConfig::load(&args.config)?;
    if let Some(backend) = args.backend {
        config.backend = backend;
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, args.json_logs || config.logging.json)?;

    info!(
        config = %args.config.display(),
        runs = config.runs.len(),
        backend = ?config.backend,
        "Starting paleo-analysis"
    );

    netcdf_parser::silence_hdf5_errors();

    let options = RunOptions {
        refresh_eof: args.refresh_eof,
        skip_render: args.skip_render,
    };
    let report = Analysis::new(config, options).run()?;

    info!(
        modes = report.eof.modes,
        reused = report.eof.reused,
        figures = report.figures.len(),
        "Done"
    );
    Ok(())
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
    }
}
