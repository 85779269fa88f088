//! # AQUA Scan Engine
//!
//! Deterministic scan-cycle controller for a small water-treatment
//! plant. Loads the engine configuration, performs RT setup (no-op in
//! simulation mode), and enters the fixed-period scan loop over a
//! shared register image until SIGINT.
//!
//! The network transport that exposes the register image to remote
//! clients runs as a separate collaborator; this binary only drives the
//! engine side of the image.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use aqua_common::config::EngineConfig;
use aqua_common::registers::RegisterImage;
use aqua_engine::config::load_config;
use aqua_engine::cycle::{rt_setup, ScanRunner};

/// AQUA Scan Engine: deterministic water-treatment control loop
#[derive(Parser, Debug)]
#[command(name = "aqua_engine")]
#[command(version)]
#[command(about = "Fixed-period scan-cycle controller for a water-treatment plant")]
struct Args {
    /// Path to the engine configuration TOML. Built-in defaults are
    /// used when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// CPU core to pin the scan thread to (rt feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt feature only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("AQUA Scan Engine v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("AQUA Scan Engine shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_config(path)?
        }
        None => {
            info!("No config file given, using built-in defaults");
            let config = EngineConfig::default();
            config.validate().map_err(|e| format!("default config invalid: {e}"))?;
            config
        }
    };

    info!(
        "Config OK: cycle_time={}ms, filter_delay={}s, uv_delay={}s",
        config.cycle_time_ms, config.filter_delay_s, config.uv_delay_s,
    );

    // RT setup (mlockall, affinity, scheduler). No-op without `rt`.
    rt_setup(args.cpu_core, args.rt_priority)?;

    let image = Arc::new(RegisterImage::new());
    let mut runner = ScanRunner::new(&config, Arc::clone(&image));
    info!("ScanRunner initialized, entering scan loop");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    runner.run(&running)?;

    let stats = &runner.stats;
    info!(
        "Scan loop exited after {} cycles (avg {}µs, max {}µs, {} overruns)",
        stats.cycle_count,
        stats.avg_cycle_ns() / 1_000,
        stats.max_cycle_ns / 1_000,
        stats.overruns,
    );

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
