//! # Pivot Control
//!
//! Runs the shooter pivot against the simulated plant at the configured
//! cycle rate. Each `--target` is held for `--hold-cycles` cycles in turn;
//! every channel write is appended to the JSON-lines telemetry log.

use clap::Parser;
use pivot_common::prelude::*;
use pivot_control::cycle::CycleRunner;
use pivot_control::hal::simulation::{PlantParams, SimFlywheel, SimulatedPivot};
use pivot_control::sensor::AngleSensor;
use pivot_control::subsystem::PositionSubsystem;
use pivot_control::telemetry::{JsonLinesSink, LogSink, NullSink, TelemetryRegistry};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Shooter pivot position control loop (simulated plant)
#[derive(Parser, Debug)]
#[command(name = "pivot_control")]
#[command(version)]
#[command(about = "Single-axis pivot position control with telemetry logging")]
struct Args {
    /// Path to the pivot configuration TOML.
    #[arg(long, default_value = "config/pivot.toml")]
    config: PathBuf,

    /// Target angle [deg]. Repeat for a schedule.
    #[arg(long = "target", value_name = "DEG", default_values_t = [60.0])]
    targets: Vec<f64>,

    /// Cycles to hold each target.
    #[arg(long, default_value_t = 150)]
    hold_cycles: u64,

    /// Constant reference (arm) angle subtracted from the encoder angle [deg].
    #[arg(long, value_name = "DEG")]
    arm_angle: Option<f64>,

    /// Flywheel velocity request sent once at startup.
    #[arg(long)]
    shoot_velocity: Option<f64>,

    /// Telemetry log file; overrides `[telemetry] log_path`.
    #[arg(long, value_name = "FILE")]
    log_path: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = PivotConfig::load_validated(&args.config);

    let default_level = match &config {
        Ok(c) => c.shared.log_level.as_directive(),
        Err(_) => LogLevel::Info.as_directive(),
    };
    setup_tracing(&args, default_level);

    info!("Pivot Control v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Pivot Control shutdown complete");
}

fn run(args: &Args, config: &PivotConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, cycle_time={}µs, kp={}, ki={}, kd={}",
        config.shared.service_name,
        config.cycle.cycle_time_us,
        config.rotation.kp,
        config.rotation.ki,
        config.rotation.kd,
    );

    // ── Telemetry ──
    let log_path = args
        .log_path
        .clone()
        .or_else(|| config.telemetry.log_path.as_ref().map(PathBuf::from));
    let sink: Arc<dyn LogSink> = match log_path {
        Some(path) => {
            let sink = JsonLinesSink::create(&path)?;
            info!("Telemetry log: {}", path.display());
            Arc::new(sink)
        }
        None => {
            warn!("No telemetry log path configured; durable log disabled");
            Arc::new(NullSink)
        }
    };
    let registry = TelemetryRegistry::new(config.telemetry.namespace.clone(), sink)
        .with_history_capacity(config.telemetry.history_capacity);

    // ── Plant + subsystem ──
    let pivot = SimulatedPivot::new(PlantParams::default());
    let mut sensor = AngleSensor::new(Box::new(pivot.encoder()));
    if let Some(arm) = args.arm_angle {
        sensor = sensor.with_reference(Box::new(move || arm));
    }
    let flywheel = SimFlywheel::new();
    let mut subsystem = PositionSubsystem::new(
        &config.rotation,
        sensor,
        Box::new(pivot.motor()),
        &registry,
    )
    .with_flywheel(Box::new(flywheel.clone()));

    if let Some(velocity) = args.shoot_velocity {
        subsystem.set_shoot_velocity(velocity);
    }

    // ── Cycle loop ──
    let total_cycles = args.hold_cycles * args.targets.len() as u64;
    let mut runner = CycleRunner::new(&config.cycle).with_max_cycles(total_cycles);
    let period = runner.period();

    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let targets = &args.targets;
    let hold = args.hold_cycles.max(1);
    runner.run(|cycle| {
        if cycle % hold == 0 {
            let index = (cycle / hold) as usize;
            if let Some(&target) = targets.get(index) {
                match subsystem.command(target) {
                    Ok(()) => info!(target_deg = target, cycle, "Commanding pivot"),
                    Err(e) => warn!(cycle, "Target rejected: {e}"),
                }
            }
        }

        subsystem.step();
        pivot.advance(period);

        if (cycle + 1) % hold == 0 {
            info!(
                cycle,
                angle = subsystem.last_sample().angle,
                at_target = subsystem.is_at_target(),
                faults = ?subsystem.faults(),
                "Hold window complete"
            );
        }
    });

    // ── Shutdown ──
    subsystem.shutdown();
    registry.flush()?;

    for (key, value) in registry.snapshot() {
        info!("{key} = {value:.4}");
    }
    if flywheel.last().velocity.is_some() {
        info!("Flywheel last command: {:?}", flywheel.last());
    }
    Ok(())
}

fn setup_tracing(args: &Args, default_level: &str) {
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

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
