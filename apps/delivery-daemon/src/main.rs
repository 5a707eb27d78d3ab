//! Control-core process entry point.
//!
//! Wires the microcontroller serial link, the laser scanner thread, the
//! navigator, and the delivery collaborators into one `Orchestrator`, then
//! ticks it at a fixed rate until interrupted. Every collaborator this
//! core treats as external (order database, audio, QR capture, load
//! confirmation) is given a concrete default backend here; none of that
//! lives in the library crates.

mod collaborators;
mod laser;
mod serial_adapters;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use delivery_map::OccupancyMap;
use delivery_nav::{MotionControllerConfig, Navigator, NavigatorConfig, ParticleFilterConfig, PersonDetectorConfig};
use delivery_orchestrator::{Orchestrator, OrchestratorConfig};
use delivery_protocol::{Pose, TelemetryLine};
use delivery_serial::{PipelineConfig, SerialPortLink};
use delivery_tools::config::DeliveryConfig;
use tracing::{error, info, warn};

use collaborators::{FileOrderDatabase, FileQrScanner, LaserPersonDetector, ProcessAudioSink, TcpLoadConfirmationSource};
use serial_adapters::SerialSink;

#[derive(Parser, Debug)]
#[command(name = "delivery-daemon")]
#[command(about = "Control-core process for the indoor delivery robot", long_about = None)]
struct Args {
    /// Path to the daemon's TOML configuration file.
    #[arg(long, default_value = "delivery.toml")]
    config: String,

    /// Overrides the occupancy map path from the config file.
    #[arg(long)]
    map: Option<String>,

    /// Starting pose, overriding `home` from the config (useful when the
    /// robot is powered on somewhere other than its nominal dock).
    #[arg(long, num_args = 3, value_names = ["X", "Y", "THETA"])]
    start_pose: Option<Vec<f64>>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("delivery_daemon=info".parse().unwrap()),
        )
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "delivery daemon exiting with error");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = DeliveryConfig::load_from_file(&args.config)?;
    let map_path = args.map.as_deref().unwrap_or(&config.map_path);
    let raw_map = OccupancyMap::load_from_file(map_path)?;

    let start_pose = match args.start_pose.as_deref() {
        Some([x, y, theta]) => Pose::new(*x, *y, *theta),
        Some(_) => anyhow::bail!("--start-pose takes exactly three values: X Y THETA"),
        None => Pose::new(config.home.0, config.home.1, 0.0),
    };

    let nav_config = NavigatorConfig {
        particle_filter: ParticleFilterConfig { particle_count: config.particle_count, ..Default::default() },
        motion: MotionControllerConfig {
            linear_gains: delivery_nav::PidGains {
                kp: config.linear_pid.kp,
                ki: config.linear_pid.ki,
                kd: config.linear_pid.kd,
            },
            angular_gains: delivery_nav::PidGains {
                kp: config.angular_pid.kp,
                ki: config.angular_pid.ki,
                kd: config.angular_pid.kd,
            },
            ..Default::default()
        },
        obstacle_clearance_m: config.obstacle_clearance_m,
        ..Default::default()
    };

    let mut rng = rand::thread_rng();
    let navigator = Arc::new(Navigator::new(nav_config, raw_map, start_pose, &mut rng));

    info!(port = %config.serial_port, baud = config.serial_baud, "opening microcontroller serial link");
    let link = SerialPortLink::open(&config.serial_port, config.serial_baud)?;
    let pipeline = delivery_serial::spawn(link, PipelineConfig::default())?;
    let command_sender = pipeline.commands;
    let telemetry_rx = pipeline.telemetry;

    let telemetry_navigator = navigator.clone();
    std::thread::spawn(move || {
        let mut telemetry_rng = rand::thread_rng();
        for line in telemetry_rx.iter() {
            match line {
                TelemetryLine::Encoder { left_ticks, right_ticks } => {
                    telemetry_navigator.on_encoder_tick(left_ticks, right_ticks, &mut telemetry_rng);
                }
                TelemetryLine::Ir { raw } => telemetry_navigator.on_ir_reading(raw),
                TelemetryLine::Ack => {}
                TelemetryLine::Error(message) => {
                    warn!(message, "microcontroller rejected the last command");
                }
            }
        }
    });

    let last_scan = Arc::new(Mutex::new(None));
    let _laser_handle = laser::spawn(config.lidar_device.clone(), config.lidar_baud, navigator.clone(), last_scan.clone());

    let motor_sink = Arc::new(SerialSink::new(command_sender.clone()));
    let command_sink = Arc::new(SerialSink::new(command_sender));

    let order_db = Arc::new(FileOrderDatabase::load(&config.order_db_path)?);
    let audio = Arc::new(ProcessAudioSink::new(config.audio_clip_dir.clone(), "aplay"));
    let person_detector = Arc::new(LaserPersonDetector::new(
        navigator.clone(),
        last_scan,
        PersonDetectorConfig::default(),
    ));
    let qr_scanner = Arc::new(FileQrScanner::new(config.qr_source_path.clone(), Duration::from_secs(30)));
    let load_confirmation = Box::new(TcpLoadConfirmationSource::bind(&config.load_confirmation_addr)?);

    let orchestrator_config = OrchestratorConfig::from_delivery_config(&config);
    let mut orchestrator = Orchestrator::new(
        orchestrator_config,
        navigator,
        motor_sink,
        command_sink,
        order_db,
        audio,
        person_detector,
        qr_scanner,
        load_confirmation,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("interrupt received, finishing current tick and shutting down");
        shutdown_handler.store(true, Ordering::SeqCst);
    })?;

    let tick_interval = Duration::from_secs_f64(1.0 / config.tick_hz);
    info!(tick_hz = config.tick_hz, "entering tick loop");
    while !shutdown.load(Ordering::SeqCst) {
        let started = std::time::Instant::now();
        orchestrator.tick();
        spin_sleep::sleep(tick_interval.saturating_sub(started.elapsed()));
    }

    orchestrator.shutdown();
    info!("shutdown complete");
    Ok(())
}
