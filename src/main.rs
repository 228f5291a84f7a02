//! Touchless ATM kiosk: runs a scripted session or, with the `vision` feature, a live camera.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use touchless_atm::{
    bank::Ledger,
    config::{Config, EXAMPLE_CONFIG},
    events::KioskEvent,
    kiosk::{Kiosk, TickReport},
    script::{Script, ScriptedClassifier, ScriptedFaceDetector},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Replay a scripted session instead of using a camera
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Use the live camera (requires the `vision` feature)
    #[arg(long)]
    camera: bool,

    /// Override the tick rate from the configuration
    #[arg(long)]
    fps: Option<u32>,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{}", EXAMPLE_CONFIG);
        return Ok(());
    }

    info!("Touchless ATM kiosk");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(fps) = args.fps {
        config.camera.fps = fps;
    }
    config.validate()?;

    let bank = Ledger::from_config(&config.security).context("opening ledger")?;

    if let Some(path) = &args.script {
        return run_script(&config, path, bank, args.max_ticks);
    }

    if args.camera {
        return run_camera(&config, bank, args.max_ticks);
    }

    bail!("nothing to run: pass --script <file> or --camera");
}

fn run_script(config: &Config, path: &Path, bank: Ledger, max_ticks: Option<u64>) -> Result<()> {
    let script = Script::from_file(path).with_context(|| format!("loading script {}", path.display()))?;
    let frames = script.frame_count();
    info!("Replaying {} scripted frames from {}", frames, path.display());

    let mut kiosk = Kiosk::new(
        config,
        Box::new(script.into_source()),
        Box::new(ScriptedFaceDetector),
        Box::new(ScriptedClassifier::new(&config.pointing)),
        Box::new(bank),
    )?;

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(config.camera.fps));
    let start = Instant::now();
    let limit = max_ticks.unwrap_or(frames).min(frames);

    for tick in 0..limit {
        // Scripted time advances at the configured frame rate without sleeping
        let now = start + frame_interval * u32::try_from(tick).unwrap_or(u32::MAX);
        log_report(&kiosk.tick(now));
    }

    info!("Script finished in state {}", kiosk.state());
    Ok(())
}

#[cfg(feature = "vision")]
fn run_camera(config: &Config, bank: Ledger, max_ticks: Option<u64>) -> Result<()> {
    use touchless_atm::{
        pointing::PointingClassifier,
        vision::{
            camera::OpenCvCamera,
            display::{KeyAction, KioskDisplay},
            haar::HaarFaceDetector,
            pose::OnnxPoseEstimator,
        },
    };

    config.validate_models()?;

    let camera = OpenCvCamera::from_config(&config.camera)?;
    let detector = HaarFaceDetector::new(&config.models.face_cascade)?;
    let estimator = OnnxPoseEstimator::new(&config.models.pose_model, config.pointing.pose_confidence)?;
    let classifier = PointingClassifier::from_config(estimator, &config.pointing);

    let mut kiosk = Kiosk::new(
        config,
        Box::new(camera),
        Box::new(detector),
        Box::new(classifier),
        Box::new(bank),
    )?;
    let mut display = KioskDisplay::new("Touchless ATM")?;

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(config.camera.fps));
    let mut ticks = 0u64;
    loop {
        let started = Instant::now();
        let report = kiosk.tick(started);
        log_report(&report);

        if let Some(frame) = &report.frame {
            display.render(frame, &report, kiosk.screen())?;
        }

        match display.poll_input(1)? {
            Some(KeyAction::Ui(event)) => kiosk.push_ui_event(event),
            Some(KeyAction::Quit) => {
                info!("Exit requested by user");
                break;
            }
            None => {}
        }

        ticks += 1;
        if max_ticks.map_or(false, |max| ticks >= max) {
            break;
        }

        if let Some(remaining) = frame_interval.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    info!("Kiosk shutting down");
    Ok(())
}

#[cfg(not(feature = "vision"))]
fn run_camera(_config: &Config, _bank: Ledger, _max_ticks: Option<u64>) -> Result<()> {
    bail!("camera mode needs the `vision` feature: cargo run --features vision -- --camera");
}

fn log_report<I>(report: &TickReport<I>) {
    for event in &report.events {
        match event {
            KioskEvent::StateChanged { from, to } => info!("Screen: {} -> {}", from, to),
            KioskEvent::TransactionFinished { transaction, success } => {
                info!("Transaction {:?} finished, success: {}", transaction, success);
            }
            KioskEvent::UserAbsent => warn!("User left the kiosk"),
            KioskEvent::Guidance(key) => info!("Guidance: {}", key),
            other => log::debug!("{:?}", other),
        }
    }
}
