//! sentryd - single-camera motion watcher daemon
//!
//! This daemon:
//! 1. Opens the configured capture device, negotiating the best resolution
//! 2. Buffers recent frames in a bounded ring buffer
//! 3. Scores motion by differencing consecutive blurred grayscale frames
//! 4. Sends annotated snapshots, hourly snapshots, and failure notices to a
//!    Telegram chat
//! 5. Answers remote `/snapshot`, `/clip`, and `/status` commands
//!
//! The camera is waited for indefinitely: if the device disappears, the
//! daemon notifies the chat and re-acquires it at a fixed interval.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use motion_sentry::{
    CameraConfig, CameraSource, MotionDetector, SentryConfig, SurveillanceLoop,
    TelegramCommandChannel, TelegramDispatcher,
};

#[derive(Parser)]
#[command(name = "sentryd", about = "Single-camera motion watcher daemon")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "SENTRY_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = SentryConfig::load_from(args.config.as_deref())?;

    let stop = Arc::new(AtomicBool::new(false));
    let ctrlc_stop = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        ctrlc_stop.store(true, Ordering::Relaxed);
    })?;

    let source = CameraSource::new(CameraConfig {
        device: cfg.camera.device.clone(),
        resolutions: cfg.camera.resolutions.clone(),
    })?;
    let dispatcher = TelegramDispatcher::new(cfg.telegram.clone());
    let commands = TelegramCommandChannel::new(cfg.telegram.clone());
    let detector = MotionDetector::new(cfg.detector.clone());

    log::info!(
        "sentryd watching {} (tick {:?}, buffer {} frames)",
        cfg.camera.device,
        cfg.runtime.tick_interval,
        cfg.runtime.buffer_capacity
    );

    let mut sentry = SurveillanceLoop::new(
        source,
        dispatcher,
        commands,
        detector,
        cfg.runtime.clone(),
        stop,
    );
    sentry.run();

    log::info!("sentryd stopped");
    Ok(())
}
