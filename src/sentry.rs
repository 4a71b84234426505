//! The surveillance loop.
//!
//! A two-state machine drives the whole daemon:
//!
//! - `Acquiring`: no open session; `open()` is retried at a fixed interval,
//!   forever (wait-for-hardware, no backoff growth, no cap).
//! - `Running`: steady-state tick loop: read frame, buffer it, score motion,
//!   conditionally alert, check the hourly snapshot, poll remote commands,
//!   sleep.
//!
//! Any mid-session read failure tears the session down, emits a best-effort
//! failure text, and returns to `Acquiring`. Alert and command I/O failures
//! are logged and swallowed where they occur; they never abort a tick.
//!
//! Everything runs on one thread. The ring buffer and the grayscale baseline
//! are only ever touched between completed dispatches, so the buffer a remote
//! clip command sees is exactly the frames captured up to the most recently
//! completed tick.

use chrono::{DateTime, Local, Timelike};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::alert::AlertDispatcher;
use crate::annotate::draw_regions;
use crate::capture::{CaptureError, DeviceSession, FrameSource};
use crate::command::{CommandChannel, RemoteCommand};
use crate::config::RuntimeSettings;
use crate::detect::MotionDetector;
use crate::frame::{FrameRingBuffer, GrayFrame};

const SNAPSHOT_COMMAND: &str = "/snapshot";
const CLIP_COMMAND: &str = "/clip";
const STATUS_COMMAND: &str = "/status";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Acquiring,
    Running,
}

pub struct SurveillanceLoop<S, D, C> {
    source: S,
    dispatcher: D,
    commands: C,
    detector: MotionDetector,
    runtime: RuntimeSettings,
    stop: Arc<AtomicBool>,

    buffer: FrameRingBuffer,
    prev_gray: Option<GrayFrame>,
    last_hour_sent: Option<u32>,
    checkpoint: Option<i64>,
    session: Option<DeviceSession>,
}

impl<S, D, C> SurveillanceLoop<S, D, C>
where
    S: FrameSource,
    D: AlertDispatcher,
    C: CommandChannel,
{
    pub fn new(
        source: S,
        dispatcher: D,
        commands: C,
        detector: MotionDetector,
        runtime: RuntimeSettings,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let buffer = FrameRingBuffer::new(runtime.buffer_capacity);
        Self {
            source,
            dispatcher,
            commands,
            detector,
            runtime,
            stop,
            buffer,
            prev_gray: None,
            last_hour_sent: None,
            checkpoint: None,
            session: None,
        }
    }

    pub fn state(&self) -> LoopState {
        if self.session.is_some() {
            LoopState::Running
        } else {
            LoopState::Acquiring
        }
    }

    pub fn checkpoint(&self) -> Option<i64> {
        self.checkpoint
    }

    pub fn buffered_frames(&self) -> usize {
        self.buffer.len()
    }

    /// Run until the stop flag is raised. The process otherwise loops forever
    /// between acquisition and the steady-state tick loop.
    pub fn run(&mut self) {
        while !self.stop.load(Ordering::Relaxed) {
            self.acquire();
            if self.session.is_none() {
                // Stop was requested while waiting for the camera.
                break;
            }
            log::info!("surveillance running");

            loop {
                if self.stop.load(Ordering::Relaxed) {
                    return;
                }
                match self.tick() {
                    Ok(()) => thread::sleep(self.runtime.tick_interval),
                    Err(e) => {
                        log::warn!("camera session lost: {e}");
                        if let Err(send_err) =
                            self.dispatcher.send_text(&format!("Camera failure: {e}"))
                        {
                            log::warn!("failure alert dispatch failed: {send_err:#}");
                        }
                        self.source.release();
                        self.session = None;
                        self.prev_gray = None;
                        thread::sleep(self.runtime.retry_interval);
                        break;
                    }
                }
            }
        }
    }

    /// Retry `open()` at the fixed retry interval until it succeeds or the
    /// stop flag is raised. The ring buffer deliberately survives restarts;
    /// the grayscale baseline does not.
    pub fn acquire(&mut self) {
        while !self.stop.load(Ordering::Relaxed) {
            match self.source.open() {
                Ok(session) => {
                    match session.resolution {
                        Some((w, h)) => log::info!("camera session open at {w}x{h}"),
                        None => log::info!("camera session open at device default resolution"),
                    }
                    self.session = Some(session);
                    self.prev_gray = None;
                    self.last_hour_sent = Some(Local::now().hour());
                    return;
                }
                Err(e) => {
                    log::warn!(
                        "camera unavailable: {e}; retrying in {:?}",
                        self.runtime.retry_interval
                    );
                    thread::sleep(self.runtime.retry_interval);
                }
            }
        }
    }

    /// One steady-state tick at the current wall-clock time.
    pub fn tick(&mut self) -> Result<(), CaptureError> {
        self.tick_at(Local::now())
    }

    /// One steady-state tick. Only a frame read failure escalates; every
    /// dispatch failure is absorbed here.
    pub fn tick_at(&mut self, now: DateTime<Local>) -> Result<(), CaptureError> {
        let frame = self.source.read()?;
        self.buffer.push(&frame);

        let gray = self.detector.prepare(&frame);
        if let Some(prev) = &self.prev_gray {
            if let Some(event) = self.detector.detect(prev, &gray) {
                log::info!(
                    "motion detected: score={} regions={}",
                    event.score,
                    event.regions.len()
                );
                // Regions only annotate; the score alone gates the alert.
                let mut annotated = frame.clone();
                draw_regions(&mut annotated, &event.regions);
                let caption = format!(
                    "Motion detected at {} (score {})",
                    now.format("%Y-%m-%d %H:%M:%S"),
                    event.score
                );
                if let Err(e) = self.dispatcher.send_image(&annotated, &caption) {
                    log::warn!("motion alert dispatch failed: {e:#}");
                }
            }
        }

        // Hourly snapshot: at most one per hour boundary, no backfill. A loop
        // delayed past several boundaries marks only the current hour.
        match self.last_hour_sent {
            Some(last) if last != now.hour() => {
                let caption = format!("Hourly snapshot ({})", now.format("%H:%M"));
                if let Err(e) = self.dispatcher.send_image(&frame, &caption) {
                    log::warn!("hourly snapshot dispatch failed: {e:#}");
                }
                self.last_hour_sent = Some(now.hour());
            }
            None => self.last_hour_sent = Some(now.hour()),
            _ => {}
        }

        self.prev_gray = Some(gray);
        self.poll_commands(now);
        Ok(())
    }

    fn poll_commands(&mut self, now: DateTime<Local>) {
        let commands = match self.commands.poll_new(self.checkpoint) {
            Ok(commands) => commands,
            Err(e) => {
                log::warn!("command poll failed: {e:#}");
                return;
            }
        };
        for command in commands {
            self.checkpoint = Some(self.checkpoint.map_or(command.id, |c| c.max(command.id)));
            self.handle_command(&command, now);
        }
    }

    fn handle_command(&mut self, command: &RemoteCommand, now: DateTime<Local>) {
        match command.text.as_str() {
            SNAPSHOT_COMMAND => {
                let Some(latest) = self.buffer.latest() else {
                    log::info!("snapshot command ignored: buffer empty");
                    return;
                };
                let caption = format!("Snapshot at {}", now.format("%Y-%m-%d %H:%M:%S"));
                if let Err(e) = self.dispatcher.send_image(latest, &caption) {
                    log::warn!("snapshot dispatch failed: {e:#}");
                }
            }
            CLIP_COMMAND => {
                let frames = self.buffer.snapshot();
                if frames.len() < self.runtime.min_clip_frames {
                    log::info!(
                        "clip command ignored: {} of {} required frames buffered",
                        frames.len(),
                        self.runtime.min_clip_frames
                    );
                    return;
                }
                if let Err(e) = self.dispatcher.send_clip(&frames, self.runtime.clip_fps) {
                    log::warn!("clip dispatch failed: {e:#}");
                }
            }
            STATUS_COMMAND => {
                let message = format!("System alive. Time: {}", now.format("%H:%M:%S"));
                if let Err(e) = self.dispatcher.send_text(&message) {
                    log::warn!("status dispatch failed: {e:#}");
                }
            }
            other => log::debug!("ignoring unknown command {other:?}"),
        }
    }
}
