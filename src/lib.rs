//! motion-sentry
//!
//! A single-camera motion watcher. The daemon acquires a video device,
//! scores motion by differencing consecutive blurred grayscale frames,
//! keeps a bounded ring buffer of recent frames, and reports to a Telegram
//! chat: annotated snapshots on motion, an hourly liveness snapshot, and
//! replies to simple remote commands (`/snapshot`, `/clip`, `/status`).
//!
//! # Module Structure
//!
//! - `capture`: device acquisition, resolution negotiation, read/release
//! - `detect`: frame differencing, scoring, region extraction
//! - `frame`: frame containers and the bounded ring buffer
//! - `annotate`: bounding-box drawing for alert snapshots
//! - `alert`: outbound notification channel (Telegram Bot API)
//! - `command`: inbound remote command polling (Telegram `getUpdates`)
//! - `sentry`: the single-threaded surveillance loop and its state machine
//! - `config`: JSON config file + `SENTRY_*` environment overrides
//!
//! Failure policy: device-level errors escalate and drive the loop's
//! acquire/run state transitions; all notification and command I/O errors
//! are logged and swallowed so they can never interrupt monitoring.

pub mod alert;
pub mod annotate;
pub mod capture;
pub mod command;
pub mod config;
pub mod detect;
pub mod frame;
pub mod sentry;

pub use alert::{AlertDispatcher, TelegramDispatcher};
pub use capture::{
    CameraConfig, CameraSource, CaptureError, DeviceSession, FrameSource, RESOLUTION_LADDER,
};
pub use command::{CommandChannel, RemoteCommand, TelegramCommandChannel};
pub use config::SentryConfig;
pub use detect::{DetectorConfig, MotionDetector, MotionEvent, Region};
pub use frame::{Frame, FrameRingBuffer, GrayFrame, DEFAULT_BUFFER_CAPACITY};
pub use sentry::{LoopState, SurveillanceLoop};
