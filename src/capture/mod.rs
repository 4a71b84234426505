//! Frame acquisition.
//!
//! A `FrameSource` wraps device open/negotiate/read/release. Two backends are
//! provided by `CameraSource`:
//! - a synthetic source for `stub://` device paths (tests, demos)
//! - a V4L2 device source (feature: capture-v4l2)
//!
//! The source itself never retries: `open()` failures are `DeviceUnavailable`
//! and mid-session failures are `ReadError`. The surveillance loop owns the
//! retry-forever policy.

pub mod camera;

pub use camera::{CameraConfig, CameraSource};

use crate::frame::Frame;
use thiserror::Error;

/// Candidate resolutions tried in descending quality order during
/// negotiation. The first exact match reported back by the device wins.
pub const RESOLUTION_LADDER: [(u32, u32); 6] = [
    (1920, 1080),
    (1280, 720),
    (1024, 768),
    (800, 600),
    (640, 480),
    (320, 240),
];

/// Device-level failures. Only these escalate into loop state transitions;
/// notification and command I/O failures are absorbed where they occur.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Open or resolution negotiation failed, or an "open" device produced no
    /// frame. The loop retries at a fixed interval, forever.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A mid-session frame read failed. The loop tears the session down and
    /// restarts from acquisition.
    #[error("frame read failed: {0}")]
    ReadError(String),
}

/// The live handle to an open capture device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSession {
    /// The resolution the device agreed to, or `None` when no ladder entry
    /// matched and the device default is in effect.
    pub resolution: Option<(u32, u32)>,
}

/// A source of captured frames.
pub trait FrameSource {
    /// Open the device and negotiate a resolution. Must verify the device
    /// yields at least one valid frame before declaring success.
    fn open(&mut self) -> Result<DeviceSession, CaptureError>;

    /// Read the next frame. Failures are not retried internally.
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Release the device handle. Idempotent.
    fn release(&mut self);
}
