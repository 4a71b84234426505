//! Camera source with synthetic and V4L2 backends.
//!
//! Device paths starting with `stub://` select a synthetic backend that
//! generates deterministic frames; anything else requires the `capture-v4l2`
//! feature and opens a local device node such as `/dev/video0`.

use anyhow::Result;

use super::{CaptureError, DeviceSession, FrameSource, RESOLUTION_LADDER};
use crate::frame::Frame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or "stub://name" for synthetic.
    pub device: String,
    /// Candidate resolutions, tried in order during negotiation.
    pub resolutions: Vec<(u32, u32)>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            resolutions: RESOLUTION_LADDER.to_vec(),
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "capture-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            })
        } else {
            #[cfg(feature = "capture-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(DeviceCamera::new(config)),
                })
            }
            #[cfg(not(feature = "capture-v4l2"))]
            {
                anyhow::bail!("device capture requires the capture-v4l2 feature")
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<DeviceSession, CaptureError> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.open(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.open(),
        }
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.read(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.read(),
        }
    }

    fn release(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.release(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(camera) => camera.release(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests and demos
// ----------------------------------------------------------------------------

/// Resolutions the synthetic device pretends to support.
const SYNTHETIC_SUPPORTED: [(u32, u32); 2] = [(640, 480), (320, 240)];

struct SyntheticCamera {
    config: CameraConfig,
    open: bool,
    width: u32,
    height: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            open: false,
            width: 640,
            height: 480,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn open(&mut self) -> Result<DeviceSession, CaptureError> {
        // Negotiate against the simulated capability list, exact match only.
        let negotiated = self
            .config
            .resolutions
            .iter()
            .copied()
            .find(|candidate| SYNTHETIC_SUPPORTED.contains(candidate));
        let (width, height) = negotiated.unwrap_or((640, 480));
        self.width = width;
        self.height = height;
        self.open = true;

        // The open contract requires one valid frame before success.
        self.read().map_err(|e| {
            self.open = false;
            CaptureError::DeviceUnavailable(format!("warm-up frame failed: {e}"))
        })?;

        log::info!(
            "CameraSource: connected to {} (synthetic, {}x{})",
            self.config.device,
            width,
            height
        );
        Ok(DeviceSession {
            resolution: negotiated,
        })
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        if !self.open {
            return Err(CaptureError::ReadError(
                "synthetic camera not open".to_string(),
            ));
        }
        self.frame_count += 1;

        // Change scene state occasionally to simulate motion.
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let pixel_count = self.width as usize * self.height as usize * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i / 3) as u64 % 7 * 20 + self.scene_state as u64 * 40) as u8;
        }

        Frame::new(pixels, self.width, self.height)
            .map_err(|e| CaptureError::ReadError(e.to_string()))
    }

    fn release(&mut self) {
        self.open = false;
    }
}

// ----------------------------------------------------------------------------
// V4L2 device camera (feature: capture-v4l2)
// ----------------------------------------------------------------------------

#[cfg(feature = "capture-v4l2")]
struct DeviceCamera {
    config: CameraConfig,
    state: Option<DeviceCameraState>,
    width: u32,
    height: u32,
}

#[cfg(feature = "capture-v4l2")]
#[ouroboros::self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "capture-v4l2")]
impl DeviceCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            state: None,
            width: 0,
            height: 0,
        }
    }

    fn open(&mut self) -> Result<DeviceSession, CaptureError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let unavailable = |e: String| CaptureError::DeviceUnavailable(e);

        let device = v4l::Device::with_path(&self.config.device)
            .map_err(|e| unavailable(format!("open {}: {}", self.config.device, e)))?;

        // Walk the ladder top-down; the device must report the exact pair
        // back, otherwise try the next candidate.
        let mut negotiated = None;
        for &(width, height) in &self.config.resolutions {
            let mut format = device
                .format()
                .map_err(|e| unavailable(format!("read format: {e}")))?;
            format.width = width;
            format.height = height;
            format.fourcc = v4l::FourCC::new(b"RGB3");
            match device.set_format(&format) {
                Ok(actual) if actual.width == width && actual.height == height => {
                    negotiated = Some((width, height));
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    log::debug!("resolution {}x{} rejected: {}", width, height, e);
                    continue;
                }
            }
        }

        let format = device
            .format()
            .map_err(|e| unavailable(format!("read negotiated format: {e}")))?;
        self.width = format.width;
        self.height = format.height;
        match negotiated {
            Some((w, h)) => log::info!("CameraSource: negotiated {}x{}", w, h),
            None => log::warn!(
                "CameraSource: no ladder resolution supported, using device default {}x{}",
                format.width,
                format.height
            ),
        }

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|e| unavailable(format!("create capture stream: {e}")))?;
        self.state = Some(state);

        // An "open" device that yields no frame is unavailable.
        self.read().map_err(|e| {
            self.state = None;
            unavailable(format!("warm-up frame failed: {e}"))
        })?;

        Ok(DeviceSession {
            resolution: negotiated,
        })
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CaptureError::ReadError("device not open".to_string()))?;
        let width = self.width;
        let height = self.height;
        let expected = width as usize * height as usize * 3;

        let data = state
            .with_stream_mut(|stream| {
                let (buf, _meta) = stream
                    .next()
                    .map_err(|e| CaptureError::ReadError(format!("capture frame: {e}")))?;
                if buf.len() < expected {
                    return Err(CaptureError::ReadError(format!(
                        "short frame: {} of {} bytes",
                        buf.len(),
                        expected
                    )));
                }
                Ok(buf[..expected].to_vec())
            })?;

        Frame::new(data, width, height).map_err(|e| CaptureError::ReadError(e.to_string()))
    }

    fn release(&mut self) {
        self.state = None;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(resolutions: Vec<(u32, u32)>) -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            resolutions,
        }
    }

    #[test]
    fn synthetic_camera_negotiates_first_supported_resolution() {
        let mut source =
            CameraSource::new(stub_config(vec![(1920, 1080), (320, 240), (640, 480)])).unwrap();
        let session = source.open().unwrap();
        assert_eq!(session.resolution, Some((320, 240)));

        let frame = source.read().unwrap();
        assert_eq!((frame.width, frame.height), (320, 240));
    }

    #[test]
    fn synthetic_camera_falls_back_to_default_resolution() {
        let mut source = CameraSource::new(stub_config(vec![(1920, 1080)])).unwrap();
        let session = source.open().unwrap();
        assert_eq!(session.resolution, None);

        let frame = source.read().unwrap();
        assert_eq!((frame.width, frame.height), (640, 480));
    }

    #[test]
    fn read_after_release_is_a_read_error() {
        let mut source = CameraSource::new(stub_config(RESOLUTION_LADDER.to_vec())).unwrap();
        source.open().unwrap();
        source.release();

        assert!(matches!(source.read(), Err(CaptureError::ReadError(_))));
    }
}
