//! Daemon configuration.
//!
//! Settings come from a JSON config file (path via `--config` or the
//! `SENTRY_CONFIG` environment variable), with individual `SENTRY_*`
//! environment overrides applied on top. Everything has a default except the
//! Telegram credentials.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::RESOLUTION_LADDER;
use crate::detect::DetectorConfig;
use crate::frame::DEFAULT_BUFFER_CAPACITY;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_TICK_MS: u64 = 1_000;
const DEFAULT_RETRY_SECS: u64 = 5;
const DEFAULT_CLIP_FPS: u32 = 10;
const DEFAULT_MIN_CLIP_FRAMES: usize = 10;

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    telegram: Option<TelegramConfigFile>,
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    runtime: Option<RuntimeConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TelegramConfigFile {
    bot_token: Option<String>,
    chat_id: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    resolutions: Option<Vec<(u32, u32)>>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    blur_kernel: Option<u32>,
    pixel_threshold: Option<u8>,
    score_threshold: Option<u32>,
    min_region_area: Option<u32>,
    max_region_frac: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct RuntimeConfigFile {
    tick_ms: Option<u64>,
    retry_secs: Option<u64>,
    buffer_capacity: Option<usize>,
    clip_fps: Option<u32>,
    min_clip_frames: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub telegram: TelegramSettings,
    pub camera: CameraSettings,
    pub detector: DetectorConfig,
    pub runtime: RuntimeSettings,
}

/// Credentials and endpoint identity for the Bot API. `api_base` exists so
/// tests and self-hosted bot servers can redirect traffic.
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub resolutions: Vec<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub tick_interval: Duration,
    pub retry_interval: Duration,
    pub buffer_capacity: usize,
    pub clip_fps: u32,
    pub min_clip_frames: usize,
}

impl SentryConfig {
    /// Load from `SENTRY_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => SentryConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let telegram = file.telegram.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let runtime = file.runtime.unwrap_or_default();
        let detector_defaults = DetectorConfig::default();

        Self {
            telegram: TelegramSettings {
                bot_token: telegram.bot_token.unwrap_or_default(),
                chat_id: telegram.chat_id.unwrap_or_default(),
                api_base: telegram
                    .api_base
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            },
            camera: CameraSettings {
                device: camera.device.unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
                resolutions: camera
                    .resolutions
                    .unwrap_or_else(|| RESOLUTION_LADDER.to_vec()),
            },
            detector: DetectorConfig {
                blur_kernel: detector.blur_kernel.unwrap_or(detector_defaults.blur_kernel),
                pixel_threshold: detector
                    .pixel_threshold
                    .unwrap_or(detector_defaults.pixel_threshold),
                score_threshold: detector
                    .score_threshold
                    .unwrap_or(detector_defaults.score_threshold),
                min_region_area: detector
                    .min_region_area
                    .unwrap_or(detector_defaults.min_region_area),
                max_region_frac: detector
                    .max_region_frac
                    .unwrap_or(detector_defaults.max_region_frac),
            },
            runtime: RuntimeSettings {
                tick_interval: Duration::from_millis(runtime.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
                retry_interval: Duration::from_secs(
                    runtime.retry_secs.unwrap_or(DEFAULT_RETRY_SECS),
                ),
                buffer_capacity: runtime.buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY),
                clip_fps: runtime.clip_fps.unwrap_or(DEFAULT_CLIP_FPS),
                min_clip_frames: runtime.min_clip_frames.unwrap_or(DEFAULT_MIN_CLIP_FRAMES),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(token) = std::env::var("SENTRY_BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.telegram.bot_token = token;
            }
        }
        if let Ok(chat_id) = std::env::var("SENTRY_CHAT_ID") {
            if !chat_id.trim().is_empty() {
                self.telegram.chat_id = chat_id;
            }
        }
        if let Ok(api_base) = std::env::var("SENTRY_API_BASE") {
            if !api_base.trim().is_empty() {
                self.telegram.api_base = api_base;
            }
        }
        if let Ok(device) = std::env::var("SENTRY_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(tick_ms) = std::env::var("SENTRY_TICK_MS") {
            let ms: u64 = tick_ms
                .parse()
                .map_err(|_| anyhow!("SENTRY_TICK_MS must be an integer number of milliseconds"))?;
            self.runtime.tick_interval = Duration::from_millis(ms);
        }
        if let Ok(retry_secs) = std::env::var("SENTRY_RETRY_SECS") {
            let secs: u64 = retry_secs
                .parse()
                .map_err(|_| anyhow!("SENTRY_RETRY_SECS must be an integer number of seconds"))?;
            self.runtime.retry_interval = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(anyhow!(
                "telegram bot_token is required (config file or SENTRY_BOT_TOKEN)"
            ));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(anyhow!(
                "telegram chat_id is required (config file or SENTRY_CHAT_ID)"
            ));
        }
        if self.detector.blur_kernel == 0 || self.detector.blur_kernel % 2 == 0 {
            return Err(anyhow!("detector blur_kernel must be odd and nonzero"));
        }
        if !(self.detector.max_region_frac > 0.0 && self.detector.max_region_frac <= 1.0) {
            return Err(anyhow!("detector max_region_frac must be in (0, 1]"));
        }
        if self.runtime.buffer_capacity == 0 {
            return Err(anyhow!("runtime buffer_capacity must be nonzero"));
        }
        if self.runtime.tick_interval.is_zero() {
            return Err(anyhow!("runtime tick_ms must be nonzero"));
        }
        if self.camera.resolutions.is_empty() {
            return Err(anyhow!("camera resolutions must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
