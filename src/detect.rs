//! Frame-differencing motion detection.
//!
//! The pipeline per tick is: convert the color frame to grayscale, blur it to
//! suppress sensor noise, absolute-difference against the previous prepared
//! frame, binary-threshold the difference, count changed pixels (the motion
//! score), and extract bounding regions of connected changed blobs.
//!
//! The five constants in `DetectorConfig` define the entire sensitivity
//! behavior; defaults match the deployed tuning.

use crate::frame::{Frame, GrayFrame};

/// Sensitivity constants. All externally configurable.
#[derive(Clone, Debug)]
pub struct DetectorConfig {
    /// Gaussian blur kernel size (odd). Sigma is derived from the size.
    pub blur_kernel: u32,
    /// Per-pixel intensity delta at or above which a pixel counts as changed.
    pub pixel_threshold: u8,
    /// Changed-pixel count above which a tick is a motion event.
    pub score_threshold: u32,
    /// Minimum blob pixel count for a region; smaller blobs are noise.
    pub min_region_area: u32,
    /// Maximum bounding-rectangle area as a fraction of frame area; larger
    /// rectangles are global lighting/exposure artifacts, not motion.
    pub max_region_frac: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_kernel: 21,
            pixel_threshold: 25,
            score_threshold: 10_000,
            min_region_area: 500,
            max_region_frac: 0.7,
        }
    }
}

/// Axis-aligned bounding rectangle of a changed blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A motion event for one tick: the score that gated it and the qualifying
/// regions (possibly empty; regions never gate the event itself).
#[derive(Clone, Debug)]
pub struct MotionEvent {
    pub score: u32,
    pub regions: Vec<Region>,
}

/// Binary changed-pixel mask between two prepared frames.
pub struct DiffMask {
    width: u32,
    height: u32,
    changed: Vec<bool>,
}

impl DiffMask {
    /// Motion score: count of changed pixels.
    pub fn score(&self) -> u32 {
        self.changed.iter().filter(|&&c| c).count() as u32
    }
}

pub struct MotionDetector {
    config: DetectorConfig,
    kernel: Vec<f32>,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let kernel = gaussian_kernel(config.blur_kernel);
        Self { config, kernel }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Convert to grayscale and blur. Deterministic, pure.
    pub fn prepare(&self, frame: &Frame) -> GrayFrame {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let rgb = frame.pixels();

        // ITU-R 601 luma.
        let mut gray = vec![0u8; width * height];
        for (i, px) in gray.iter_mut().enumerate() {
            let r = rgb[i * 3] as u32;
            let g = rgb[i * 3 + 1] as u32;
            let b = rgb[i * 3 + 2] as u32;
            *px = ((299 * r + 587 * g + 114 * b) / 1000) as u8;
        }

        let blurred = separable_blur(&gray, width, height, &self.kernel);
        GrayFrame::from_raw(blurred, frame.width, frame.height)
    }

    /// Absolute difference of two prepared frames, thresholded into a binary
    /// mask. Returns `None` when dimensions differ (only possible across a
    /// session restart; the caller re-baselines instead of scoring).
    pub fn diff(&self, prev: &GrayFrame, curr: &GrayFrame) -> Option<DiffMask> {
        if prev.width != curr.width || prev.height != curr.height {
            return None;
        }
        let threshold = self.config.pixel_threshold;
        let changed = prev
            .pixels()
            .iter()
            .zip(curr.pixels())
            .map(|(&a, &b)| a.abs_diff(b) >= threshold)
            .collect();
        Some(DiffMask {
            width: curr.width,
            height: curr.height,
            changed,
        })
    }

    /// Full per-tick evaluation: score the pair and, when the score crosses
    /// the event threshold, extract regions. `None` means no event (below
    /// threshold, or a dimension mismatch the caller re-baselines over).
    pub fn detect(&self, prev: &GrayFrame, curr: &GrayFrame) -> Option<MotionEvent> {
        let mask = self.diff(prev, curr)?;
        let score = mask.score();
        if score <= self.config.score_threshold {
            return None;
        }
        Some(MotionEvent {
            score,
            regions: self.find_regions(&mask),
        })
    }

    /// Extract bounding regions of 8-connected changed blobs, in discovery
    /// order. Blobs below the noise floor and rectangles covering more than
    /// `max_region_frac` of the frame are discarded.
    pub fn find_regions(&self, mask: &DiffMask) -> Vec<Region> {
        let width = mask.width as usize;
        let height = mask.height as usize;
        let frame_area = mask.width as u64 * mask.height as u64;
        let max_area = (frame_area as f64 * self.config.max_region_frac as f64) as u64;

        let mut visited = vec![false; width * height];
        let mut regions = Vec::new();
        let mut stack = Vec::new();

        for start in 0..width * height {
            if !mask.changed[start] || visited[start] {
                continue;
            }

            // Flood-fill one blob, tracking pixel count and bounding box.
            let (mut min_x, mut min_y) = (width, height);
            let (mut max_x, mut max_y) = (0usize, 0usize);
            let mut pixel_count = 0u32;
            visited[start] = true;
            stack.push(start);
            while let Some(idx) = stack.pop() {
                let x = idx % width;
                let y = idx / width;
                pixel_count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        let nidx = ny as usize * width + nx as usize;
                        if mask.changed[nidx] && !visited[nidx] {
                            visited[nidx] = true;
                            stack.push(nidx);
                        }
                    }
                }
            }

            if pixel_count < self.config.min_region_area {
                continue;
            }
            let region = Region {
                x: min_x as u32,
                y: min_y as u32,
                width: (max_x - min_x + 1) as u32,
                height: (max_y - min_y + 1) as u32,
            };
            if region.area() > max_area {
                continue;
            }
            regions.push(region);
        }

        regions
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

/// Normalized 1-D Gaussian kernel of the given (odd) size, with sigma derived
/// from the size the way fixed-kernel blurs conventionally auto-select it.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) | 1; // force odd
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-(i as f32 * i as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian blur with clamped borders.
fn separable_blur(gray: &[u8], width: usize, height: usize, kernel: &[f32]) -> Vec<u8> {
    if kernel.len() <= 1 {
        return gray.to_vec();
    }
    let half = (kernel.len() / 2) as i64;

    // Horizontal pass.
    let mut horizontal = vec![0f32; width * height];
    for y in 0..height {
        let row = y * width;
        for x in 0..width {
            let mut acc = 0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - half).clamp(0, width as i64 - 1) as usize;
                acc += gray[row + sx] as f32 * w;
            }
            horizontal[row + x] = acc;
        }
    }

    // Vertical pass.
    let mut out = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - half).clamp(0, height as i64 - 1) as usize;
                acc += horizontal[sy * width + x] * w;
            }
            out[y * width + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
