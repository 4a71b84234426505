//! Frame containers and the bounded ring buffer.
//!
//! - `Frame`: interleaved RGB24 pixels as captured; immutable once buffered.
//! - `GrayFrame`: blurred grayscale derived for scoring; never buffered.
//! - `FrameRingBuffer`: fixed-capacity FIFO of the most recent frames.
//!
//! The ring buffer stores its own clones so a later in-place annotation of a
//! live frame cannot corrupt buffered history.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;

/// Default ring buffer capacity: ~10 seconds of history at one frame per tick
/// with the nominal tick cadence.
pub const DEFAULT_BUFFER_CAPACITY: usize = 200;

/// A captured color frame. Pixels are interleaved RGB24, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(anyhow!(
                "frame data length {} does not match {}x{} rgb ({} bytes)",
                data.len(),
                width,
                height,
                expected
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Total pixel count of the frame.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Overwrite a single pixel. Out-of-bounds coordinates are ignored so
    /// annotation code can draw clipped rectangles without bounds gymnastics.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }
}

/// A prepared (grayscale + blurred) frame used only for motion scoring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl GrayFrame {
    pub(crate) fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            data,
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }
}

/// Fixed-capacity FIFO of recent frames. Oldest frame is evicted on overflow.
///
/// Append-only from the loop's perspective; no synchronization is needed
/// because the surveillance loop is single-threaded.
pub struct FrameRingBuffer {
    buffer: VecDeque<Frame>,
    capacity: usize,
}

impl FrameRingBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be nonzero");
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a copy of the frame, evicting the oldest if at capacity.
    pub fn push(&mut self, frame: &Frame) {
        while self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(frame.clone());
    }

    /// Current contents, oldest first. Reading does not mutate the buffer.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.buffer.iter().cloned().collect()
    }

    /// The most recently pushed frame, if any.
    pub fn latest(&self) -> Option<&Frame> {
        self.buffer.back()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameRingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(value: u8, width: u32, height: u32) -> Frame {
        let data = vec![value; width as usize * height as usize * 3];
        Frame::new(data, width, height).unwrap()
    }

    #[test]
    fn frame_rejects_mismatched_length() {
        assert!(Frame::new(vec![0u8; 10], 4, 4).is_err());
    }

    #[test]
    fn ring_buffer_keeps_most_recent_frames_oldest_first() {
        let mut buf = FrameRingBuffer::new(5);
        for i in 0..9u8 {
            buf.push(&solid_frame(i, 2, 2));
        }

        let snapshot = buf.snapshot();
        assert_eq!(snapshot.len(), 5);
        // Frames 4..=8 survive, oldest first.
        for (offset, frame) in snapshot.iter().enumerate() {
            assert_eq!(frame.pixels()[0], 4 + offset as u8);
        }
    }

    #[test]
    fn ring_buffer_snapshot_is_idempotent() {
        let mut buf = FrameRingBuffer::new(4);
        buf.push(&solid_frame(1, 2, 2));
        buf.push(&solid_frame(2, 2, 2));

        let first = buf.snapshot();
        let second = buf.snapshot();
        assert_eq!(first, second);
    }

    #[test]
    fn ring_buffer_latest_tracks_last_push() {
        let mut buf = FrameRingBuffer::new(3);
        assert!(buf.latest().is_none());

        buf.push(&solid_frame(7, 2, 2));
        buf.push(&solid_frame(9, 2, 2));
        assert_eq!(buf.latest().unwrap().pixels()[0], 9);
    }

    #[test]
    fn buffered_frames_are_independent_copies() {
        let mut buf = FrameRingBuffer::new(2);
        let mut live = solid_frame(10, 2, 2);
        buf.push(&live);

        live.set_pixel(0, 0, [255, 255, 255]);
        assert_eq!(buf.latest().unwrap().pixels()[0], 10);
    }

    #[test]
    fn set_pixel_ignores_out_of_bounds() {
        let mut frame = solid_frame(0, 2, 2);
        frame.set_pixel(5, 5, [1, 2, 3]);
        assert!(frame.pixels().iter().all(|&p| p == 0));
    }
}
