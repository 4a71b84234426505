//! Outbound notification channel.
//!
//! The surveillance loop treats delivery as fire-and-forget: every dispatch
//! failure is logged at the call site and never aborts the tick.

pub mod telegram;

pub use telegram::TelegramDispatcher;

use crate::frame::Frame;
use anyhow::Result;

/// Capability to deliver alerts to the remote notification channel.
pub trait AlertDispatcher {
    /// Deliver a single (possibly annotated) snapshot with a caption.
    fn send_image(&mut self, frame: &Frame, caption: &str) -> Result<()>;

    /// Deliver a plain text message.
    fn send_text(&mut self, message: &str) -> Result<()>;

    /// Deliver an ordered frame sequence as a short animated clip.
    fn send_clip(&mut self, frames: &[Frame], fps: u32) -> Result<()>;
}
