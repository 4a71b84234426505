//! Telegram Bot API dispatcher.
//!
//! Snapshots go out as JPEG via `sendPhoto`, clips as animated GIF via
//! `sendDocument`, text via `sendMessage`. Uploads use hand-assembled
//! multipart/form-data bodies; the Bot API needs nothing fancier.

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{Delay, Frame as GifFrame, RgbImage, RgbaImage};
use std::time::{SystemTime, UNIX_EPOCH};

use super::AlertDispatcher;
use crate::config::TelegramSettings;
use crate::frame::Frame;

const JPEG_QUALITY: u8 = 80;

pub struct TelegramDispatcher {
    settings: TelegramSettings,
}

impl TelegramDispatcher {
    pub fn new(settings: TelegramSettings) -> Self {
        Self { settings }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.settings.api_base, self.settings.bot_token, method
        )
    }

    fn post_upload(
        &self,
        method: &str,
        fields: &[(&str, &str)],
        file_field: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<()> {
        let boundary = boundary_token();
        let body = multipart_body(&boundary, fields, file_field, filename, content_type, bytes);
        ureq::post(&self.method_url(method))
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body)
            .with_context(|| format!("telegram {method} upload"))?;
        Ok(())
    }
}

impl AlertDispatcher for TelegramDispatcher {
    fn send_image(&mut self, frame: &Frame, caption: &str) -> Result<()> {
        let jpeg = encode_jpeg(frame)?;
        self.post_upload(
            "sendPhoto",
            &[("chat_id", self.settings.chat_id.as_str()), ("caption", caption)],
            "photo",
            "snapshot.jpg",
            "image/jpeg",
            &jpeg,
        )
    }

    fn send_text(&mut self, message: &str) -> Result<()> {
        ureq::post(&self.method_url("sendMessage"))
            .send_form(&[
                ("chat_id", self.settings.chat_id.as_str()),
                ("text", message),
            ])
            .context("telegram sendMessage")?;
        Ok(())
    }

    fn send_clip(&mut self, frames: &[Frame], fps: u32) -> Result<()> {
        let gif = encode_gif(frames, fps)?;
        let caption = format!("Motion clip ({} frames)", frames.len());
        self.post_upload(
            "sendDocument",
            &[
                ("chat_id", self.settings.chat_id.as_str()),
                ("caption", caption.as_str()),
            ],
            "document",
            "clip.gif",
            "image/gif",
            &gif,
        )
    }
}

fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    let image: RgbImage =
        RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&image)
        .context("encode jpeg")?;
    Ok(jpeg)
}

fn encode_gif(frames: &[Frame], fps: u32) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Err(anyhow!("no frames to encode"));
    }
    let fps = fps.max(1);
    let mut gif = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut gif, 10);
        encoder.set_repeat(Repeat::Infinite).context("gif repeat")?;
        for frame in frames {
            let rgba = rgb_to_rgba(frame)
                .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
            let delay = Delay::from_numer_denom_ms(1_000, fps);
            encoder
                .encode_frame(GifFrame::from_parts(rgba, 0, 0, delay))
                .context("encode gif frame")?;
        }
    }
    Ok(gif)
}

fn rgb_to_rgba(frame: &Frame) -> Option<RgbaImage> {
    let mut rgba = Vec::with_capacity(frame.area() as usize * 4);
    for px in frame.pixels().chunks_exact(3) {
        rgba.extend_from_slice(px);
        rgba.push(255);
    }
    RgbaImage::from_raw(frame.width, frame.height, rgba)
}

fn boundary_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("sentry{:08x}{:08x}", std::process::id(), nanos)
}

fn multipart_body(
    boundary: &str,
    fields: &[(&str, &str)],
    file_field: &str,
    filename: &str,
    content_type: &str,
    bytes: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{file_field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_frame(value: u8) -> Frame {
        Frame::new(vec![value; 8 * 8 * 3], 8, 8).unwrap()
    }

    #[test]
    fn multipart_body_has_fields_and_file_part() {
        let body = multipart_body(
            "XYZ",
            &[("chat_id", "42"), ("caption", "hello")],
            "photo",
            "snapshot.jpg",
            "image/jpeg",
            b"\xff\xd8data",
        );
        let text = String::from_utf8_lossy(&body);

        assert!(text.contains("--XYZ\r\n"));
        assert!(text.contains("name=\"chat_id\"\r\n\r\n42\r\n"));
        assert!(text.contains("name=\"caption\"\r\n\r\nhello\r\n"));
        assert!(text.contains("name=\"photo\"; filename=\"snapshot.jpg\"\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\n"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
    }

    #[test]
    fn jpeg_encoding_produces_jpeg_magic() {
        let jpeg = encode_jpeg(&small_frame(128)).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn gif_encoding_produces_gif_magic() {
        let frames = [small_frame(10), small_frame(200)];
        let gif = encode_gif(&frames, 10).unwrap();
        assert_eq!(&gif[..4], b"GIF8");
    }

    #[test]
    fn gif_encoding_rejects_empty_sequence() {
        assert!(encode_gif(&[], 10).is_err());
    }
}
