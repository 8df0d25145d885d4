//! Synthetic moving test pattern.
//!
//! Produces frames without any hardware or host tooling, so session
//! and transport behavior can be exercised in tests and demos.

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use crate::error::CaptureError;
use crate::source::{FrameSource, VideoFrame};

/// A moving gradient with a bright square that slides across the
/// frame, one pixel per frame. Every frame differs from the last,
/// which keeps downstream JPEG sizes honest.
pub struct PatternSource {
    width: u32,
    height: u32,
    fps: u32,
    index: u64,
}

impl PatternSource {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width: width.max(16),
            height: height.max(16),
            fps: fps.max(1),
            index: 0,
        }
    }

    fn render(&self, index: u64) -> RgbImage {
        let mut image = RgbImage::new(self.width, self.height);
        let phase = (index % 256) as u32;
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            let r = ((x + phase) % 256) as u8;
            let g = ((y + phase) % 256) as u8;
            *pixel = Rgb([r, g, 64]);
        }

        // Sliding 8x8 marker square.
        let side = 8u32;
        let max_x = self.width - side;
        let max_y = self.height - side;
        let sq_x = (index as u32) % max_x.max(1);
        let sq_y = ((index as u32) / 2) % max_y.max(1);
        for dy in 0..side {
            for dx in 0..side {
                image.put_pixel(sq_x + dx, sq_y + dy, Rgb([255, 255, 255]));
            }
        }
        image
    }
}

#[async_trait]
impl FrameSource for PatternSource {
    fn describe(&self) -> String {
        format!("pattern {}x{}@{}", self.width, self.height, self.fps)
    }

    fn nominal_fps(&self) -> u32 {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        self.index += 1;
        Ok(VideoFrame {
            image: self.render(self.index),
            index: self.index,
        })
    }
}
