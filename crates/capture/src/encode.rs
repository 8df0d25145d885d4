//! Downscale and JPEG-encode sampled frames for the wire.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::CaptureError;
use crate::source::VideoFrame;

/// JPEG-encode a frame after scaling it by `scale` (0 < scale <= 1).
///
/// Scale 0.5 quarters the pixel count; combined with quality ~70 this
/// keeps per-frame payloads small enough to sustain interactive round
/// trips to the inference service.
pub fn encode_jpeg(
    frame: &VideoFrame,
    scale: f32,
    quality: u8,
) -> Result<Vec<u8>, CaptureError> {
    let scale = scale.clamp(0.05, 1.0);
    let width = ((frame.width() as f32 * scale).round() as u32).max(1);
    let height = ((frame.height() as f32 * scale).round() as u32).max(1);

    let scaled = if width == frame.width() && height == frame.height() {
        DynamicImage::ImageRgb8(frame.image.clone())
    } else {
        DynamicImage::ImageRgb8(frame.image.clone()).resize_exact(
            width,
            height,
            FilterType::Triangle,
        )
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    scaled
        .write_with_encoder(encoder)
        .map_err(|e| CaptureError::Decode(format!("jpeg encode failed: {e}")))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame {
            image: RgbImage::from_fn(width, height, |x, y| {
                image::Rgb([(x % 256) as u8, (y % 256) as u8, 0])
            }),
            index: 1,
        }
    }

    #[test]
    fn half_scale_halves_dimensions() {
        let encoded = encode_jpeg(&frame(640, 480), 0.5, 70).unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap();
        assert_eq!(decoded.width(), 320);
        assert_eq!(decoded.height(), 240);
    }

    #[test]
    fn output_is_jpeg() {
        let encoded = encode_jpeg(&frame(64, 48), 1.0, 70).unwrap();
        // JPEG SOI marker.
        assert_eq!(&encoded[..2], &[0xFF, 0xD8]);
        assert_eq!(&encoded[encoded.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn degenerate_scale_is_clamped() {
        let encoded = encode_jpeg(&frame(64, 48), 0.0, 70).unwrap();
        let decoded = image::load_from_memory(&encoded).unwrap();
        assert!(decoded.width() >= 1);
        assert!(decoded.height() >= 1);
    }
}
