//! Paint a [`DrawPlan`](crate::plan::DrawPlan) onto pixels.
//!
//! Rasterization covers box strokes, label chip backgrounds, and the
//! dashed stop line. Glyphs are not rasterized; label text travels in
//! the plan for UIs that can draw type.

use base64::Engine;
use image::{Rgba, RgbaImage};

use crate::palette;
use crate::plan::{DrawOp, DrawPlan, Rect};

const STROKE_WIDTH: u32 = 3;
const DASH_ON: u32 = 10;
const DASH_OFF: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Annotated frame is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Annotated frame decode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode a base64 JPEG annotated frame from the inference service.
pub fn decode_annotated_frame(encoded: &str) -> Result<RgbaImage, RenderError> {
    // Tolerate a data-URL prefix.
    let payload = encoded.rsplit(',').next().unwrap_or(encoded);
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload)?;
    let decoded = image::load_from_memory(&bytes)?;
    Ok(decoded.to_rgba8())
}

/// Paint the plan onto the image in op order.
pub fn rasterize(image: &mut RgbaImage, plan: &DrawPlan) {
    for op in &plan.ops {
        match op {
            DrawOp::Box { rect, stroke } => stroke_rect(image, rect, *stroke),
            DrawOp::Label { rect, fill, .. } => fill_rect(image, rect, *fill),
            DrawOp::StopLine { y, .. } => dashed_line(image, *y, palette::INFRACTION.stroke),
        }
    }
}

fn blend(image: &mut RgbaImage, x: u32, y: u32, color: [u8; 4]) {
    if x >= image.width() || y >= image.height() {
        return;
    }
    let alpha = color[3] as u32;
    let inv = 255 - alpha;
    let dst = image.get_pixel(x, y).0;
    let mixed = [
        ((color[0] as u32 * alpha + dst[0] as u32 * inv) / 255) as u8,
        ((color[1] as u32 * alpha + dst[1] as u32 * inv) / 255) as u8,
        ((color[2] as u32 * alpha + dst[2] as u32 * inv) / 255) as u8,
        255,
    ];
    image.put_pixel(x, y, Rgba(mixed));
}

fn clamp_span(start: f32, len: f32, max: u32) -> (u32, u32) {
    let end = (start + len.max(0.0)).clamp(0.0, max as f32) as u32;
    let start = start.clamp(0.0, max as f32) as u32;
    (start, end)
}

fn fill_rect(image: &mut RgbaImage, rect: &Rect, color: [u8; 4]) {
    let (x0, x1) = clamp_span(rect.x, rect.width, image.width());
    let (y0, y1) = clamp_span(rect.y, rect.height, image.height());
    for y in y0..y1 {
        for x in x0..x1 {
            blend(image, x, y, color);
        }
    }
}

fn stroke_rect(image: &mut RgbaImage, rect: &Rect, color: [u8; 4]) {
    let (x0, x1) = clamp_span(rect.x, rect.width, image.width());
    let (y0, y1) = clamp_span(rect.y, rect.height, image.height());
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    for t in 0..STROKE_WIDTH {
        for x in x0..x1 {
            blend(image, x, y0.saturating_add(t).min(y1 - 1), color);
            blend(image, x, y1.saturating_sub(1 + t).max(y0), color);
        }
        for y in y0..y1 {
            blend(image, x0.saturating_add(t).min(x1 - 1), y, color);
            blend(image, x1.saturating_sub(1 + t).max(x0), y, color);
        }
    }
}

fn dashed_line(image: &mut RgbaImage, y: f32, color: [u8; 4]) {
    let y = y.max(0.0) as u32;
    if y >= image.height() {
        return;
    }
    let period = DASH_ON + DASH_OFF;
    for x in 0..image.width() {
        if x % period < DASH_ON {
            for t in 0..STROKE_WIDTH {
                blend(image, x, (y + t).min(image.height() - 1), color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::plan::{DrawOp, DrawPlan, Rect};

    fn blank(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn box_stroke_paints_edges_not_interior() {
        let mut image = blank(100, 100);
        let plan = DrawPlan {
            ops: vec![DrawOp::Box {
                rect: Rect {
                    x: 10.0,
                    y: 10.0,
                    width: 50.0,
                    height: 40.0,
                },
                stroke: [0, 255, 0, 255],
            }],
        };
        rasterize(&mut image, &plan);

        assert_eq!(image.get_pixel(10, 10).0, [0, 255, 0, 255]);
        assert_eq!(image.get_pixel(59, 49).0, [0, 255, 0, 255]);
        // Interior stays untouched.
        assert_eq!(image.get_pixel(35, 30).0, [0, 0, 0, 255]);
    }

    #[test]
    fn label_fill_blends_at_80_percent() {
        let mut image = blank(100, 100);
        let plan = DrawPlan {
            ops: vec![DrawOp::Label {
                rect: Rect {
                    x: 0.0,
                    y: 0.0,
                    width: 10.0,
                    height: 10.0,
                },
                text: "car".to_string(),
                fill: [0, 255, 0, 204],
                text_color: [0, 0, 0, 255],
            }],
        };
        rasterize(&mut image, &plan);
        let pixel = image.get_pixel(5, 5).0;
        // 0.8 * 255 = 204 against a black background.
        assert_eq!(pixel, [0, 204, 0, 255]);
    }

    #[test]
    fn stop_line_is_dashed() {
        let mut image = blank(60, 60);
        let plan = DrawPlan {
            ops: vec![DrawOp::StopLine {
                y: 30.0,
                label: "STOP LINE (Y=120)".to_string(),
            }],
        };
        rasterize(&mut image, &plan);
        // First dash segment is on, the gap after it is off.
        assert_eq!(image.get_pixel(0, 30).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(12, 30).0, [0, 0, 0, 255]);
    }

    #[test]
    fn offscreen_ops_are_clipped_not_panicking() {
        let mut image = blank(20, 20);
        let plan = DrawPlan {
            ops: vec![DrawOp::Box {
                rect: Rect {
                    x: 15.0,
                    y: 15.0,
                    width: 50.0,
                    height: 50.0,
                },
                stroke: [255, 0, 0, 255],
            }],
        };
        rasterize(&mut image, &plan);
        assert_eq!(image.get_pixel(19, 15).0, [255, 0, 0, 255]);
    }

    #[test]
    fn annotated_frame_round_trips_from_base64() {
        let source = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 130, 140]));
        let mut jpeg = Vec::new();
        source
            .write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut jpeg, 90,
            ))
            .unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);

        let decoded = decode_annotated_frame(&encoded).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 4);

        let with_prefix = format!("data:image/jpeg;base64,{encoded}");
        assert!(decode_annotated_frame(&with_prefix).is_ok());
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert_matches!(
            decode_annotated_frame("%%not-base64%%"),
            Err(RenderError::Base64(_))
        );
    }
}
