//! Overlay draw plans.
//!
//! A plan is the ordered list of primitives one inference result
//! paints over a frame. Geometry rules (label placement, stop line
//! scaling) live here; pixels live in [`crate::raster`].

use vigia_core::Detection;

use crate::palette::{self, ColorScheme, Rgba};

/// Font metrics used to size label chips. Labels render in a 14px
/// monospace-ish face; width is estimated per character.
const LABEL_CHAR_WIDTH: f32 = 8.0;
const LABEL_HEIGHT: f32 = 20.0;
const LABEL_PADDING: f32 = 4.0;

/// The stop line Y coordinate is configured against a 640px-tall
/// reference canvas and scaled to the actual frame height.
const STOP_LINE_REFERENCE_HEIGHT: f32 = 640.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One overlay primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Bounding box outline, 3px stroke.
    Box { rect: Rect, stroke: Rgba },
    /// Label chip: filled background rect with text inside.
    Label {
        rect: Rect,
        text: String,
        fill: Rgba,
        text_color: Rgba,
    },
    /// Dashed horizontal stop line with its caption.
    StopLine { y: f32, label: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawPlan {
    pub ops: Vec<DrawOp>,
}

/// What the overlay should include besides the detections themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Draw the stop line at this configured Y (reference coordinates)
    /// when traffic light analysis is on.
    pub stop_line_y: Option<u32>,
}

/// Compose the " | "-joined label for a detection. Fields appear in a
/// fixed order; confidence is always shown, other absent fields are
/// skipped.
pub fn detection_label(detection: &Detection) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(kind) = &detection.vehicle_type {
        parts.push(kind.clone());
    }
    parts.push(format!("{:.1}%", detection.confidence * 100.0));
    if let Some(plate) = &detection.license_plate {
        parts.push(plate.clone());
    }
    if let Some(speed) = detection.speed {
        parts.push(format!("{speed:.1} km/h"));
    }
    if let Some(infraction) = &detection.infraction_type {
        parts.push(infraction.clone());
    }
    parts.join(" | ")
}

fn label_rect(detection: &Detection, text: &str) -> Rect {
    let bbox = &detection.bbox;
    let width = text.len() as f32 * LABEL_CHAR_WIDTH + LABEL_PADDING * 2.0;
    // Above the box unless that would clip off the top edge.
    let y = if bbox.y > LABEL_HEIGHT + LABEL_PADDING {
        bbox.y - LABEL_HEIGHT - LABEL_PADDING
    } else {
        bbox.y + bbox.height + LABEL_PADDING
    };
    Rect {
        x: bbox.x,
        y,
        width,
        height: LABEL_HEIGHT,
    }
}

/// Build the draw plan for one result: a box and label per detection,
/// then the stop line on top.
pub fn build_plan(detections: &[Detection], config: &OverlayConfig) -> DrawPlan {
    let mut ops = Vec::with_capacity(detections.len() * 2 + 1);

    for detection in detections {
        let ColorScheme { stroke, fill, text } = palette::color_for(detection);
        ops.push(DrawOp::Box {
            rect: Rect {
                x: detection.bbox.x,
                y: detection.bbox.y,
                width: detection.bbox.width,
                height: detection.bbox.height,
            },
            stroke,
        });

        let label = detection_label(detection);
        if !label.is_empty() {
            ops.push(DrawOp::Label {
                rect: label_rect(detection, &label),
                text: label,
                fill,
                text_color: text,
            });
        }
    }

    if let Some(stop_line_y) = config.stop_line_y {
        let scale = config.canvas_height as f32 / STOP_LINE_REFERENCE_HEIGHT;
        ops.push(DrawOp::StopLine {
            y: stop_line_y as f32 * scale,
            label: format!("STOP LINE (Y={stop_line_y})"),
        });
    }

    DrawPlan { ops }
}
