//! Detection overlay rendering.
//!
//! Turns an inference result into a [`plan::DrawPlan`] (category-colored
//! bounding boxes, label chips, the stop line) and optionally rasterizes
//! the plan onto a frame. Building the plan and painting it are split so
//! overlay geometry and colors stay testable without pixel inspection.

pub mod palette;
pub mod plan;
pub mod raster;

pub use palette::{color_for, ColorScheme, Rgba};
pub use plan::{build_plan, DrawOp, DrawPlan, OverlayConfig};
pub use raster::{decode_annotated_frame, rasterize, RenderError};
