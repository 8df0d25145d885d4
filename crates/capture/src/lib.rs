//! Media source acquisition for the vigia streaming client.
//!
//! A session streams frames from exactly one [`FrameSource`]:
//! - a live camera (`camera-v4l2` feature, Linux V4L2),
//! - a local video file (decoded through the host `ffmpeg` binary) or
//!   a directory of still images,
//! - a synthetic moving test pattern (tests and demos).
//!
//! Sources hand out decoded RGB frames at a nominal rate; pacing,
//! sampling, and transmission are the session loop's job. The
//! [`encode`] module downsamples and JPEG-encodes sampled frames for
//! the wire.

pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod file;
pub mod pattern;
pub mod source;

#[cfg(feature = "camera-v4l2")]
pub mod camera;

pub use error::CaptureError;
pub use pattern::PatternSource;
pub use source::{open_source, FrameSource, SourceConfig, VideoFrame};
