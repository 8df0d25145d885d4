//! The frame source abstraction and the source factory.

use async_trait::async_trait;
use image::RgbImage;

use crate::error::CaptureError;
use crate::file::FileSource;
use crate::pattern::PatternSource;

/// One decoded frame from a source.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub image: RgbImage,
    /// Monotonically increasing frame index within the source.
    pub index: u64,
}

impl VideoFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A stream of decoded frames at a nominal rate.
///
/// Sources are exclusively owned by one session; dropping the source
/// releases the underlying device, process, or file handles.
#[async_trait]
pub trait FrameSource: Send {
    /// Human-readable description for logs ("camera /dev/video0").
    fn describe(&self) -> String;

    /// Nominal frame rate; drives the session's render tick.
    fn nominal_fps(&self) -> u32;

    /// Produce the next frame. `Err(CaptureError::EndOfStream)` means
    /// the source finished cleanly (file playback reached the end).
    async fn next_frame(&mut self) -> Result<VideoFrame, CaptureError>;
}

/// Which media source a session captures from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Live camera device (requires the `camera-v4l2` feature).
    Camera {
        device: String,
        width: u32,
        height: u32,
        fps: u32,
    },
    /// Local video file or directory of still images.
    File { path: std::path::PathBuf },
    /// Synthetic moving test pattern.
    Pattern { width: u32, height: u32, fps: u32 },
}

impl SourceConfig {
    /// Default camera configuration (1280x720, matching the capture
    /// constraints the dashboards request).
    pub fn default_camera() -> Self {
        Self::Camera {
            device: "/dev/video0".to_string(),
            width: 1280,
            height: 720,
            fps: 30,
        }
    }
}

/// Open the configured source.
///
/// The caller wraps this in the session's 5-second readiness bound;
/// opening itself does no retries.
pub async fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match config {
        SourceConfig::Camera {
            device,
            width,
            height,
            fps,
        } => open_camera(device, *width, *height, *fps),
        SourceConfig::File { path } => {
            let source = FileSource::open(path).await?;
            Ok(Box::new(source))
        }
        SourceConfig::Pattern { width, height, fps } => {
            Ok(Box::new(PatternSource::new(*width, *height, *fps)))
        }
    }
}

#[cfg(feature = "camera-v4l2")]
fn open_camera(
    device: &str,
    width: u32,
    height: u32,
    fps: u32,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    let source = crate::camera::CameraSource::open(device, width, height, fps)?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "camera-v4l2"))]
fn open_camera(
    device: &str,
    _width: u32,
    _height: u32,
    _fps: u32,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::Unsupported(format!(
        "camera capture ({device}) requires the camera-v4l2 feature"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn pattern_source_opens_and_produces_frames() {
        let config = SourceConfig::Pattern {
            width: 64,
            height: 48,
            fps: 30,
        };
        let mut source = open_source(&config).await.unwrap();
        assert_eq!(source.nominal_fps(), 30);

        let first = source.next_frame().await.unwrap();
        let second = source.next_frame().await.unwrap();
        assert_eq!(first.width(), 64);
        assert_eq!(first.height(), 48);
        assert_eq!(first.index, 1);
        assert_eq!(second.index, 2);
    }

    #[tokio::test]
    async fn missing_file_source_is_not_found() {
        let config = SourceConfig::File {
            path: "/nonexistent/clip.mp4".into(),
        };
        let result = open_source(&config).await;
        assert_matches!(result.err(), Some(CaptureError::NotFound(_)));
    }

    #[cfg(not(feature = "camera-v4l2"))]
    #[tokio::test]
    async fn camera_without_feature_is_unsupported() {
        let result = open_source(&SourceConfig::default_camera()).await;
        assert_matches!(result.err(), Some(CaptureError::Unsupported(_)));
    }
}
