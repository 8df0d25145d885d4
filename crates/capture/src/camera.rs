//! Live camera capture via V4L2 (Linux).
//!
//! The memory-mapped stream borrows the device it was created from,
//! so both live together in a self-referencing holder. Frames are
//! requested as MJPEG and decoded with the `image` crate.

use async_trait::async_trait;
use ouroboros::self_referencing;

use crate::error::CaptureError;
use crate::source::{FrameSource, VideoFrame};

const BUFFER_COUNT: u32 = 4;

#[self_referencing]
struct CameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

pub struct CameraSource {
    path: String,
    state: CameraState,
    width: u32,
    height: u32,
    fps: u32,
    index: u64,
}

impl CameraSource {
    pub fn open(path: &str, width: u32, height: u32, fps: u32) -> Result<Self, CaptureError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(path)
            .map_err(|e| CaptureError::from_open_io(e, path))?;

        let mut format = device
            .format()
            .map_err(|e| CaptureError::from_open_io(e, path))?;
        format.width = width;
        format.height = height;
        format.fourcc = v4l::FourCC::new(b"MJPG");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                tracing::warn!(device = path, error = %err, "failed to set camera format");
                device
                    .format()
                    .map_err(|e| CaptureError::from_open_io(e, path))?
            }
        };
        if &format.fourcc.repr != b"MJPG" {
            return Err(CaptureError::Unsupported(format!(
                "{path} does not offer MJPG capture (got {})",
                format.fourcc
            )));
        }

        if fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(fps);
            if let Err(err) = device.set_params(&params) {
                tracing::warn!(device = path, error = %err, "failed to set camera fps");
            }
        }

        let state = CameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT)
            },
        }
        .try_build()
        .map_err(|e| CaptureError::from_open_io(e, path))?;

        tracing::info!(
            device = path,
            width = format.width,
            height = format.height,
            fps,
            "opened camera source"
        );

        Ok(Self {
            path: path.to_string(),
            state,
            width: format.width,
            height: format.height,
            fps: fps.max(1),
            index: 0,
        })
    }

    fn grab_jpeg(&mut self) -> std::io::Result<Vec<u8>> {
        use v4l::io::traits::CaptureStream;

        self.state.with_mut(|fields| {
            let (buf, _meta) = fields.stream.next()?;
            Ok(buf.to_vec())
        })
    }
}

#[async_trait]
impl FrameSource for CameraSource {
    fn describe(&self) -> String {
        format!("camera {} {}x{}", self.path, self.width, self.height)
    }

    fn nominal_fps(&self) -> u32 {
        self.fps
    }

    async fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        // The V4L2 dequeue blocks until the driver fills a buffer.
        let jpeg = tokio::task::block_in_place(|| self.grab_jpeg())?;
        let decoded = image::load_from_memory(&jpeg)
            .map_err(|e| CaptureError::Decode(format!("camera frame: {e}")))?;
        self.index += 1;
        Ok(VideoFrame {
            image: decoded.to_rgb8(),
            index: self.index,
        })
    }
}
