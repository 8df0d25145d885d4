//! File-backed frame sources.
//!
//! A path can name a single video file (decoded through [`crate::ffmpeg`])
//! or a directory of still images played back in name order. Both end
//! with [`CaptureError::EndOfStream`] once exhausted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::{Child, ChildStdout};

use crate::error::CaptureError;
use crate::ffmpeg::{self, MjpegSplitter, VideoInfo};
use crate::source::{FrameSource, VideoFrame};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Frame rate used for image-directory playback, where no rate is
/// recorded in the media itself.
const IMAGE_DIR_FPS: u32 = 5;

pub enum FileSource {
    Video(VideoFileSource),
    ImageDir(ImageDirSource),
}

impl FileSource {
    pub async fn open(path: &Path) -> Result<Self, CaptureError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| CaptureError::from_open_io(e, &path.display().to_string()))?;
        if meta.is_dir() {
            Ok(Self::ImageDir(ImageDirSource::open(path).await?))
        } else {
            Ok(Self::Video(VideoFileSource::open(path).await?))
        }
    }
}

#[async_trait]
impl FrameSource for FileSource {
    fn describe(&self) -> String {
        match self {
            Self::Video(v) => v.describe(),
            Self::ImageDir(d) => d.describe(),
        }
    }

    fn nominal_fps(&self) -> u32 {
        match self {
            Self::Video(v) => v.nominal_fps(),
            Self::ImageDir(d) => d.nominal_fps(),
        }
    }

    async fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        match self {
            Self::Video(v) => v.next_frame().await,
            Self::ImageDir(d) => d.next_frame().await,
        }
    }
}

/// A video file decoded by a child `ffmpeg` process.
pub struct VideoFileSource {
    path: PathBuf,
    info: VideoInfo,
    // Held to keep the child alive; kill_on_drop reaps it with us.
    _child: Child,
    stdout: ChildStdout,
    splitter: MjpegSplitter,
    index: u64,
}

impl VideoFileSource {
    pub async fn open(path: &Path) -> Result<Self, CaptureError> {
        let info = ffmpeg::probe(path).await?;
        let (child, stdout) = ffmpeg::spawn_decoder(path)?;
        tracing::info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            "opened video file source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            info,
            _child: child,
            stdout,
            splitter: MjpegSplitter::new(),
            index: 0,
        })
    }

    fn describe(&self) -> String {
        format!("video file {}", self.path.display())
    }

    fn nominal_fps(&self) -> u32 {
        self.info.fps
    }

    async fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        let jpeg = ffmpeg::read_frame(&mut self.stdout, &mut self.splitter).await?;
        let decoded = image::load_from_memory(&jpeg)
            .map_err(|e| CaptureError::Decode(format!("mjpeg frame: {e}")))?;
        self.index += 1;
        Ok(VideoFrame {
            image: decoded.to_rgb8(),
            index: self.index,
        })
    }
}

/// A directory of still images, played back once in name order.
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    index: u64,
}

impl ImageDirSource {
    pub async fn open(dir: &Path) -> Result<Self, CaptureError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| CaptureError::from_open_io(e, &dir.display().to_string()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(CaptureError::NotFound(format!(
                "no images under {}",
                dir.display()
            )));
        }
        files.sort();
        tracing::info!(dir = %dir.display(), count = files.len(), "opened image directory source");
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            position: 0,
            index: 0,
        })
    }

    fn describe(&self) -> String {
        format!("image directory {}", self.dir.display())
    }

    fn nominal_fps(&self) -> u32 {
        IMAGE_DIR_FPS
    }

    async fn next_frame(&mut self) -> Result<VideoFrame, CaptureError> {
        let path = match self.files.get(self.position) {
            Some(path) => path.clone(),
            None => return Err(CaptureError::EndOfStream),
        };
        self.position += 1;

        let bytes = tokio::fs::read(&path).await?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| CaptureError::Decode(format!("{}: {e}", path.display())))?;
        self.index += 1;
        Ok(VideoFrame {
            image: decoded.to_rgb8(),
            index: self.index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::RgbImage;

    fn write_png(dir: &Path, name: &str, shade: u8) {
        let image = RgbImage::from_pixel(8, 8, image::Rgb([shade, shade, shade]));
        image.save(dir.join(name)).unwrap();
    }

    #[tokio::test]
    async fn image_dir_plays_in_name_order_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "b.png", 200);
        write_png(dir.path(), "a.png", 10);

        let mut source = FileSource::open(dir.path()).await.unwrap();
        assert_eq!(source.nominal_fps(), IMAGE_DIR_FPS);

        let first = source.next_frame().await.unwrap();
        let second = source.next_frame().await.unwrap();
        // a.png sorts before b.png.
        assert_eq!(first.image.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(second.image.get_pixel(0, 0).0, [200, 200, 200]);

        assert_matches!(
            source.next_frame().await,
            Err(CaptureError::EndOfStream)
        );
    }

    #[tokio::test]
    async fn empty_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            FileSource::open(dir.path()).await.err(),
            Some(CaptureError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn non_image_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"x")
            .await
            .unwrap();
        write_png(dir.path(), "frame.png", 77);

        let mut source = FileSource::open(dir.path()).await.unwrap();
        let frame = source.next_frame().await.unwrap();
        assert_eq!(frame.image.get_pixel(0, 0).0, [77, 77, 77]);
        assert_matches!(
            source.next_frame().await,
            Err(CaptureError::EndOfStream)
        );
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        assert_matches!(
            FileSource::open(Path::new("/no/such/clip.mp4")).await.err(),
            Some(CaptureError::NotFound(_))
        );
    }
}
