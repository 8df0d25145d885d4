//! Video file decoding through the host `ffmpeg` / `ffprobe` binaries.
//!
//! Files are probed with `ffprobe` for dimensions and frame rate, then
//! decoded by a long-lived `ffmpeg` child emitting an MJPEG stream on
//! stdout (`image2pipe`). Frames are recovered from the byte stream by
//! scanning for JPEG SOI/EOI markers.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

use crate::error::CaptureError;

/// Probe result for a video file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Run `ffprobe` against the file and extract the first video
/// stream's dimensions and average frame rate.
pub async fn probe(path: &Path) -> Result<VideoInfo, CaptureError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| spawn_error(e, "ffprobe"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::Ffmpeg(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

/// Spawn `ffmpeg` decoding the file to an MJPEG stream on stdout.
///
/// `-re` paces the decode at the file's native rate, so playback
/// behaves like a live source rather than a burst.
pub fn spawn_decoder(path: &Path) -> Result<(Child, ChildStdout), CaptureError> {
    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-re", "-i"])
        .arg(path)
        .args(["-f", "image2pipe", "-vcodec", "mjpeg", "-q:v", "3", "-"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(e, "ffmpeg"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CaptureError::Ffmpeg("ffmpeg stdout not captured".to_string()))?;
    Ok((child, stdout))
}

fn spawn_error(err: std::io::Error, binary: &str) -> CaptureError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CaptureError::Unsupported(format!("{binary} binary not found on host"))
    } else {
        CaptureError::Io(err)
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<VideoInfo, CaptureError> {
    let value: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|e| CaptureError::Ffmpeg(format!("ffprobe output not valid JSON: {e}")))?;
    let stream = value
        .get("streams")
        .and_then(|s| s.get(0))
        .ok_or_else(|| CaptureError::Ffmpeg("no video stream in ffprobe output".to_string()))?;

    let width = stream.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let height = stream.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(CaptureError::Ffmpeg(
            "ffprobe reported zero dimensions".to_string(),
        ));
    }

    let fps = stream
        .get("avg_frame_rate")
        .and_then(|v| v.as_str())
        .map(parse_frame_rate)
        .unwrap_or(0);

    Ok(VideoInfo {
        width,
        height,
        fps: if fps == 0 { 30 } else { fps },
    })
}

/// ffprobe reports rates as a fraction string, e.g. "30000/1001".
fn parse_frame_rate(raw: &str) -> u32 {
    let mut parts = raw.splitn(2, '/');
    let num: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0.0);
    let den: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1.0);
    if den <= 0.0 || num <= 0.0 {
        return 0;
    }
    (num / den).round() as u32
}

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Incremental splitter turning an MJPEG byte stream into individual
/// JPEG frames.
pub struct MjpegSplitter {
    buf: Vec<u8>,
}

impl MjpegSplitter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Extract the next complete JPEG, if one is buffered.
    pub fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        let start = find_marker(&self.buf, SOI, 0)?;
        let end = find_marker(&self.buf, EOI, start + 2)?;
        let frame = self.buf[start..end + 2].to_vec();
        self.buf.drain(..end + 2);
        Some(frame)
    }
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn find_marker(haystack: &[u8], marker: [u8; 2], from: usize) -> Option<usize> {
    if haystack.len() < 2 || from >= haystack.len() - 1 {
        return None;
    }
    haystack[from..]
        .windows(2)
        .position(|w| w == marker)
        .map(|p| p + from)
}

/// Read from the decoder's stdout until the splitter yields a frame.
/// Returns `EndOfStream` when the pipe closes with no frame pending.
pub async fn read_frame(
    stdout: &mut ChildStdout,
    splitter: &mut MjpegSplitter,
) -> Result<Vec<u8>, CaptureError> {
    let mut chunk = [0u8; 16 * 1024];
    loop {
        if let Some(frame) = splitter.next_jpeg() {
            return Ok(frame);
        }
        let n = stdout.read(&mut chunk).await?;
        if n == 0 {
            return Err(CaptureError::EndOfStream);
        }
        splitter.push(&chunk[..n]);
    }
}
