//! Capture error taxonomy.

/// Errors raised while opening or reading a frame source.
///
/// `PermissionDenied`, `DeviceNotFound`, and readiness timeouts map
/// onto session-level media errors; `EndOfStream` is the clean
/// end-of-file signal for file playback and ends the session without
/// an error state.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture device exists but access was refused.
    #[error("Permission denied opening capture source: {0}")]
    PermissionDenied(String),

    /// No such device or file.
    #[error("Capture source not found: {0}")]
    NotFound(String),

    /// The source did not deliver a usable frame within the readiness
    /// bound.
    #[error("Capture source timed out becoming ready")]
    Timeout,

    /// A file source reached its end. Not an error condition.
    #[error("End of stream")]
    EndOfStream,

    /// A captured buffer could not be decoded into an image.
    #[error("Frame decode failed: {0}")]
    Decode(String),

    /// The source kind is not available in this build (missing
    /// feature or missing host tooling).
    #[error("Capture source unsupported: {0}")]
    Unsupported(String),

    /// The external ffmpeg/ffprobe binary failed.
    #[error("ffmpeg error: {0}")]
    Ffmpeg(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Classify an I/O error against a named source path, so device
    /// and file open failures surface as the right media error.
    pub(crate) fn from_open_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            _ => Self::Io(err),
        }
    }
}
