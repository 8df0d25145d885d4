//! Agent configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use vigia_capture::SourceConfig;
use vigia_client::{BackoffConfig, ReconnectPolicy, SessionConfig};
use vigia_core::DetectionOptions;

/// Fully resolved agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub session: SessionConfig,
    /// Sample 1 frame in N ticks.
    pub sample_every: u32,
    /// Where to write annotated frames, when set.
    pub output_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Read configuration from the environment. `INFERENCE_WS_URL` is
    /// the only required variable.
    pub fn from_env() -> Result<Self, String> {
        let ws_url = std::env::var("INFERENCE_WS_URL")
            .map_err(|_| "INFERENCE_WS_URL environment variable is required".to_string())?;

        let source = parse_source(
            &std::env::var("VIDEO_SOURCE").unwrap_or_else(|_| "pattern".to_string()),
        )?;

        let mut options = DetectionOptions::default();
        if let Some(v) = env_bool("ENABLE_OCR")? {
            options.enable_ocr = v;
        }
        if let Some(v) = env_bool("SIMULATE_INFRACTIONS")? {
            options.simulate_infractions = v;
        }
        if let Some(v) = env_bool("ENABLE_TRAFFIC_LIGHT")? {
            options.enable_traffic_light = v;
        }
        if let Some(v) = env_bool("ENABLE_LANE_DETECTION")? {
            options.enable_lane_detection = v;
        }
        if let Some(v) = env_u32("SPEED_LIMIT")? {
            options.speed_limit = v;
        }
        if let Some(v) = env_u32("STOP_LINE_Y")? {
            options.stop_line_y = v;
        }

        let mut session = SessionConfig::new(ws_url, source);
        session.options = options;
        if let Some(secs) = env_u32("PING_INTERVAL_SECS")? {
            session.ping_interval = Duration::from_secs(secs.max(1) as u64);
        }
        if matches!(std::env::var("RECONNECT").as_deref(), Ok("backoff")) {
            session.reconnect = ReconnectPolicy::Backoff(BackoffConfig::default());
        }

        let sample_every = env_u32("SAMPLE_EVERY")?.unwrap_or(3).max(1);
        let output_dir = std::env::var("OUTPUT_DIR").ok().map(PathBuf::from);

        Ok(Self {
            session,
            sample_every,
            output_dir,
        })
    }
}

/// `VIDEO_SOURCE` accepts `pattern`, `camera:<device>`, or a file or
/// directory path.
fn parse_source(raw: &str) -> Result<SourceConfig, String> {
    if raw == "pattern" {
        return Ok(SourceConfig::Pattern {
            width: 640,
            height: 480,
            fps: 30,
        });
    }
    if let Some(device) = raw.strip_prefix("camera:") {
        return Ok(SourceConfig::Camera {
            device: device.to_string(),
            width: 1280,
            height: 720,
            fps: 30,
        });
    }
    if raw.is_empty() {
        return Err("VIDEO_SOURCE must not be empty".to_string());
    }
    Ok(SourceConfig::File {
        path: PathBuf::from(raw),
    })
}

fn env_bool(name: &str) -> Result<Option<bool>, String> {
    match std::env::var(name) {
        Ok(value) => match value.as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            other => Err(format!("{name} must be a boolean, got {other:?}")),
        },
        Err(_) => Ok(None),
    }
}

fn env_u32(name: &str) -> Result<Option<u32>, String> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} must be an integer, got {value:?}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_source_parses() {
        assert_eq!(
            parse_source("pattern").unwrap(),
            SourceConfig::Pattern {
                width: 640,
                height: 480,
                fps: 30
            }
        );
    }

    #[test]
    fn camera_source_parses() {
        let source = parse_source("camera:/dev/video2").unwrap();
        match source {
            SourceConfig::Camera { device, .. } => assert_eq!(device, "/dev/video2"),
            other => panic!("expected camera, got {other:?}"),
        }
    }

    #[test]
    fn anything_else_is_a_file_path() {
        let source = parse_source("/media/feed.mp4").unwrap();
        match source {
            SourceConfig::File { path } => assert_eq!(path, PathBuf::from("/media/feed.mp4")),
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn empty_source_is_rejected() {
        assert!(parse_source("").is_err());
    }
}
