//! Inference service WebSocket message types and parser.
//!
//! Outbound messages are tagged JSON (`{"type": "frame", ...}`).
//! Inbound traffic mixes tagged control messages (`pong`,
//! `config_received`) with untagged detection result objects, so the
//! parser dispatches on the presence of a `"type"` field.

use serde::{Deserialize, Serialize};
use vigia_core::{Detection, DetectionOptions, InfractionKind, TrafficLightState};

/// Detection configuration as it travels on the wire, attached to
/// `config` messages and repeated on every `frame`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigPayload {
    pub confidence_threshold: f32,
    pub enable_ocr: bool,
    pub simulate_infractions: bool,
    pub infractions: Vec<InfractionKind>,
    pub speed_limit: u32,
    pub enable_traffic_light: bool,
    pub stop_line_y: u32,
    pub enable_lane_detection: bool,
    pub yolo_confidence_threshold: f32,
}

impl From<&DetectionOptions> for ConfigPayload {
    fn from(options: &DetectionOptions) -> Self {
        Self {
            confidence_threshold: options.confidence_threshold,
            enable_ocr: options.enable_ocr,
            simulate_infractions: options.simulate_infractions,
            infractions: options.enabled_infractions(),
            speed_limit: options.speed_limit,
            enable_traffic_light: options.enable_traffic_light,
            stop_line_y: options.stop_line_y,
            enable_lane_detection: options.enable_lane_detection,
            yolo_confidence_threshold: options.yolo_confidence_threshold,
        }
    }
}

/// Messages the client sends to the inference service.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Announce detection configuration; sent once right after connect.
    #[serde(rename = "config")]
    Config { data: ConfigPayload },

    /// One JPEG frame (base64) with the configuration in effect.
    #[serde(rename = "frame")]
    Frame { image: String, config: ConfigPayload },

    /// Keepalive; the server answers with `pong`.
    #[serde(rename = "ping")]
    Ping,
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One detection result from the inference service.
///
/// All fields are optional on the wire; absent ones default so a
/// minimal `{"detections": []}` still parses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InferenceResult {
    #[serde(default)]
    pub detections: Vec<Detection>,

    /// Server-annotated JPEG frame (base64), when the service echoes
    /// frames back.
    #[serde(default)]
    pub frame: Option<String>,

    #[serde(default)]
    pub infractions_registered: u32,

    #[serde(default)]
    pub traffic_light_state: Option<TrafficLightState>,

    #[serde(default)]
    pub traffic_light_confidence: Option<f32>,

    #[serde(default)]
    pub lanes_detected: Option<u32>,

    /// Server-side processing rate.
    #[serde(default)]
    pub fps: Option<f32>,

    #[serde(default)]
    pub frame_count: Option<u64>,

    /// Per-frame processing error; the stream continues after one.
    #[serde(default)]
    pub error: Option<String>,
}

/// Tagged control messages from the service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "pong")]
    Pong,

    #[serde(rename = "config_received")]
    ConfigReceived { status: String },
}

/// Anything the service sends.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Control(ControlMessage),
    Result(InferenceResult),
}

/// Parse an inbound text message.
///
/// Result objects carry no `"type"` tag, so presence of the tag picks
/// the control path. Unknown tagged types are an error; callers log
/// and continue.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if value.get("type").is_some() {
        let control = ControlMessage::deserialize(&value)?;
        Ok(InboundMessage::Control(control))
    } else {
        let result = InferenceResult::deserialize(&value)?;
        Ok(InboundMessage::Result(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn config_message_serializes_with_tag_and_data() {
        let options = DetectionOptions::default();
        let msg = OutboundMessage::Config {
            data: ConfigPayload::from(&options),
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "config");
        assert_eq!(json["data"]["confidence_threshold"], 0.2);
        assert_eq!(json["data"]["speed_limit"], 60);
        assert_eq!(json["data"]["stop_line_y"], 120);
    }

    #[test]
    fn frame_message_carries_image_and_config() {
        let options = DetectionOptions::default();
        let msg = OutboundMessage::Frame {
            image: "aGVsbG8=".to_string(),
            config: ConfigPayload::from(&options),
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "frame");
        assert_eq!(json["image"], "aGVsbG8=");
        assert!(json["config"].is_object());
    }

    #[test]
    fn ping_is_bare() {
        let json = OutboundMessage::Ping.to_json().unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[test]
    fn enabled_infractions_follow_the_toggles() {
        let mut options = DetectionOptions::default();
        options.enable_traffic_light = true;
        options.enable_lane_detection = false;
        let payload = ConfigPayload::from(&options);
        assert!(payload.infractions.contains(&InfractionKind::Speeding));
        assert!(payload.infractions.contains(&InfractionKind::RedLight));
        assert!(!payload.infractions.contains(&InfractionKind::WrongLane));
    }

    #[test]
    fn parse_pong() {
        let msg = parse_inbound(r#"{"type":"pong"}"#).unwrap();
        assert_matches!(msg, InboundMessage::Control(ControlMessage::Pong));
    }

    #[test]
    fn parse_config_received() {
        let msg = parse_inbound(r#"{"type":"config_received","status":"ok"}"#).unwrap();
        assert_matches!(
            msg,
            InboundMessage::Control(ControlMessage::ConfigReceived { status }) if status == "ok"
        );
    }

    #[test]
    fn parse_untagged_result() {
        let json = r#"{
            "detections": [
                {"bbox": [10, 20, 30, 40], "confidence": 0.9, "vehicle_type": "car"}
            ],
            "infractions_registered": 2,
            "fps": 30.0,
            "frame_count": 17
        }"#;
        let msg = parse_inbound(json).unwrap();
        match msg {
            InboundMessage::Result(result) => {
                assert_eq!(result.detections.len(), 1);
                assert_eq!(result.detections[0].bbox.x, 10.0);
                assert_eq!(result.infractions_registered, 2);
                assert_eq!(result.frame_count, Some(17));
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn parse_minimal_result() {
        let msg = parse_inbound(r#"{"detections":[]}"#).unwrap();
        match msg {
            InboundMessage::Result(result) => {
                assert!(result.detections.is_empty());
                assert!(result.error.is_none());
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn parse_result_with_error_field() {
        let msg = parse_inbound(r#"{"error":"Invalid frame data"}"#).unwrap();
        match msg {
            InboundMessage::Result(result) => {
                assert_eq!(result.error.as_deref(), Some("Invalid frame data"));
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn parse_unknown_tagged_type_is_an_error() {
        assert!(parse_inbound(r#"{"type":"surprise"}"#).is_err());
    }

    #[test]
    fn parse_invalid_json_is_an_error() {
        assert!(parse_inbound("not json").is_err());
    }
}
