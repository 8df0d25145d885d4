//! Detection records returned by the inference endpoint.
//!
//! A [`Detection`] describes one object observation in one frame.
//! Detections are ephemeral: each inbound result replaces the previous
//! set wholesale, and no identity is tracked across frames.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in source-frame pixel space.
///
/// The inference endpoint has emitted two wire shapes over time:
/// `[x, y, w, h]` arrays and `{x, y, width, height}` objects. Both
/// deserialize into this type; serialization always uses the object
/// form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundingBoxWire")]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Vertical center of the box, used for stop-line comparisons.
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Accepts both wire encodings of a bounding box.
#[derive(Deserialize)]
#[serde(untagged)]
enum BoundingBoxWire {
    Object {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Array([f32; 4]),
}

impl From<BoundingBoxWire> for BoundingBox {
    fn from(wire: BoundingBoxWire) -> Self {
        match wire {
            BoundingBoxWire::Object {
                x,
                y,
                width,
                height,
            } => Self::new(x, y, width, height),
            BoundingBoxWire::Array([x, y, width, height]) => Self::new(x, y, width, height),
        }
    }
}

/// One object observation returned by the inference endpoint for one
/// frame. Optional fields are populated only when the corresponding
/// capability (OCR, speed estimation, infraction checks) is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    /// Estimated speed in km/h.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infraction_type: Option<String>,
    #[serde(default)]
    pub has_infraction: bool,
}

impl Detection {
    /// True when this detection should be rendered as an infraction
    /// (red override in the palette).
    pub fn is_infraction(&self) -> bool {
        self.has_infraction || self.infraction_type.is_some()
    }
}

/// Infraction checks the client can ask the inference endpoint to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfractionKind {
    Speeding,
    RedLight,
    WrongLane,
}

/// Traffic light state reported on the inbound side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
    #[default]
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_deserializes_from_object_form() {
        let json = r#"{"x":10.0,"y":20.0,"width":50.0,"height":40.0}"#;
        let bbox: BoundingBox = serde_json::from_str(json).unwrap();
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 50.0, 40.0));
    }

    #[test]
    fn bbox_deserializes_from_array_form() {
        let json = r#"[10.0,20.0,50.0,40.0]"#;
        let bbox: BoundingBox = serde_json::from_str(json).unwrap();
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 50.0, 40.0));
    }

    #[test]
    fn bbox_center_y() {
        let bbox = BoundingBox::new(0.0, 100.0, 10.0, 60.0);
        assert_eq!(bbox.center_y(), 130.0);
    }

    #[test]
    fn detection_with_all_fields() {
        let json = r#"{
            "bbox": [5, 6, 7, 8],
            "confidence": 0.92,
            "vehicle_type": "truck",
            "license_plate": "ABC-123",
            "speed": 84.5,
            "infraction_type": "speeding",
            "has_infraction": true
        }"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.vehicle_type.as_deref(), Some("truck"));
        assert_eq!(det.license_plate.as_deref(), Some("ABC-123"));
        assert_eq!(det.speed, Some(84.5));
        assert!(det.is_infraction());
    }

    #[test]
    fn detection_minimal_fields_default() {
        let json = r#"{"bbox":{"x":1,"y":2,"width":3,"height":4},"confidence":0.5}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert!(det.vehicle_type.is_none());
        assert!(!det.has_infraction);
        assert!(!det.is_infraction());
    }

    #[test]
    fn infraction_type_alone_marks_infraction() {
        let json = r#"{"bbox":[0,0,1,1],"confidence":0.4,"infraction_type":"red_light"}"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert!(det.is_infraction());
    }

    #[test]
    fn infraction_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&InfractionKind::Speeding).unwrap(),
            r#""speeding""#
        );
        assert_eq!(
            serde_json::to_string(&InfractionKind::RedLight).unwrap(),
            r#""red_light""#
        );
        assert_eq!(
            serde_json::to_string(&InfractionKind::WrongLane).unwrap(),
            r#""wrong_lane""#
        );
    }

    #[test]
    fn traffic_light_state_parses_known_and_unknown() {
        assert_eq!(
            serde_json::from_str::<TrafficLightState>(r#""red""#).unwrap(),
            TrafficLightState::Red
        );
        assert_eq!(
            serde_json::from_str::<TrafficLightState>(r#""flashing""#).unwrap(),
            TrafficLightState::Unknown
        );
    }
}
