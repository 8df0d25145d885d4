//! Per-session detection options.
//!
//! [`DetectionOptions`] is the capability set a session is started
//! with: which infraction checks run, the confidence thresholds, and
//! the speed limit. The same option set is sent once in the initial
//! `config` message and snapshotted into every outbound `frame`
//! message, so the endpoint always sees the current values.

use serde::{Deserialize, Serialize};

use crate::detection::InfractionKind;

/// Detection configuration for one session.
///
/// Defaults match the tuned production values: a low pre-filter
/// threshold so the endpoint sees marginal candidates, with the final
/// cut applied server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOptions {
    /// Minimum confidence for a detection to be reported.
    pub confidence_threshold: f32,
    /// Pre-filter threshold for the object detector stage.
    pub yolo_confidence_threshold: f32,
    /// Run license-plate OCR on detected vehicles.
    pub enable_ocr: bool,
    /// Enable the speed-infraction check (demo installations simulate
    /// speed estimates when no calibration exists).
    pub simulate_infractions: bool,
    /// Speed limit in km/h for the speeding check.
    pub speed_limit: u32,
    /// Enable traffic-light detection and the red-light check.
    pub enable_traffic_light: bool,
    /// Y coordinate of the stop line, in the endpoint's 640px-high
    /// reference frame. Only meaningful with `enable_traffic_light`.
    pub stop_line_y: u32,
    /// Enable lane detection and the wrong-lane check.
    pub enable_lane_detection: bool,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.2,
            yolo_confidence_threshold: 0.15,
            enable_ocr: false,
            simulate_infractions: true,
            speed_limit: 60,
            enable_traffic_light: false,
            stop_line_y: 120,
            enable_lane_detection: false,
        }
    }
}

impl DetectionOptions {
    /// Infraction checks implied by the enabled capabilities.
    ///
    /// This is what goes into the `infractions` array on the wire:
    /// speeding when infraction simulation is on, red-light when
    /// traffic-light detection is on, wrong-lane when lane detection
    /// is on.
    pub fn enabled_infractions(&self) -> Vec<InfractionKind> {
        let mut kinds = Vec::new();
        if self.simulate_infractions {
            kinds.push(InfractionKind::Speeding);
        }
        if self.enable_traffic_light {
            kinds.push(InfractionKind::RedLight);
        }
        if self.enable_lane_detection {
            kinds.push(InfractionKind::WrongLane);
        }
        kinds
    }
}
