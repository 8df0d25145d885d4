//! Shared domain types for the vigia streaming client.
//!
//! This crate holds the wire-level detection types, the per-session
//! detection options (the "capability set"), the pluggable frame-rate
//! control policy, and the rolling per-second counters used for the
//! stats overlay. It has no I/O of its own.

pub mod detection;
pub mod options;
pub mod rate;
pub mod stats;

pub use detection::{BoundingBox, Detection, InfractionKind, TrafficLightState};
pub use options::DetectionOptions;
pub use rate::{FixedCadence, RateControl, SampleDecision};
pub use stats::RollingCounter;
