//! Frame-rate control policy.
//!
//! Outbound bandwidth and inference load are bounded by sampling: the
//! session loop ticks at the source's nominal frame rate, and the rate
//! policy decides which ticks actually produce a transmitted frame and
//! how aggressively that frame is downscaled and recompressed. Frames
//! between samples are discarded, never queued.
//!
//! The policy is a trait so the fixed production cadence can later be
//! replaced with an adaptive one (driven by measured round-trip times)
//! without touching the session loop.

use std::time::Duration;

/// Downscale and recompression parameters for one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleDecision {
    /// Linear scale factor applied to both dimensions before encoding.
    pub scale: f32,
    /// JPEG quality (1-100) for the transmitted frame.
    pub jpeg_quality: u8,
}

/// Decides, per render tick, whether to transmit a frame and at what
/// fidelity.
pub trait RateControl: Send {
    /// Called once per render tick. Returns `Some` when this tick's
    /// frame should be encoded and transmitted.
    fn on_tick(&mut self) -> Option<SampleDecision>;

    /// Observed round-trip time for a completed frame exchange. The
    /// fixed policy ignores this; adaptive policies feed on it.
    fn on_round_trip(&mut self, _rtt: Duration) {}

    /// Reset internal counters. Called when a session restarts.
    fn reset(&mut self);
}

/// Fixed, non-adaptive cadence: transmit one frame in every `every`
/// ticks at a constant scale and quality.
#[derive(Debug, Clone)]
pub struct FixedCadence {
    every: u32,
    decision: SampleDecision,
    ticks: u32,
}

impl FixedCadence {
    pub fn new(every: u32, scale: f32, jpeg_quality: u8) -> Self {
        Self {
            every: every.max(1),
            decision: SampleDecision {
                scale,
                jpeg_quality,
            },
            ticks: 0,
        }
    }
}

impl Default for FixedCadence {
    /// Production cadence: every 3rd frame, half resolution, JPEG
    /// quality 70.
    fn default() -> Self {
        Self::new(3, 0.5, 70)
    }
}

impl RateControl for FixedCadence {
    fn on_tick(&mut self) -> Option<SampleDecision> {
        self.ticks += 1;
        if self.ticks >= self.every {
            self.ticks = 0;
            Some(self.decision)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_cadence_samples_one_in_three() {
        let mut policy = FixedCadence::default();
        let sampled: Vec<bool> = (0..9).map(|_| policy.on_tick().is_some()).collect();
        assert_eq!(
            sampled,
            vec![false, false, true, false, false, true, false, false, true]
        );
    }

    #[test]
    fn fixed_cadence_every_one_samples_all_ticks() {
        let mut policy = FixedCadence::new(1, 0.5, 70);
        assert!(policy.on_tick().is_some());
        assert!(policy.on_tick().is_some());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut policy = FixedCadence::new(0, 1.0, 90);
        assert!(policy.on_tick().is_some());
    }

    #[test]
    fn reset_restarts_the_cadence() {
        let mut policy = FixedCadence::default();
        policy.on_tick();
        policy.on_tick();
        policy.reset();
        assert!(policy.on_tick().is_none());
        assert!(policy.on_tick().is_none());
        assert!(policy.on_tick().is_some());
    }

    #[test]
    fn decision_carries_scale_and_quality() {
        let mut policy = FixedCadence::new(1, 0.25, 55);
        let decision = policy.on_tick().unwrap();
        assert_eq!(decision.scale, 0.25);
        assert_eq!(decision.jpeg_quality, 55);
    }
}
