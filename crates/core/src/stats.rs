//! Rolling per-second counters for the stats overlay.
//!
//! The overlay shows three live figures: render-loop frame rate,
//! inference round-trip frame rate, and the latest detection count.
//! The rates use a simple rolling reset: count events, and once a
//! full second has elapsed publish the count as the rate and start
//! over.

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Counts events and publishes the count once per one-second window.
#[derive(Debug, Clone)]
pub struct RollingCounter {
    window_start: Instant,
    count: u32,
    rate: u32,
}

impl RollingCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            rate: 0,
        }
    }

    /// Record one event. Returns `Some(rate)` when a window just
    /// closed, which callers use to publish a stats update.
    pub fn record(&mut self) -> Option<u32> {
        self.record_at(Instant::now())
    }

    fn record_at(&mut self, now: Instant) -> Option<u32> {
        self.count += 1;
        if now.duration_since(self.window_start) >= WINDOW {
            self.rate = self.count;
            self.count = 0;
            self.window_start = now;
            Some(self.rate)
        } else {
            None
        }
    }

    /// Most recently published rate (events per second).
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Clear the counter and the published rate.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for RollingCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rate_before_first_window_closes() {
        let start = Instant::now();
        let mut counter = RollingCounter::starting_at(start);
        for i in 0..5 {
            assert_eq!(
                counter.record_at(start + Duration::from_millis(100 * (i + 1))),
                None
            );
        }
        assert_eq!(counter.rate(), 0);
    }

    #[test]
    fn rate_published_when_window_closes() {
        let start = Instant::now();
        let mut counter = RollingCounter::starting_at(start);
        for i in 0..29 {
            counter.record_at(start + Duration::from_millis(33 * (i + 1)));
        }
        // 30th event lands past the one-second mark and closes the window.
        let rate = counter.record_at(start + Duration::from_millis(1010));
        assert_eq!(rate, Some(30));
        assert_eq!(counter.rate(), 30);
    }

    #[test]
    fn window_restarts_after_publishing() {
        let start = Instant::now();
        let mut counter = RollingCounter::starting_at(start);
        counter.record_at(start + Duration::from_millis(1001));
        assert_eq!(counter.rate(), 1);

        // Two events in the next window.
        assert_eq!(counter.record_at(start + Duration::from_millis(1500)), None);
        let rate = counter.record_at(start + Duration::from_millis(2100));
        assert_eq!(rate, Some(2));
    }

    #[test]
    fn reset_clears_rate_and_count() {
        let start = Instant::now();
        let mut counter = RollingCounter::starting_at(start);
        counter.record_at(start + Duration::from_millis(1100));
        assert_eq!(counter.rate(), 1);
        counter.reset();
        assert_eq!(counter.rate(), 0);
    }
}
