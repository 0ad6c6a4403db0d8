// ------------------------------------------------------------
// Frame-rate meter
// ------------------------------------------------------------

use std::time::Instant;

/// Measures playback speed over windows of `interval` frames.
///
/// Purely advisory: the reading never feeds back into simulated time.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    interval: u64,
    window_start: Option<Instant>,
}

impl FpsMeter {
    /// An `interval` of 0 is treated as 1.
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            window_start: None,
        }
    }

    /// Record frame `frame_index` seen at `now`.
    ///
    /// Frame 0 opens the first window. Every later multiple of `interval`
    /// closes the current window, returns its rate and opens the next one.
    /// A window that took no measurable time yields no reading.
    pub fn observe(&mut self, frame_index: u64, now: Instant) -> Option<f64> {
        if frame_index == 0 {
            self.window_start = Some(now);
            return None;
        }
        if frame_index % self.interval != 0 {
            return None;
        }

        let start = self.window_start.replace(now)?;
        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        if elapsed == 0.0 {
            return None;
        }
        Some(self.interval as f64 / elapsed)
    }
}
