/*============================================================
  Synavera Project: Syn-Pak
  Module: synpak_core::speed
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Derive transfer speed from progress samples and keep
    reported progress fractions monotone.

  Security / Safety Notes:
    Pure arithmetic; no I/O performed in this module.

  Dependencies:
    None beyond std.

  Operational Scope:
    Driven by the download coordinator and the scene-load step
    of the update session.

  Revision History:
    2026-10-12 COD  Added cumulative speed tracker.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Finite results for every input
    - No hidden clocks; time comes from samples
============================================================*/

use crate::package_info::DownloadProgressSample;

/// Cumulative-average transfer speed since a fixed start time.
///
/// Callers that need instantaneous speed must difference successive
/// samples themselves.
#[derive(Debug, Clone, Copy)]
pub struct SpeedTracker {
    started_at_millis: i64,
    current: f64,
}

impl SpeedTracker {
    pub fn new(started_at_millis: i64) -> Self {
        Self {
            started_at_millis,
            current: 0.0,
        }
    }

    /// Fold in a sample and return bytes per second.
    pub fn update(&mut self, sample: &DownloadProgressSample) -> f64 {
        // Elapsed is floored at 1 ms so a sample at t0 never divides by zero.
        let elapsed_ms = sample
            .timestamp_millis
            .saturating_sub(self.started_at_millis)
            .max(1);
        let elapsed_secs = elapsed_ms as f64 / 1000.0;
        self.current = sample.finished_bytes as f64 / elapsed_secs;
        self.current
    }

    /// Last computed speed in bytes per second.
    pub fn current(&self) -> f64 {
        self.current
    }
}

/// Maps raw progress values onto a non-decreasing 0–1 fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicProgress {
    last: f32,
}

impl MonotonicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance from a 0–100 percentage.
    pub fn advance_percentage(&mut self, percentage: f64) -> f32 {
        self.advance_fraction((percentage / 100.0) as f32)
    }

    /// Advance from a 0–1 fraction. NaN and regressions keep the last value.
    pub fn advance_fraction(&mut self, fraction: f32) -> f32 {
        if fraction.is_finite() {
            self.last = self.last.max(fraction.clamp(0.0, 1.0));
        }
        self.last
    }

    /// Jump to 1.0; returns true if that moved the value.
    pub fn complete(&mut self) -> bool {
        let moved = self.last < 1.0;
        self.last = 1.0;
        moved
    }

    pub fn last(&self) -> f32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(bytes: u64, at: i64) -> DownloadProgressSample {
        DownloadProgressSample::from_bytes(bytes, 10_000, at)
    }

    #[test]
    fn speed_is_bytes_over_elapsed_seconds() {
        let mut tracker = SpeedTracker::new(1_000);
        assert_eq!(tracker.update(&sample(2_000, 3_000)), 1_000.0);
        assert_eq!(tracker.current(), 1_000.0);
    }

    #[test]
    fn sample_at_start_time_is_finite() {
        let mut tracker = SpeedTracker::new(5_000);
        let speed = tracker.update(&sample(10, 5_000));
        assert!(speed.is_finite());
        assert_eq!(speed, 10_000.0);
    }

    #[test]
    fn progress_never_regresses() {
        let mut progress = MonotonicProgress::new();
        assert_eq!(progress.advance_percentage(40.0), 0.4);
        assert_eq!(progress.advance_percentage(20.0), 0.4);
        assert_eq!(progress.advance_fraction(f32::NAN), 0.4);
        assert_eq!(progress.advance_percentage(250.0), 1.0);
        assert!(!progress.complete());
    }

    proptest! {
        #[test]
        fn speed_is_non_negative_and_finite(
            start in -1_000_000i64..1_000_000,
            offset in -10_000i64..10_000_000,
            bytes in 0u64..u64::MAX / 2,
        ) {
            let mut tracker = SpeedTracker::new(start);
            let speed = tracker.update(&sample(bytes, start + offset));
            prop_assert!(speed >= 0.0);
            prop_assert!(speed.is_finite());
        }

        #[test]
        fn fractions_stay_ordered(values in proptest::collection::vec(-50.0f64..150.0, 1..40)) {
            let mut progress = MonotonicProgress::new();
            let mut previous = 0.0f32;
            for value in values {
                let next = progress.advance_percentage(value);
                prop_assert!(next >= previous);
                prop_assert!((0.0..=1.0).contains(&next));
                previous = next;
            }
        }
    }
}
