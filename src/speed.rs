//! Smoothed ground speed from successive position fixes.

use crate::geo::{distance_m, PositionSample};

/// Weight of the newest instantaneous reading in the low-pass filter.
pub const DEFAULT_SMOOTHING: f64 = 0.3;

/// Exponential low-pass filter over fix-to-fix speed.
#[derive(Debug, Clone)]
pub struct SpeedEstimator {
    last: Option<PositionSample>,
    smoothed_kmh: f64,
    alpha: f64,
}

impl Default for SpeedEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

impl SpeedEstimator {
    pub fn new(alpha: f64) -> Self {
        Self {
            last: None,
            smoothed_kmh: 0.0,
            alpha,
        }
    }

    /// Feed one fix and return the smoothed speed in km/h.
    ///
    /// The fix always becomes the baseline for the next call, even when
    /// its timestamp is not after the previous one and the reading is
    /// skipped.
    pub fn update(&mut self, sample: PositionSample) -> f64 {
        if let Some(prev) = self.last.replace(sample) {
            let dt = sample.timestamp_ms.saturating_sub(prev.timestamp_ms) as f64 / 1000.0;
            if dt > 0.0 {
                let kmh = distance_m(&prev.coordinate, &sample.coordinate) / dt * 3.6;
                // Invalid geometry must not poison the filter for the rest of the ride.
                if kmh.is_finite() {
                    self.smoothed_kmh = self.smoothed_kmh * (1.0 - self.alpha) + kmh * self.alpha;
                }
            }
        }
        self.smoothed_kmh
    }

    pub fn speed_kmh(&self) -> f64 {
        self.smoothed_kmh
    }

    pub fn last_sample(&self) -> Option<&PositionSample> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{offset_east, Coordinate};

    fn sample_at(meters_east: f64, timestamp_ms: i64) -> PositionSample {
        PositionSample {
            coordinate: offset_east(&Coordinate::new(0.0, 0.0), meters_east),
            timestamp_ms,
        }
    }

    #[test]
    fn first_sample_keeps_initial_speed() {
        let mut est = SpeedEstimator::default();
        assert_eq!(est.update(sample_at(0.0, 1_000)), 0.0);
        assert!(est.last_sample().is_some());
    }

    #[test]
    fn single_step_applies_smoothing() {
        let mut est = SpeedEstimator::default();
        est.update(sample_at(0.0, 0));
        // 10 m in 2 s = 18 km/h, weighted 0.3
        let v = est.update(sample_at(10.0, 2_000));
        assert!((v - 5.4).abs() < 1e-6, "Expected 5.4, got {v}");
    }

    #[test]
    fn converges_monotonically_to_constant_speed() {
        let mut est = SpeedEstimator::default();
        let mut prev = est.update(sample_at(0.0, 0));
        for i in 1..60 {
            let v = est.update(sample_at(10.0 * i as f64, 2_000 * i));
            assert!(v >= prev, "speed dropped from {prev} to {v} at sample {i}");
            assert!(v <= 18.0 + 1e-6);
            prev = v;
        }
        assert!((prev - 18.0).abs() < 1e-3, "Expected ~18 km/h, got {prev}");
    }

    #[test]
    fn non_positive_dt_is_skipped_but_rebases() {
        let mut est = SpeedEstimator::default();
        est.update(sample_at(0.0, 10_000));
        let before = est.update(sample_at(10.0, 12_000));

        // Duplicate timestamp: no change
        assert_eq!(est.update(sample_at(500.0, 12_000)), before);
        // Out of order: no change
        assert_eq!(est.update(sample_at(510.0, 11_000)), before);

        // The skipped fix became the baseline: 10 m from 510 m over 1 s
        let after = est.update(sample_at(520.0, 12_000));
        let expected = before * 0.7 + 36.0 * 0.3;
        assert!((after - expected).abs() < 1e-6, "Expected {expected}, got {after}");
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let mut est = SpeedEstimator::default();
        est.update(sample_at(0.0, i64::MAX));
        assert_eq!(est.update(sample_at(10.0, i64::MIN)), 0.0);

        // Saturates to a huge positive dt: a negligible but finite reading
        let v = est.update(sample_at(20.0, i64::MAX));
        assert!(v.is_finite() && v >= 0.0 && v < 1e-6, "got {v}");
    }

    #[test]
    fn nan_fix_does_not_poison_filter() {
        let mut est = SpeedEstimator::default();
        est.update(sample_at(0.0, 0));
        let v = est.update(sample_at(10.0, 2_000));
        let bad = PositionSample::new(f64::NAN, 0.0, 4_000);
        assert_eq!(est.update(bad), v);
        assert!(est.speed_kmh().is_finite());
    }
}
