use std::time::{Duration, Instant};

/// Tracks how long a monitored value has continuously exceeded a
/// threshold, firing once the exceedance has lasted longer than a
/// configured window. A reusable, independently testable primitive;
/// the particle filter's pose-variance check is one consumer.
#[derive(Debug, Clone)]
pub struct DivergenceMonitor {
    threshold: f64,
    window: Duration,
    exceeded_since: Option<Instant>,
}

impl DivergenceMonitor {
    pub fn new(threshold: f64, window: Duration) -> Self {
        Self { threshold, window, exceeded_since: None }
    }

    /// Records one observation at `now` and returns `true` once `value`
    /// has stayed above the threshold continuously for at least `window`.
    /// A single observation at or below the threshold resets the clock.
    pub fn observe(&mut self, value: f64, now: Instant) -> bool {
        if value > self.threshold {
            let since = *self.exceeded_since.get_or_insert(now);
            now.duration_since(since) >= self.window
        } else {
            self.exceeded_since = None;
            false
        }
    }

    pub fn reset(&mut self) {
        self.exceeded_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_fire_below_threshold() {
        let mut monitor = DivergenceMonitor::new(1.0, Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(!monitor.observe(0.5, t0));
        assert!(!monitor.observe(0.9, t0 + Duration::from_secs(5)));
    }

    #[test]
    fn fires_only_after_window_of_continuous_exceedance() {
        let mut monitor = DivergenceMonitor::new(1.0, Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(!monitor.observe(2.0, t0));
        assert!(!monitor.observe(2.0, t0 + Duration::from_millis(500)));
        assert!(monitor.observe(2.0, t0 + Duration::from_secs(3)));
    }

    #[test]
    fn a_dip_below_threshold_resets_the_clock() {
        let mut monitor = DivergenceMonitor::new(1.0, Duration::from_secs(2));
        let t0 = Instant::now();
        assert!(!monitor.observe(2.0, t0));
        assert!(!monitor.observe(0.1, t0 + Duration::from_secs(1)));
        assert!(!monitor.observe(2.0, t0 + Duration::from_millis(1_500)));
    }
}
