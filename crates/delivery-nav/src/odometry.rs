use delivery_protocol::{tick_delta, Pose};

/// Differential-drive geometry constants.
#[derive(Debug, Clone, Copy)]
pub struct OdometryConfig {
    /// Distance between the two wheel contact points, metres.
    pub wheel_base_m: f64,
    /// Wheel radius, metres.
    pub wheel_radius_m: f64,
    /// Encoder ticks per full wheel revolution.
    pub ticks_per_revolution: f64,
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self { wheel_base_m: 0.30, wheel_radius_m: 0.05, ticks_per_revolution: 360.0 }
    }
}

/// Converts a pair of wheel tick deltas into `(ds, dtheta)` (linear
/// displacement and heading change), per the kinematics of §4.2.
pub fn kinematics_delta(config: &OdometryConfig, delta_left_ticks: i32, delta_right_ticks: i32) -> (f64, f64) {
    let arc = 2.0 * std::f64::consts::PI * config.wheel_radius_m / config.ticks_per_revolution;
    let dl = arc * delta_left_ticks as f64;
    let dr = arc * delta_right_ticks as f64;
    let ds = (dl + dr) / 2.0;
    let dtheta = (dr - dl) / config.wheel_base_m;
    (ds, dtheta)
}

/// Applies a `(ds, dtheta)` delta to `pose` using the midpoint heading
/// approximation, returning the new pose.
pub fn apply_delta(pose: Pose, ds: f64, dtheta: f64) -> Pose {
    let mid_theta = pose.theta + dtheta / 2.0;
    Pose::new(pose.x + ds * mid_theta.cos(), pose.y + ds * mid_theta.sin(), pose.theta + dtheta)
}

/// Dead-reckoned pose tracker fed directly by cumulative encoder counts.
#[derive(Debug, Clone)]
pub struct OdometryIntegrator {
    config: OdometryConfig,
    pose: Pose,
    last_ticks: Option<(i32, i32)>,
}

impl OdometryIntegrator {
    pub fn new(config: OdometryConfig, start_pose: Pose) -> Self {
        Self { config, pose: start_pose, last_ticks: None }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn reset(&mut self, pose: Pose) {
        self.pose = pose;
        self.last_ticks = None;
    }

    /// Feeds one `ENCODER:<left>,<right>` reading (cumulative counts since
    /// microcontroller reset) and returns the `(ds, dtheta)` delta applied,
    /// or `(0.0, 0.0)` on the very first reading (no prior count to diff
    /// against).
    pub fn update_from_ticks(&mut self, left_ticks: i32, right_ticks: i32) -> (f64, f64) {
        let Some((prev_left, prev_right)) = self.last_ticks else {
            self.last_ticks = Some((left_ticks, right_ticks));
            return (0.0, 0.0);
        };
        self.last_ticks = Some((left_ticks, right_ticks));
        let (ds, dtheta) = kinematics_delta(
            &self.config,
            tick_delta(prev_left, left_ticks),
            tick_delta(prev_right, right_ticks),
        );
        self.pose = apply_delta(self.pose, ds, dtheta);
        (ds, dtheta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_delta_yields_zero_movement() {
        let config = OdometryConfig::default();
        let pose = Pose::new(1.0, 2.0, 0.3);
        let new_pose = apply_delta(pose, 0.0, 0.0);
        assert_eq!(new_pose, pose);
    }

    #[test]
    fn pure_counter_rotation_produces_only_rotation() {
        let config = OdometryConfig::default();
        let (ds, dtheta) = kinematics_delta(&config, -10, 10);
        assert_abs_diff_eq!(ds, 0.0, epsilon = 1e-9);
        assert!(dtheta.abs() > 0.0);
        let pose = apply_delta(Pose::new(0.0, 0.0, 0.0), ds, dtheta);
        assert_abs_diff_eq!(pose.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn symmetric_ticks_advance_straight_with_unchanged_heading() {
        let config = OdometryConfig::default();
        let (ds, dtheta) = kinematics_delta(&config, 100, 100);
        assert_abs_diff_eq!(dtheta, 0.0, epsilon = 1e-9);
        let pose = apply_delta(Pose::new(0.0, 0.0, 0.0), ds, dtheta);
        assert_abs_diff_eq!(pose.x, ds, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn integrator_first_reading_establishes_baseline_without_moving() {
        let mut integrator = OdometryIntegrator::new(OdometryConfig::default(), Pose::origin());
        let (ds, dtheta) = integrator.update_from_ticks(1000, 1000);
        assert_eq!((ds, dtheta), (0.0, 0.0));
        assert_eq!(integrator.pose(), Pose::origin());
    }

    #[test]
    fn integrator_accumulates_across_successive_readings() {
        let mut integrator = OdometryIntegrator::new(OdometryConfig::default(), Pose::origin());
        integrator.update_from_ticks(0, 0);
        integrator.update_from_ticks(360, 360); // exactly one wheel revolution
        let expected_ds = 2.0 * std::f64::consts::PI * OdometryConfig::default().wheel_radius_m;
        assert_abs_diff_eq!(integrator.pose().x, expected_ds, epsilon = 1e-9);
    }
}
