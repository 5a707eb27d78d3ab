use std::time::{Duration, Instant};

use delivery_protocol::{Command, Direction, Pose, Waypoint};

use crate::pid::{PidController, PidGains};

#[derive(Debug, Clone, Copy)]
pub struct MotionControllerConfig {
    pub linear_gains: PidGains,
    pub angular_gains: PidGains,
    /// Heading error (radians) above which linear speed is scaled to zero
    /// so the robot turns in place rather than arcing wide.
    pub turn_in_place_threshold_rad: f64,
    pub max_wheel_speed: u8,
    /// Fail with `GoalUnreachable` if distance-to-goal hasn't decreased in
    /// this long.
    pub no_progress_timeout: Duration,
    pub integral_limit: f64,
}

impl Default for MotionControllerConfig {
    fn default() -> Self {
        Self {
            linear_gains: PidGains { kp: 120.0, ki: 2.0, kd: 5.0 },
            angular_gains: PidGains { kp: 80.0, ki: 1.0, kd: 3.0 },
            turn_in_place_threshold_rad: 0.5,
            max_wheel_speed: 220,
            no_progress_timeout: Duration::from_secs(30),
            integral_limit: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionOutcome {
    /// Drive command to send this tick.
    Drive(Command),
    /// The waypoint's tolerance has been satisfied.
    Reached,
    /// Distance-to-goal hasn't decreased for `no_progress_timeout`.
    Stalled,
}

/// Follows one waypoint at a time with two PID loops.
pub struct MotionController {
    config: MotionControllerConfig,
    linear_pid: PidController,
    angular_pid: PidController,
    best_distance: Option<f64>,
    best_distance_at: Option<Instant>,
}

impl MotionController {
    pub fn new(config: MotionControllerConfig) -> Self {
        let linear_pid = PidController::new(config.linear_gains, config.integral_limit);
        let angular_pid = PidController::new(config.angular_gains, config.integral_limit);
        Self { config, linear_pid, angular_pid, best_distance: None, best_distance_at: None }
    }

    /// Resets progress tracking and PID state; call when beginning to
    /// follow a new waypoint.
    pub fn reset(&mut self) {
        self.linear_pid.reset();
        self.angular_pid.reset();
        self.best_distance = None;
        self.best_distance_at = None;
    }

    pub fn step(&mut self, pose: Pose, waypoint: &Waypoint, dt_seconds: f64, now: Instant) -> MotionOutcome {
        if waypoint.is_reached_from(pose.x, pose.y) {
            return MotionOutcome::Reached;
        }

        let distance = pose.distance_to(&Pose::new(waypoint.x, waypoint.y, 0.0));
        match self.best_distance {
            Some(best) if distance < best - 1e-6 => {
                self.best_distance = Some(distance);
                self.best_distance_at = Some(now);
            }
            None => {
                self.best_distance = Some(distance);
                self.best_distance_at = Some(now);
            }
            Some(_) => {
                if let Some(since) = self.best_distance_at {
                    if now.duration_since(since) > self.config.no_progress_timeout {
                        return MotionOutcome::Stalled;
                    }
                }
            }
        }

        let target_heading = pose.heading_to(&Pose::new(waypoint.x, waypoint.y, 0.0));
        let heading_error = pose.heading_error(target_heading);
        let angular_out = self.angular_pid.step(heading_error, dt_seconds);

        let threshold = self.config.turn_in_place_threshold_rad;
        let linear_scale = (1.0 - heading_error.abs() / threshold).clamp(0.0, 1.0);
        let linear_out = self.linear_pid.step(distance, dt_seconds) * linear_scale;

        let (left_speed, right_speed, left_dir, right_dir) =
            differential_from(linear_out, angular_out, self.config.max_wheel_speed);
        MotionOutcome::Drive(Command::Motor { left_speed, right_speed, left_dir, right_dir })
    }
}

/// Maps abstract linear/angular control outputs to per-wheel speed
/// magnitudes and directions.
fn differential_from(linear: f64, angular: f64, max_speed: u8) -> (u8, u8, Direction, Direction) {
    let left = linear - angular;
    let right = linear + angular;
    let to_wheel = |v: f64| -> (u8, Direction) {
        let dir = if v >= 0.0 { Direction::Forward } else { Direction::Reverse };
        let magnitude = v.abs().min(max_speed as f64) as u8;
        (magnitude, dir)
    };
    let (left_speed, left_dir) = to_wheel(left);
    let (right_speed, right_dir) = to_wheel(right);
    (left_speed, right_speed, left_dir, right_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaches_waypoint_already_within_tolerance() {
        let mut controller = MotionController::new(MotionControllerConfig::default());
        let pose = Pose::new(1.0, 1.0, 0.0);
        let waypoint = Waypoint::new(1.02, 1.0, 0.1);
        assert_eq!(controller.step(pose, &waypoint, 0.1, Instant::now()), MotionOutcome::Reached);
    }

    #[test]
    fn drives_toward_a_distant_waypoint() {
        let mut controller = MotionController::new(MotionControllerConfig::default());
        let pose = Pose::new(0.0, 0.0, 0.0);
        let waypoint = Waypoint::with_default_tolerance(5.0, 0.0);
        match controller.step(pose, &waypoint, 0.1, Instant::now()) {
            MotionOutcome::Drive(Command::Motor { left_speed, right_speed, left_dir, right_dir }) => {
                assert_eq!(left_dir, Direction::Forward);
                assert_eq!(right_dir, Direction::Forward);
                assert!(left_speed > 0 || right_speed > 0);
            }
            other => panic!("expected Drive, got {other:?}"),
        }
    }

    #[test]
    fn stalls_after_no_progress_timeout() {
        let config = MotionControllerConfig { no_progress_timeout: Duration::from_millis(10), ..Default::default() };
        let mut controller = MotionController::new(config);
        let waypoint = Waypoint::with_default_tolerance(100.0, 0.0);
        let t0 = Instant::now();
        // first call establishes the baseline distance
        let _ = controller.step(Pose::new(0.0, 0.0, 0.0), &waypoint, 0.1, t0);
        // same distance again after the timeout, with no improvement
        let outcome = controller.step(Pose::new(0.0, 0.0, 0.0), &waypoint, 0.1, t0 + Duration::from_millis(50));
        assert_eq!(outcome, MotionOutcome::Stalled);
    }

    #[test]
    fn differential_from_turns_in_place_for_pure_angular_output() {
        let (left, right, left_dir, right_dir) = differential_from(0.0, 50.0, 220);
        assert_eq!(left, 50);
        assert_eq!(right, 50);
        assert_eq!(left_dir, Direction::Reverse);
        assert_eq!(right_dir, Direction::Forward);
    }
}
