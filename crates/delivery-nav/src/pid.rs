#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// A standard incremental PID loop with a clamped integral term to limit
/// windup while a waypoint is a long way off.
#[derive(Debug, Clone, Copy)]
pub struct PidController {
    gains: PidGains,
    integral: f64,
    prev_error: Option<f64>,
    integral_limit: f64,
}

impl PidController {
    pub fn new(gains: PidGains, integral_limit: f64) -> Self {
        Self { gains, integral: 0.0, prev_error: None, integral_limit }
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }

    pub fn step(&mut self, error: f64, dt_seconds: f64) -> f64 {
        self.integral = (self.integral + error * dt_seconds).clamp(-self.integral_limit, self.integral_limit);
        let derivative = match self.prev_error {
            Some(prev) if dt_seconds > 0.0 => (error - prev) / dt_seconds,
            _ => 0.0,
        };
        self.prev_error = Some(error);
        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }
}
