use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use delivery_map::OccupancyMap;
use delivery_protocol::{Command, Pose, Scan};
use tracing::{debug, warn};

use crate::box_actuator::BoxActuator;
use crate::error::NavError;
use crate::motion_controller::{MotionController, MotionControllerConfig, MotionOutcome};
use crate::odometry::{OdometryConfig, OdometryIntegrator};
use crate::particle_filter::{ParticleFilter, ParticleFilterConfig};
use crate::planner::{self, PlannerConfig};

/// Sink the navigator sends motor/servo/LED commands to. Kept decoupled
/// from `delivery-serial` so this crate has no hardware I/O dependency;
/// the daemon binary wires a concrete adapter over a serial-link command
/// queue into this trait.
pub trait MotorSink: Send + Sync {
    fn send(&self, command: Command) -> Result<(), NavError>;
}

/// A simple `Arc<AtomicBool>`-backed cancellation flag, cloneable so the
/// owning state-machine tick loop and a spawned `navigate_to` worker can
/// share it.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NavigatorConfig {
    pub odometry: OdometryConfig,
    pub particle_filter: ParticleFilterConfig,
    pub planner: PlannerConfig,
    pub motion: MotionControllerConfig,
    /// Obstacle clearance applied to the raw map before planning.
    pub obstacle_clearance_m: f64,
    /// IR readings below this (raw ADC units, mapped to metres by the
    /// caller) trigger an emergency backup.
    pub ir_emergency_threshold: u16,
    /// After this many IR-triggered emergencies within one `navigate_to`
    /// call, fail with `ObstacleCollision`.
    pub max_ir_emergencies: u32,
    pub tick_interval: Duration,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            odometry: OdometryConfig::default(),
            particle_filter: ParticleFilterConfig::default(),
            planner: PlannerConfig::default(),
            motion: MotionControllerConfig::default(),
            obstacle_clearance_m: 0.30,
            ir_emergency_threshold: 100,
            max_ir_emergencies: 3,
            tick_interval: Duration::from_millis(50),
        }
    }
}

struct SharedState {
    odometry: OdometryIntegrator,
    localizer: ParticleFilter,
    last_scan: Option<Scan>,
}

/// Composes the occupancy map, localizer, planner and motion controller
/// into the single entry point the delivery state machine drives. At
/// most one `navigate_to` call is in flight at a time.
pub struct Navigator {
    config: NavigatorConfig,
    raw_map: Arc<OccupancyMap>,
    inflated_map: Arc<OccupancyMap>,
    state: Mutex<SharedState>,
    last_ir_raw: AtomicU16,
    busy: AtomicBool,
}

impl Navigator {
    pub fn new(config: NavigatorConfig, map: OccupancyMap, start_pose: Pose, rng: &mut impl rand::Rng) -> Self {
        let inflated = map.inflate(config.obstacle_clearance_m);
        let odometry = OdometryIntegrator::new(config.odometry, start_pose);
        let localizer = ParticleFilter::new(config.particle_filter, start_pose, rng);
        Self {
            config,
            raw_map: Arc::new(map),
            inflated_map: Arc::new(inflated),
            state: Mutex::new(SharedState { odometry, localizer, last_scan: None }),
            last_ir_raw: AtomicU16::new(u16::MAX),
            busy: AtomicBool::new(false),
        }
    }

    /// Feeds one `ENCODER:<left>,<right>` reading into odometry and the
    /// particle filter's motion update.
    pub fn on_encoder_tick(&self, left_ticks: i32, right_ticks: i32, rng: &mut impl rand::Rng) {
        let mut state = self.state.lock().unwrap();
        let (ds, dtheta) = state.odometry.update_from_ticks(left_ticks, right_ticks);
        if ds != 0.0 || dtheta != 0.0 {
            state.localizer.motion_update(ds, dtheta, rng);
        }
    }

    /// Feeds one laser revolution into the particle filter's measurement
    /// update and stores it for the motion controller's replan checks.
    pub fn on_scan(&self, scan: Scan) {
        let mut state = self.state.lock().unwrap();
        state.localizer.measurement_update(&self.raw_map, &scan);
        state.last_scan = Some(scan);
    }

    pub fn on_ir_reading(&self, raw: u16) {
        self.last_ir_raw.store(raw, Ordering::Relaxed);
    }

    pub fn current_pose(&self) -> Pose {
        self.state.lock().unwrap().localizer.pose_estimate()
    }

    /// `true` once the localizer's positional variance has exceeded its
    /// threshold for the configured window.
    pub fn check_localization_divergence(&self, now: Instant) -> bool {
        self.state.lock().unwrap().localizer.check_divergence(now)
    }

    /// Always safe to call; cancels any in-flight `navigate_to`.
    pub fn stop(&self, cancel: &CancelToken, motor_sink: &dyn MotorSink) {
        cancel.cancel();
        let _ = motor_sink.send(Command::stop_motors());
    }

    /// Plans a path to `(goal_x, goal_y)` and drives it to completion,
    /// blocking the calling thread for the duration of the navigation.
    /// The orchestrator runs this on its own worker task so its tick loop
    /// never blocks.
    pub fn navigate_to(
        &self,
        goal_x: f64,
        goal_y: f64,
        motor_sink: &dyn MotorSink,
        cancel: &CancelToken,
    ) -> Result<(), NavError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(NavError::Busy);
        }
        let _guard = BusyGuard(&self.busy);
        cancel.reset();

        let start = self.current_pose();
        let mut path = planner::plan(&self.inflated_map, (start.x, start.y), (goal_x, goal_y), &self.config.planner)?;
        if path.is_empty() {
            motor_sink.send(Command::stop_motors())?;
            return Ok(());
        }

        let mut controller = MotionController::new(self.config.motion);
        controller.reset();
        let mut ir_emergencies = 0u32;
        let mut waypoint_index = 0usize;

        loop {
            if cancel.is_cancelled() {
                send_stop(motor_sink)?;
                return Err(NavError::Cancelled);
            }

            let pose = self.current_pose();

            if let Some(distance) = self.nearest_upcoming_obstacle_distance(pose, &path[waypoint_index..]) {
                if distance < self.config.obstacle_clearance_m {
                    debug!(distance, "scan shows obstacle near path, replanning");
                    path = planner::plan(&self.inflated_map, (pose.x, pose.y), (goal_x, goal_y), &self.config.planner)?;
                    waypoint_index = 0;
                    controller.reset();
                    continue;
                }
            }

            if self.last_ir_raw.load(Ordering::Relaxed) < self.config.ir_emergency_threshold {
                ir_emergencies += 1;
                warn!(ir_emergencies, "infrared proximity triggered an emergency stop");
                send_stop(motor_sink)?;
                if ir_emergencies > self.config.max_ir_emergencies {
                    return Err(NavError::ObstacleCollision);
                }
                motor_sink.send(Command::Motor {
                    left_speed: 80,
                    right_speed: 80,
                    left_dir: delivery_protocol::Direction::Reverse,
                    right_dir: delivery_protocol::Direction::Reverse,
                })?;
                std::thread::sleep(self.config.tick_interval);
                path = planner::plan(&self.inflated_map, (pose.x, pose.y), (goal_x, goal_y), &self.config.planner)?;
                waypoint_index = 0;
                controller.reset();
                continue;
            }

            match controller.step(pose, &path[waypoint_index], self.config.tick_interval.as_secs_f64(), Instant::now()) {
                MotionOutcome::Drive(command) => {
                    motor_sink.send(command)?;
                }
                MotionOutcome::Reached => {
                    waypoint_index += 1;
                    controller.reset();
                    if waypoint_index >= path.len() {
                        send_stop(motor_sink)?;
                        return Ok(());
                    }
                }
                MotionOutcome::Stalled => {
                    send_stop(motor_sink)?;
                    return Err(NavError::GoalUnreachable);
                }
            }

            if self.check_localization_divergence(Instant::now()) {
                send_stop(motor_sink)?;
                return Err(NavError::LocalizationFailure);
            }

            std::thread::sleep(self.config.tick_interval);
        }
    }

    /// Smallest world-frame distance from any current scan point to any of
    /// `remaining_waypoints`, or `None` if there is no scan yet or no
    /// waypoints left to check.
    fn nearest_upcoming_obstacle_distance(
        &self,
        pose: Pose,
        remaining_waypoints: &[delivery_protocol::Waypoint],
    ) -> Option<f64> {
        let state = self.state.lock().unwrap();
        let scan = state.last_scan.as_ref()?;
        remaining_waypoints
            .iter()
            .flat_map(|wp| {
                scan.points.iter().map(move |p| {
                    let world_angle = pose.theta + p.angle;
                    let px = pose.x + p.distance * world_angle.cos();
                    let py = pose.y + p.distance * world_angle.sin();
                    ((px - wp.x).powi(2) + (py - wp.y).powi(2)).sqrt()
                })
            })
            .min_by(f64::total_cmp)
    }
}

struct BusyGuard<'a>(&'a AtomicBool);
impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn send_stop(motor_sink: &dyn MotorSink) -> Result<(), NavError> {
    motor_sink.send(Command::stop_motors())
}
