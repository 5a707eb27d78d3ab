use std::sync::Arc;
use std::time::{Duration, Instant};

use delivery_nav::{CancelToken, MotionController, MotionControllerConfig, MotionOutcome, MotorSink, Navigator};
use delivery_protocol::{Command, LedState, Pose, Waypoint};
use delivery_tools::config::{DeliveryConfig, StateTimeouts};
use delivery_tools::log_transition;
use tracing::{info, warn};

use crate::collaborators::{AudioSink, CommandSink, LoadConfirmationSource, OrderDatabase, PersonDetector, QrScanner};
use crate::context::DeliveryContext;
use crate::error::DeliveryError;
use crate::state::DeliveryState;
use crate::worker::Worker;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub home: Pose,
    pub warehouse: Pose,
    pub approach_tolerance_m: f64,
    pub delivery_zone_radius_m: f64,
    pub delivery_hold_s: f64,
    pub timeouts: StateTimeouts,
    pub max_recovery_attempts: u32,
    pub recovery_retry_delay: Duration,
}

impl OrchestratorConfig {
    pub fn from_delivery_config(config: &DeliveryConfig) -> Self {
        Self {
            home: Pose::new(config.home.0, config.home.1, 0.0),
            warehouse: Pose::new(config.warehouse.0, config.warehouse.1, 0.0),
            approach_tolerance_m: config.approach_tolerance_m,
            delivery_zone_radius_m: config.delivery_zone_radius_m,
            delivery_hold_s: config.delivery_hold_s,
            timeouts: config.timeouts,
            max_recovery_attempts: config.max_recovery_attempts,
            recovery_retry_delay: Duration::from_secs(2),
        }
    }
}

/// Outcome of a decoded QR code, validated against the order database.
/// Decode failures are folded into `Rejected`: from the operator's point
/// of view a malformed code and a mismatched one are the same outcome.
enum QrOutcome {
    Accepted(u32),
    Rejected,
}

/// Drives the nine-state delivery cycle from a 10 Hz tick. Long-running
/// operations (navigation, QR capture) run on [`Worker`] threads so a
/// single call to `tick` never blocks.
pub struct Orchestrator {
    state: DeliveryState,
    state_entered_at: Instant,
    context: DeliveryContext,
    config: OrchestratorConfig,

    navigator: Arc<Navigator>,
    motor_sink: Arc<dyn MotorSink>,
    command_sink: Arc<dyn CommandSink>,
    order_db: Arc<dyn OrderDatabase>,
    audio: Arc<dyn AudioSink>,
    person_detector: Arc<dyn PersonDetector>,
    qr_scanner: Arc<dyn QrScanner>,
    load_confirmation: Box<dyn LoadConfirmationSource>,

    approach_controller: MotionController,
    box_actuator: delivery_nav::BoxActuator,

    nav_worker: Option<(Worker<Result<(), delivery_nav::NavError>>, CancelToken)>,
    qr_worker: Option<Worker<QrOutcome>>,

    delivering_since: Option<Instant>,
    recovery_retry_at: Option<Instant>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        navigator: Arc<Navigator>,
        motor_sink: Arc<dyn MotorSink>,
        command_sink: Arc<dyn CommandSink>,
        order_db: Arc<dyn OrderDatabase>,
        audio: Arc<dyn AudioSink>,
        person_detector: Arc<dyn PersonDetector>,
        qr_scanner: Arc<dyn QrScanner>,
        load_confirmation: Box<dyn LoadConfirmationSource>,
    ) -> Self {
        Self {
            state: DeliveryState::Waiting,
            state_entered_at: Instant::now(),
            context: DeliveryContext::default(),
            config,
            navigator,
            motor_sink,
            command_sink,
            order_db,
            audio,
            person_detector,
            qr_scanner,
            load_confirmation,
            approach_controller: MotionController::new(MotionControllerConfig::default()),
            box_actuator: delivery_nav::BoxActuator::new(),
            nav_worker: None,
            qr_worker: None,
            delivering_since: None,
            recovery_retry_at: None,
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    pub fn context(&self) -> &DeliveryContext {
        &self.context
    }

    /// Operator-triggered recovery from `EmergencyStop`; the only way out
    /// of the terminal state.
    /// Sends a final stop command. Intended for a graceful process exit,
    /// not part of the state machine itself.
    pub fn shutdown(&self) {
        let _ = self.command_sink.send(Command::Stop);
    }

    pub fn manual_reset(&mut self) {
        if self.state == DeliveryState::EmergencyStop {
            self.context.recovery_attempts = 0;
            self.transition(DeliveryState::Waiting, "manual reset");
        }
    }

    /// Advances the machine by one tick. Never blocks: navigation and QR
    /// capture are polled, not awaited.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.state != DeliveryState::Verifying {
            if let Some(timeout) = self.state.timeout(&self.config.timeouts) {
                if now.duration_since(self.state_entered_at) > timeout {
                    let error = DeliveryError::StateTimeout { state: self.state.as_str() };
                    self.fail(error);
                    return;
                }
            }
        }

        let result = match self.state {
            DeliveryState::Waiting => self.tick_waiting(),
            DeliveryState::Approaching => self.tick_approaching(now),
            DeliveryState::Verifying => self.tick_verifying(now),
            DeliveryState::NavigatingToWarehouse => self.tick_navigating_to_warehouse(),
            DeliveryState::Loading => self.tick_loading(),
            DeliveryState::ReturningToCustomer => self.tick_returning_to_customer(),
            DeliveryState::Delivering => self.tick_delivering(now),
            DeliveryState::Resetting => self.tick_resetting(),
            DeliveryState::ErrorRecovery => self.tick_error_recovery(now),
            DeliveryState::EmergencyStop => Ok(()),
        };

        if let Err(error) = result {
            self.fail(error);
        }
    }

    fn transition(&mut self, next: DeliveryState, reason: &str) {
        log_transition(self.state.as_str(), next.as_str(), reason);
        self.state = next;
        self.state_entered_at = Instant::now();
        self.enter(next);
    }

    /// Any error surfaced by a state handler always lands in
    /// `ErrorRecovery` first; a zero-speed motor command is always part
    /// of entering it. Whether `ErrorRecovery` then retries or escalates
    /// straight to `EmergencyStop` depends on whether the error is fatal.
    fn fail(&mut self, error: DeliveryError) {
        warn!(error = %error, state = self.state.as_str(), "state handler reported an error");
        self.context.record_error(&error);
        self.transition(DeliveryState::ErrorRecovery, "error");
    }

    fn enter(&mut self, state: DeliveryState) {
        match state {
            DeliveryState::Waiting => {
                self.send_led(LedState::Idle);
                self.context.clear_order();
            }
            DeliveryState::Approaching => {
                self.send_led(LedState::Moving);
                self.approach_controller.reset();
            }
            DeliveryState::Verifying => {
                self.send_led(LedState::Waiting);
                self.audio.play("request_qr");
                let scanner = self.qr_scanner.clone();
                let order_db = self.order_db.clone();
                self.qr_worker = Some(Worker::spawn(move || match scanner.capture() {
                    Ok(payload) => {
                        if order_db.exists(payload.order_id, &payload.secret_key) {
                            QrOutcome::Accepted(payload.order_id)
                        } else {
                            QrOutcome::Rejected
                        }
                    }
                    Err(_) => QrOutcome::Rejected,
                }));
            }
            DeliveryState::NavigatingToWarehouse => {
                self.send_led(LedState::Moving);
                self.spawn_navigation(self.config.warehouse);
            }
            DeliveryState::Loading => {
                self.send_led(LedState::Waiting);
                if let Some(order_id) = self.context.order_id {
                    self.audio.play(&format!("order_number_{order_id}"));
                }
            }
            DeliveryState::ReturningToCustomer => {
                self.send_led(LedState::Moving);
                if let Some(pose) = self.context.customer_pose {
                    self.spawn_navigation(pose);
                }
            }
            DeliveryState::Delivering => {
                self.send_led(LedState::Waiting);
                self.audio.play("delivery_greeting");
                self.delivering_since = Some(Instant::now());
            }
            DeliveryState::Resetting => {
                self.send_led(LedState::Moving);
                self.spawn_navigation(self.config.home);
            }
            DeliveryState::ErrorRecovery => {
                self.navigator.stop(&CancelToken::new(), self.motor_sink.as_ref());
                let _ = self.command_sink.send(self.box_actuator.emergency_close());
                self.audio.play("error");
                self.send_led(LedState::Error);
                info!(error = ?self.context.last_error, "entering error recovery");
                self.recovery_retry_at = None;
                self.nav_worker = None;
            }
            DeliveryState::EmergencyStop => {
                self.send_led(LedState::Error);
                info!("entering emergency stop, manual reset required");
            }
        }
    }

    fn send_led(&self, state: LedState) {
        let _ = self.command_sink.send(Command::Led(state));
    }

    fn spawn_navigation(&mut self, goal: Pose) {
        let navigator = self.navigator.clone();
        let motor_sink = self.motor_sink.clone();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let worker = Worker::spawn(move || navigator.navigate_to(goal.x, goal.y, motor_sink.as_ref(), &worker_cancel));
        self.nav_worker = Some((worker, cancel));
    }

    fn tick_waiting(&mut self) -> Result<(), DeliveryError> {
        if let Some(pose) = self.person_detector.detect_person() {
            let distance = self.config.home.distance_to(&pose);
            if distance <= self.config.delivery_zone_radius_m {
                self.context.customer_pose = Some(pose);
                self.transition(DeliveryState::Approaching, "person entered delivery zone");
            }
        }
        Ok(())
    }

    fn tick_approaching(&mut self, now: Instant) -> Result<(), DeliveryError> {
        let Some(customer_pose) = self.person_detector.detect_person() else {
            self.command_sink.send(Command::stop_motors())?;
            self.transition(DeliveryState::Waiting, "customer lost");
            return Ok(());
        };
        self.context.customer_pose = Some(customer_pose);

        let current_pose = self.navigator.current_pose();
        let target = Waypoint::new(customer_pose.x, customer_pose.y, self.config.approach_tolerance_m);
        self.approach_controller.reset();
        match self.approach_controller.step(current_pose, &target, 0.1, now) {
            MotionOutcome::Drive(command) => {
                self.command_sink.send(command)?;
            }
            MotionOutcome::Reached => {
                self.command_sink.send(Command::stop_motors())?;
                self.transition(DeliveryState::Verifying, "within approach tolerance");
            }
            MotionOutcome::Stalled => {
                self.command_sink.send(Command::stop_motors())?;
            }
        }
        Ok(())
    }

    fn tick_verifying(&mut self, now: Instant) -> Result<(), DeliveryError> {
        if let Some(timeout) = DeliveryState::Verifying.timeout(&self.config.timeouts) {
            if now.duration_since(self.state_entered_at) > timeout {
                self.qr_worker = None;
                self.audio.play("order_rejected");
                self.transition(DeliveryState::Waiting, "QR capture timed out");
                return Ok(());
            }
        }

        let Some(worker) = &self.qr_worker else { return Ok(()) };
        match worker.poll() {
            None => {}
            Some(QrOutcome::Accepted(order_id)) => {
                self.qr_worker = None;
                self.context.order_id = Some(order_id);
                self.audio.play("order_accepted");
                self.transition(DeliveryState::NavigatingToWarehouse, "order accepted");
            }
            Some(QrOutcome::Rejected) => {
                self.qr_worker = None;
                self.audio.play("order_rejected");
                self.transition(DeliveryState::Waiting, "order rejected");
            }
        }
        Ok(())
    }

    fn poll_navigation(&mut self) -> Option<Result<(), DeliveryError>> {
        let (worker, _) = self.nav_worker.as_ref()?;
        let outcome = worker.poll()?;
        self.nav_worker = None;
        Some(outcome.map_err(DeliveryError::from))
    }

    fn tick_navigating_to_warehouse(&mut self) -> Result<(), DeliveryError> {
        match self.poll_navigation() {
            None => Ok(()),
            Some(Ok(())) => {
                self.transition(DeliveryState::Loading, "reached warehouse");
                Ok(())
            }
            Some(Err(error)) => Err(error),
        }
    }

    fn tick_loading(&mut self) -> Result<(), DeliveryError> {
        if !self.box_actuator.is_open() {
            if let Some(command) = self.box_actuator.open_step() {
                self.command_sink.send(command)?;
                if let Command::Servo { angle } = command {
                    self.box_actuator.on_ack(angle);
                }
            }
            return Ok(());
        }

        if self.load_confirmation.poll_confirmed() {
            if let Some(command) = self.box_actuator.close_step() {
                self.command_sink.send(command)?;
                if let Command::Servo { angle } = command {
                    self.box_actuator.on_ack(angle);
                }
            }
            if !self.box_actuator.is_open() {
                self.transition(DeliveryState::ReturningToCustomer, "loading confirmed");
            }
        }
        Ok(())
    }

    fn tick_returning_to_customer(&mut self) -> Result<(), DeliveryError> {
        match self.poll_navigation() {
            None => Ok(()),
            Some(Ok(())) => {
                self.transition(DeliveryState::Delivering, "returned to customer");
                Ok(())
            }
            Some(Err(error)) => Err(error),
        }
    }

    fn tick_delivering(&mut self, now: Instant) -> Result<(), DeliveryError> {
        if !self.box_actuator.is_open() {
            if let Some(command) = self.box_actuator.open_step() {
                self.command_sink.send(command)?;
                if let Command::Servo { angle } = command {
                    self.box_actuator.on_ack(angle);
                }
            }
            return Ok(());
        }

        let elapsed = self.delivering_since.map(|since| now.duration_since(since)).unwrap_or_default();
        if elapsed < Duration::from_secs_f64(self.config.delivery_hold_s) {
            return Ok(());
        }

        if let Some(command) = self.box_actuator.close_step() {
            self.command_sink.send(command)?;
            if let Command::Servo { angle } = command {
                self.box_actuator.on_ack(angle);
            }
        }
        if !self.box_actuator.is_open() {
            self.delivering_since = None;
            self.transition(DeliveryState::Resetting, "delivery hold elapsed");
        }
        Ok(())
    }

    fn tick_resetting(&mut self) -> Result<(), DeliveryError> {
        match self.poll_navigation() {
            None => Ok(()),
            Some(Ok(())) => {
                self.context.recovery_attempts = 0;
                self.transition(DeliveryState::Waiting, "returned home");
                Ok(())
            }
            Some(Err(error)) => Err(error),
        }
    }

    fn tick_error_recovery(&mut self, now: Instant) -> Result<(), DeliveryError> {
        if self.nav_worker.is_none() {
            if let Some(retry_at) = self.recovery_retry_at {
                if now < retry_at {
                    return Ok(());
                }
            }
            self.context.recovery_attempts += 1;
            info!(
                attempt = self.context.recovery_attempts,
                error = ?self.context.last_error,
                "attempting recovery navigation home"
            );
            self.spawn_navigation(self.config.home);
            self.recovery_retry_at = None;
            return Ok(());
        }

        match self.poll_navigation() {
            None => Ok(()),
            Some(Ok(())) => {
                self.context.recovery_attempts = 0;
                self.transition(DeliveryState::Waiting, "recovered");
                Ok(())
            }
            Some(Err(_)) => {
                if self.context.last_error_fatal || self.context.recovery_attempts >= self.config.max_recovery_attempts {
                    self.transition(DeliveryState::EmergencyStop, "recovery exhausted");
                } else {
                    self.recovery_retry_at = Some(now + self.config.recovery_retry_delay);
                }
                Ok(())
            }
        }
    }
}
