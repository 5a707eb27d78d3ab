//! # Delivery Nav
//!
//! Everything between "here's a goal" and "the robot is there": dead-reckoning
//! odometry, a particle-filter localizer, an A* grid planner, a PID motion
//! controller, and the delivery-box servo ramp, composed behind a single
//! [`navigator::Navigator`] facade that the orchestrator drives.
//!
//! This crate has no hardware I/O of its own; it emits [`delivery_protocol::Command`]s
//! through the caller-supplied [`navigator::MotorSink`] trait, and the daemon
//! binary wires that to a real serial link.

pub mod box_actuator;
pub mod error;
pub mod motion_controller;
pub mod navigator;
pub mod odometry;
pub mod particle_filter;
pub mod person_detector;
pub mod pid;
pub mod planner;

pub use box_actuator::BoxActuator;
pub use error::NavError;
pub use motion_controller::{MotionController, MotionControllerConfig, MotionOutcome};
pub use navigator::{CancelToken, MotorSink, Navigator, NavigatorConfig};
pub use odometry::{OdometryConfig, OdometryIntegrator};
pub use particle_filter::{Particle, ParticleFilter, ParticleFilterConfig};
pub use person_detector::{detect_person, PersonDetectorConfig};
pub use pid::{PidController, PidGains};
pub use planner::PlannerConfig;
