//! # Delivery Tools
//!
//! Small, shared, dependency-light helpers used by every other crate in
//! the workspace: numeric/statistics primitives, configuration loading,
//! and structured transition logging. The bottom-most, broadly-depended-on
//! utility layer.

pub mod config;
pub mod divergence;
pub mod statistics;
pub mod transition_log;

pub use config::{ConfigError, DeliveryConfig, PidGains, StateTimeouts};
pub use divergence::DivergenceMonitor;
pub use transition_log::{log_transition, now_millis};
