use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self { kp: 1.0, ki: 0.0, kd: 0.05 }
    }
}

/// Per-state timeouts, seconds. Every state but `Waiting` has a deadline
/// after which the orchestrator falls back to `ErrorRecovery`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateTimeouts {
    pub approaching_s: f64,
    pub verifying_s: f64,
    pub navigating_to_warehouse_s: f64,
    pub loading_s: f64,
    pub returning_to_customer_s: f64,
    pub delivering_s: f64,
    pub resetting_s: f64,
    pub error_recovery_s: f64,
}

impl Default for StateTimeouts {
    fn default() -> Self {
        Self {
            approaching_s: 60.0,
            verifying_s: 30.0,
            navigating_to_warehouse_s: 120.0,
            loading_s: 60.0,
            returning_to_customer_s: 120.0,
            delivering_s: 15.0,
            resetting_s: 120.0,
            error_recovery_s: 180.0,
        }
    }
}

/// The flat configuration surface loaded once at daemon startup: `Default`
/// gives sane values for local testing, and `load_from_file` parses a
/// real TOML file for a deployed robot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub home: (f64, f64),
    pub warehouse: (f64, f64),

    pub position_tolerance_m: f64,
    pub approach_tolerance_m: f64,
    pub obstacle_clearance_m: f64,

    pub linear_pid: PidGains,
    pub angular_pid: PidGains,

    pub particle_count: usize,
    pub localizer_update_hz: f64,
    pub tick_hz: f64,

    pub serial_port: String,
    pub serial_baud: u32,
    pub lidar_device: String,
    pub lidar_baud: u32,
    pub camera_device: String,

    pub map_path: String,

    /// File of known `(order_id, secret_key)` pairs backing the order
    /// database collaborator. The real order database is an external
    /// system; this is the daemon's default local stand-in for it.
    pub order_db_path: String,
    /// Directory of named audio clips (`<clip>.wav`) the audio sink plays.
    pub audio_clip_dir: String,
    /// Path the QR scanner collaborator reads one decoded payload line
    /// from per capture; the actual decoding happens upstream of this core.
    pub qr_source_path: String,
    /// Address the load-confirmation collaborator listens on for an
    /// operator/network "loading confirmed" signal.
    pub load_confirmation_addr: String,

    pub timeouts: StateTimeouts,
    pub max_recovery_attempts: u32,

    pub delivery_zone_radius_m: f64,
    pub delivery_hold_s: f64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            home: (0.0, 0.0),
            warehouse: (5.0, 3.0),
            position_tolerance_m: 0.10,
            approach_tolerance_m: 0.50,
            obstacle_clearance_m: 0.30,
            linear_pid: PidGains::default(),
            angular_pid: PidGains::default(),
            particle_count: 100,
            localizer_update_hz: 5.0,
            tick_hz: 10.0,
            serial_port: "/dev/ttyUSB0".to_string(),
            serial_baud: 9600,
            lidar_device: "/dev/ttyACM0".to_string(),
            lidar_baud: 115_200,
            camera_device: "/dev/video0".to_string(),
            map_path: "map.toml".to_string(),
            order_db_path: "orders.toml".to_string(),
            audio_clip_dir: "clips".to_string(),
            qr_source_path: "/tmp/delivery-qr-payload".to_string(),
            load_confirmation_addr: "127.0.0.1:9091".to_string(),
            timeouts: StateTimeouts::default(),
            max_recovery_attempts: 3,
            delivery_zone_radius_m: 3.0,
            delivery_hold_s: 10.0,
        }
    }
}

impl DeliveryConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        std::fs::write(path, text)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = DeliveryConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = DeliveryConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.home, config.home);
        assert_eq!(parsed.particle_count, config.particle_count);
        assert_eq!(parsed.max_recovery_attempts, config.max_recovery_attempts);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields_fails_without_all_fields() {
        // DeliveryConfig has no #[serde(default)] fields by design: a
        // config file is expected to be complete, so a missing field is a
        // startup error rather than a silently-applied default.
        let result = DeliveryConfig::from_toml_str("home = [0.0, 0.0]");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file_reports_missing_file() {
        let result = DeliveryConfig::load_from_file("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
