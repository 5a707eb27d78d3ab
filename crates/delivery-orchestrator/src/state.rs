use std::time::Duration;

use delivery_tools::config::StateTimeouts;

/// The delivery state machine: nine operating states plus the terminal
/// `EmergencyStop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Waiting,
    Approaching,
    Verifying,
    NavigatingToWarehouse,
    Loading,
    ReturningToCustomer,
    Delivering,
    Resetting,
    ErrorRecovery,
    /// Terminal: reachable only through repeated recovery failure or a
    /// fatal error. Requires a manual reset to leave.
    EmergencyStop,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Waiting => "Waiting",
            DeliveryState::Approaching => "Approaching",
            DeliveryState::Verifying => "Verifying",
            DeliveryState::NavigatingToWarehouse => "NavigatingToWarehouse",
            DeliveryState::Loading => "Loading",
            DeliveryState::ReturningToCustomer => "ReturningToCustomer",
            DeliveryState::Delivering => "Delivering",
            DeliveryState::Resetting => "Resetting",
            DeliveryState::ErrorRecovery => "ErrorRecovery",
            DeliveryState::EmergencyStop => "EmergencyStop",
        }
    }

    /// `None` means no deadline (only `Waiting` and the terminal state).
    pub fn timeout(&self, timeouts: &StateTimeouts) -> Option<Duration> {
        let seconds = match self {
            DeliveryState::Waiting | DeliveryState::EmergencyStop => return None,
            DeliveryState::Approaching => timeouts.approaching_s,
            DeliveryState::Verifying => timeouts.verifying_s,
            DeliveryState::NavigatingToWarehouse => timeouts.navigating_to_warehouse_s,
            DeliveryState::Loading => timeouts.loading_s,
            DeliveryState::ReturningToCustomer => timeouts.returning_to_customer_s,
            DeliveryState::Delivering => timeouts.delivering_s,
            DeliveryState::Resetting => timeouts.resetting_s,
            DeliveryState::ErrorRecovery => timeouts.error_recovery_s,
        };
        Some(Duration::from_secs_f64(seconds))
    }
}
