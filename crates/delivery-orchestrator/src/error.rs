use delivery_nav::NavError;
use delivery_serial::SerialError;
use thiserror::Error;

/// The only error type the state machine matches on. Every lower-layer
/// error is classified into one of these on the way up; nothing below
/// this layer decides whether a failure is fatal.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("serial link lost after exhausting retries")]
    LinkLost,

    #[error("localizer pose estimate has diverged")]
    LocalizationFailure,

    #[error("planner found no path to the requested goal")]
    PathNotFound,

    #[error("motion controller made no progress toward the goal")]
    GoalUnreachable,

    #[error("infrared proximity triggered too many emergency stops")]
    ObstacleCollision,

    #[error("state {state} exceeded its allotted timeout")]
    StateTimeout { state: &'static str },

    #[error("QR payload validated to a non-existent or mismatched order")]
    OrderInvalid,

    #[error("servo failed to acknowledge a commanded angle")]
    ServoFault,

    #[error("failed to deliver a command to the microcontroller: {0}")]
    CommandSink(String),

    #[error("a navigation request was already in progress")]
    NavigationBusy,

    #[error("navigation was cancelled")]
    NavigationCancelled,
}

impl From<NavError> for DeliveryError {
    fn from(err: NavError) -> Self {
        match err {
            NavError::PathNotFound => DeliveryError::PathNotFound,
            NavError::GoalUnreachable => DeliveryError::GoalUnreachable,
            NavError::ObstacleCollision => DeliveryError::ObstacleCollision,
            NavError::LocalizationFailure => DeliveryError::LocalizationFailure,
            NavError::Busy => DeliveryError::NavigationBusy,
            NavError::Cancelled => DeliveryError::NavigationCancelled,
            NavError::MotorSink(message) => DeliveryError::CommandSink(message),
        }
    }
}

impl From<SerialError> for DeliveryError {
    fn from(err: SerialError) -> Self {
        match err {
            SerialError::LinkLost { .. } => DeliveryError::LinkLost,
            other => DeliveryError::CommandSink(other.to_string()),
        }
    }
}

impl DeliveryError {
    /// Whether this error is unrecoverable and should drive the machine
    /// straight to `EmergencyStop` rather than `ErrorRecovery`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeliveryError::LinkLost | DeliveryError::LocalizationFailure)
    }
}
