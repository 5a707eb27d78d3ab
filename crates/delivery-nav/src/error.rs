use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavError {
    #[error("no path exists to the requested goal")]
    PathNotFound,

    #[error("distance to goal failed to decrease for too long")]
    GoalUnreachable,

    #[error("infrared proximity triggered an emergency stop too many times")]
    ObstacleCollision,

    #[error("localizer pose estimate has diverged")]
    LocalizationFailure,

    #[error("a navigation goal is already in progress")]
    Busy,

    #[error("navigation was cancelled")]
    Cancelled,

    #[error("failed to deliver a motor/servo/LED command: {0}")]
    MotorSink(String),
}
