use thiserror::Error;

/// Parse/encode error type shared by the command, telemetry and QR grammars.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed line: {0}")]
    MalformedLine(String),

    #[error("unknown command keyword: {0}")]
    UnknownCommand(String),

    #[error("unknown telemetry keyword: {0}")]
    UnknownTelemetry(String),

    #[error("field {field} out of range: {value}")]
    OutOfRange { field: String, value: String },

    #[error("invalid QR payload: {0}")]
    InvalidQrPayload(String),
}
