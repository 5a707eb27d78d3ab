use delivery_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the serial link layer.
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("read/ACK timeout")]
    Timeout,

    #[error("command channel closed")]
    ChannelClosed,

    #[error("telemetry channel closed")]
    TelemetryChannelClosed,

    #[error("link lost after {attempts} unacknowledged attempts")]
    LinkLost { attempts: u32 },
}
