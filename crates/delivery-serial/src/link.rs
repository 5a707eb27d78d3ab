use std::time::Duration;

use crate::error::SerialError;

/// A line-oriented, bidirectional channel to the microcontroller.
///
/// This is the hardware-abstraction seam: the retry/ACK logic in
/// [`crate::pipeline`] is generic over any `SerialLink`, so tests exercise
/// it against an in-memory mock instead of a real UART.
pub trait SerialLink {
    /// Writes one line (without a trailing `\n`; the implementation adds it).
    fn write_line(&mut self, line: &str) -> Result<(), SerialError>;

    /// Blocks for up to `timeout` for one complete line (without the
    /// trailing `\n`/`\r`). Returns `Err(SerialError::Timeout)` if nothing
    /// arrives in time.
    fn read_line(&mut self, timeout: Duration) -> Result<String, SerialError>;
}

/// The receive half of a link split for the dual-thread I/O pattern.
pub trait RxLink: Send {
    fn read_line(&mut self, timeout: Duration) -> Result<String, SerialError>;
}

/// The transmit half of a link split for the dual-thread I/O pattern.
pub trait TxLink: Send {
    fn write_line(&mut self, line: &str) -> Result<(), SerialError>;
}

/// A link that can be split into independently owned RX/TX halves so the
/// reader and writer can each run on their own thread without contending
/// for a lock on every call.
pub trait SplittableLink: SerialLink {
    type Rx: RxLink;
    type Tx: TxLink;

    fn split(self) -> Result<(Self::Rx, Self::Tx), SerialError>;
}
