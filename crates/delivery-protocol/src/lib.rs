//! # Delivery Protocol
//!
//! Wire-level types shared by the control core and the microcontroller
//! link, with no hardware dependency of its own.
//!
//! ## Modules
//!
//! - `pose`: global-frame robot pose
//! - `scan`: laser scan points
//! - `waypoint`: planned-path points
//! - `command`: outgoing ASCII command grammar
//! - `telemetry`: incoming ASCII telemetry/ACK grammar
//! - `qr`: QR payload encoding/parsing
//! - `error`: shared parse/encode error type
//!
//! ## Framing
//!
//! The wire format is ASCII, one command or telemetry record per line,
//! terminated by `\n`. There is no checksum; malformed lines are rejected
//! by the parser and logged by the link layer rather than panicking.

pub mod command;
pub mod error;
pub mod pose;
pub mod qr;
pub mod scan;
pub mod telemetry;
pub mod waypoint;

pub use command::{Command, CommandPriority, Direction, LedState};
pub use error::ProtocolError;
pub use pose::Pose;
pub use qr::QrPayload;
pub use scan::{encode_scan_line, parse_scan_line, Scan, ScanPoint};
pub use telemetry::{parse_line, tick_delta, TelemetryLine};
pub use waypoint::{Waypoint, DEFAULT_TOLERANCE_M};
