use delivery_protocol::{Command, Pose, QrPayload};

use crate::error::DeliveryError;

/// Sink the orchestrator sends LED and stop commands to directly (as
/// opposed to the motor commands `delivery_nav::Navigator` emits while
/// driving a path). The daemon binary wires one shared command queue into
/// both this trait and `delivery_nav::MotorSink`.
pub trait CommandSink: Send + Sync {
    fn send(&self, command: Command) -> Result<(), DeliveryError>;
}

/// Looks up whether an `(order_id, secret_key)` pair is a real, matching
/// order. Assumed side-effect free and fast; the core applies no timeout
/// of its own beyond running the check on a worker thread.
pub trait OrderDatabase: Send + Sync {
    fn exists(&self, order_id: u32, secret_key: &str) -> bool;
}

/// A named-clip audio player. Fire-and-forget: the core never waits on
/// this call, and a missing clip is the sink's problem to log, not the
/// core's to detect.
pub trait AudioSink: Send + Sync {
    fn play(&self, clip: &str);
}

/// Polled once per tick while `Waiting`/`Approaching` are active. Returns
/// the best current estimate of a customer's position in the global
/// frame, or `None` if nobody is in view.
pub trait PersonDetector: Send + Sync {
    fn detect_person(&self) -> Option<Pose>;
}

/// Captures and decodes a QR code. Blocking; the orchestrator always
/// calls this from a worker thread (see [`crate::worker`]), never from
/// the tick loop itself.
pub trait QrScanner: Send + Sync {
    fn capture(&self) -> Result<QrPayload, DeliveryError>;
}

/// A single-shot "loading confirmed" signal, polled once per tick while
/// `Loading` is active. What sets it (a physical button, a network call
/// from an operator console) is outside this core's scope; see
/// `LoadConfirmation`'s documentation for the chosen binding.
pub trait LoadConfirmationSource: Send + Sync {
    /// Returns `true` at most once per physical confirmation event.
    fn poll_confirmed(&mut self) -> bool;
}

/// Declared, unimplemented hook for a future speech-driven order-number
/// entry path. No state handler calls this; it exists only so a future
/// speech-input collaborator has a documented seam to implement against.
pub trait VerbalOrderInput: Send + Sync {
    fn listen_for_order_number(&self) -> Option<u32>;
}
