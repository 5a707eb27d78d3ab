//! # Delivery Orchestrator
//!
//! The nine-state (plus terminal `EmergencyStop`) state machine that turns
//! "a person is standing in the delivery zone" into a completed delivery
//! and back to `Waiting` again. Ticked at a fixed rate from the daemon
//! binary; every call to [`Orchestrator::tick`] is non-blocking, with
//! navigation and QR capture running on [`worker::Worker`] threads that the
//! tick polls rather than waits on.
//!
//! This crate has no hardware I/O or navigation algorithms of its own; it
//! drives a [`delivery_nav::Navigator`] and a caller-supplied
//! [`collaborators::CommandSink`], and depends on a handful of small traits
//! in [`collaborators`] for everything else external (the order database,
//! audio playback, person detection, QR capture, load confirmation).

pub mod collaborators;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod state;
pub mod worker;

pub use collaborators::{AudioSink, CommandSink, LoadConfirmationSource, OrderDatabase, PersonDetector, QrScanner, VerbalOrderInput};
pub use context::DeliveryContext;
pub use error::DeliveryError;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use state::DeliveryState;
pub use worker::Worker;
