//! # Delivery Serial
//!
//! Framed ASCII serial link to the delivery robot's microcontroller:
//! ACK/retry delivery of motor/servo/LED commands, and telemetry decode
//! of encoder/IR readings.
//!
//! ## Architecture
//!
//! A [`link::SplittableLink`] is split into an RX half and a TX half, each
//! driven by its own thread (see [`pipeline::spawn`]): the RX thread owns
//! reading and classifying incoming lines, handing ACKs to the TX thread
//! and telemetry to the caller; the TX thread owns writing commands and
//! the ACK/retry loop: a dual-thread I/O pipeline, one side reading and
//! classifying lines, the other owning writes and retries.
//!
//! ## Reliability contract
//!
//! Motor, servo and stop commands are reliable: the TX thread retries up
//! to [`pipeline::PipelineConfig::max_retries`] times before surfacing a
//! link-lost error. LED commands are droppable: only the most recently
//! queued one is ever sent.

pub mod command_queue;
pub mod error;
pub mod link;
pub mod pipeline;
pub mod port;
pub mod stats;

pub use command_queue::{CommandQueue, CommandSender};
pub use error::SerialError;
pub use link::{RxLink, SerialLink, SplittableLink, TxLink};
pub use pipeline::{spawn, send_with_retry, PipelineConfig, PipelineHandles};
pub use port::SerialPortLink;
pub use stats::LinkStatistics;
