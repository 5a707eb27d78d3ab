//! Adapts `delivery-serial`'s command queue to the two narrower sink
//! traits the navigation and orchestration crates depend on, so neither of
//! those crates needs to know the commands ultimately cross a serial link.

use delivery_nav::{MotorSink, NavError};
use delivery_orchestrator::{CommandSink, DeliveryError};
use delivery_protocol::Command;
use delivery_serial::CommandSender;

pub struct SerialSink(CommandSender);

impl SerialSink {
    pub fn new(sender: CommandSender) -> Self {
        Self(sender)
    }
}

impl CommandSink for SerialSink {
    fn send(&self, command: Command) -> Result<(), DeliveryError> {
        self.0
            .send(command)
            .map_err(|e| DeliveryError::CommandSink(e.to_string()))
    }
}

impl MotorSink for SerialSink {
    fn send(&self, command: Command) -> Result<(), NavError> {
        self.0
            .send(command)
            .map_err(|e| NavError::MotorSink(e.to_string()))
    }
}
