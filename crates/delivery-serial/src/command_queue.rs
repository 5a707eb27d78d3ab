use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use delivery_protocol::{Command, CommandPriority};

use crate::error::SerialError;

/// Producer-side handle for queuing outgoing commands.
///
/// Reliable commands (`MOTOR`/`SERVO`/`STOP`) are FIFO-queued and never
/// dropped. Droppable commands (`LED`) overwrite any previously queued,
/// not-yet-sent droppable command instead of accumulating: only the most
/// recent LED state matters.
#[derive(Clone)]
pub struct CommandSender {
    reliable_tx: Sender<Command>,
    latest_droppable: Arc<Mutex<Option<Command>>>,
}

impl CommandSender {
    pub fn send(&self, command: Command) -> Result<(), SerialError> {
        match command.priority() {
            CommandPriority::Reliable => self
                .reliable_tx
                .send(command)
                .map_err(|_| SerialError::ChannelClosed),
            CommandPriority::Droppable => {
                *self.latest_droppable.lock().unwrap() = Some(command);
                Ok(())
            }
        }
    }
}

/// Consumer-side handle polled by the TX I/O thread.
pub struct CommandQueue {
    reliable_rx: Receiver<Command>,
    latest_droppable: Arc<Mutex<Option<Command>>>,
}

impl CommandQueue {
    pub fn new() -> (CommandSender, CommandQueue) {
        let (reliable_tx, reliable_rx) = unbounded();
        let latest_droppable = Arc::new(Mutex::new(None));
        (
            CommandSender { reliable_tx, latest_droppable: latest_droppable.clone() },
            CommandQueue { reliable_rx, latest_droppable },
        )
    }

    /// Returns the next command to send, preferring any already-queued
    /// reliable command over a pending droppable one, and blocking up to
    /// `timeout` if neither is immediately available.
    pub fn recv_next(&self, timeout: Duration) -> Option<Command> {
        if let Ok(command) = self.reliable_rx.try_recv() {
            return Some(command);
        }
        if let Some(command) = self.latest_droppable.lock().unwrap().take() {
            return Some(command);
        }
        self.reliable_rx.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delivery_protocol::LedState;

    #[test]
    fn reliable_commands_are_fifo() {
        let (tx, rx) = CommandQueue::new();
        tx.send(Command::Servo { angle: 10 }).unwrap();
        tx.send(Command::Servo { angle: 20 }).unwrap();
        assert_eq!(rx.recv_next(Duration::from_millis(10)), Some(Command::Servo { angle: 10 }));
        assert_eq!(rx.recv_next(Duration::from_millis(10)), Some(Command::Servo { angle: 20 }));
    }

    #[test]
    fn droppable_commands_collapse_to_latest() {
        let (tx, rx) = CommandQueue::new();
        tx.send(Command::Led(LedState::Idle)).unwrap();
        tx.send(Command::Led(LedState::Moving)).unwrap();
        assert_eq!(rx.recv_next(Duration::from_millis(10)), Some(Command::Led(LedState::Moving)));
        assert_eq!(rx.recv_next(Duration::from_millis(10)), None);
    }

    #[test]
    fn reliable_commands_take_priority_over_droppable() {
        let (tx, rx) = CommandQueue::new();
        tx.send(Command::Led(LedState::Idle)).unwrap();
        tx.send(Command::stop_motors()).unwrap();
        assert_eq!(rx.recv_next(Duration::from_millis(10)), Some(Command::stop_motors()));
        assert_eq!(rx.recv_next(Duration::from_millis(10)), Some(Command::Led(LedState::Idle)));
    }
}
