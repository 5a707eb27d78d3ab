use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use delivery_protocol::{parse_line, Command, TelemetryLine};
use tracing::{trace, warn};

use crate::command_queue::{CommandQueue, CommandSender};
use crate::error::SerialError;
use crate::link::{RxLink, SplittableLink, TxLink};
use crate::stats::LinkStatistics;

/// Timing and retry policy for the command/ACK pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub ack_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// How long the RX/TX threads block on their channels between polls;
    /// bounds shutdown latency, not protocol behaviour.
    pub idle_poll: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_millis(500),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            idle_poll: Duration::from_millis(50),
        }
    }
}

/// Writes `command`, waiting for an ACK signalled on `ack_rx`, retrying on
/// timeout per `config`. Pure over the `TxLink`/ack-channel seam so it is
/// testable without real threads or a real port.
pub fn send_with_retry<T: TxLink>(
    tx: &mut T,
    command: &Command,
    ack_rx: &Receiver<()>,
    config: &PipelineConfig,
    stats: &mut LinkStatistics,
) -> Result<(), SerialError> {
    let line = command.encode();
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            stats.record_retry();
            std::thread::sleep(config.retry_backoff);
        }
        let started = Instant::now();
        tx.write_line(&line)?;
        stats.record_send();
        match ack_rx.recv_timeout(config.ack_timeout) {
            Ok(()) => {
                stats.record_ack(started.elapsed());
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => {
                stats.record_timeout();
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => return Err(SerialError::ChannelClosed),
        }
    }
    Err(SerialError::LinkLost { attempts: config.max_retries + 1 })
}

/// Handles to a running dual-thread link pipeline: a command producer, a
/// telemetry consumer, and a shared statistics snapshot.
pub struct PipelineHandles {
    pub commands: CommandSender,
    pub telemetry: Receiver<TelemetryLine>,
    pub stats: Arc<Mutex<LinkStatistics>>,
    rx_handle: Option<JoinHandle<()>>,
    tx_handle: Option<JoinHandle<()>>,
}

impl PipelineHandles {
    /// Blocks until both I/O threads have exited (they exit once their
    /// link half returns a fatal, non-timeout error).
    pub fn join(mut self) {
        if let Some(h) = self.rx_handle.take() {
            let _ = h.join();
        }
        if let Some(h) = self.tx_handle.take() {
            let _ = h.join();
        }
    }
}

/// Spawns the RX and TX threads over a split link: RX owns reading lines
/// and classifying them (ACKs are handed to the TX thread, telemetry is
/// forwarded to the caller); TX owns writing commands and the ACK/retry
/// loop.
pub fn spawn<L>(link: L, config: PipelineConfig) -> Result<PipelineHandles, SerialError>
where
    L: SplittableLink,
    L::Rx: 'static,
    L::Tx: 'static,
{
    let (mut rx, mut tx) = link.split()?;
    let (command_tx, command_queue) = CommandQueue::new();
    let (telemetry_tx, telemetry_rx) = crossbeam_channel::unbounded();
    let (ack_tx, ack_rx): (Sender<()>, Receiver<()>) = bounded(1);
    let stats = Arc::new(Mutex::new(LinkStatistics::default()));

    let rx_stats = stats.clone();
    let idle_poll = config.idle_poll;
    let rx_handle = std::thread::spawn(move || {
        run_rx_loop(&mut rx, idle_poll, &telemetry_tx, &ack_tx, &rx_stats);
    });

    let tx_stats = stats.clone();
    let tx_handle = std::thread::spawn(move || {
        run_tx_loop(&mut tx, &command_queue, &ack_rx, config, &tx_stats);
    });

    Ok(PipelineHandles {
        commands: command_tx,
        telemetry: telemetry_rx,
        stats,
        rx_handle: Some(rx_handle),
        tx_handle: Some(tx_handle),
    })
}

fn run_rx_loop<R: RxLink>(
    rx: &mut R,
    idle_poll: Duration,
    telemetry_tx: &Sender<TelemetryLine>,
    ack_tx: &Sender<()>,
    stats: &Mutex<LinkStatistics>,
) {
    loop {
        match rx.read_line(idle_poll) {
            Ok(line) => {
                stats.lock().unwrap().record_receive();
                match parse_line(&line) {
                    Ok(TelemetryLine::Ack) => {
                        let _ = ack_tx.try_send(());
                    }
                    Ok(other) => {
                        if telemetry_tx.send(other).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!(error = %e, %line, "discarding unrecognised telemetry line"),
                }
            }
            Err(SerialError::Timeout) => continue,
            Err(e) => {
                warn!(error = %e, "serial RX thread exiting");
                return;
            }
        }
    }
}

fn run_tx_loop<T: TxLink>(
    tx: &mut T,
    queue: &CommandQueue,
    ack_rx: &Receiver<()>,
    config: PipelineConfig,
    stats: &Mutex<LinkStatistics>,
) {
    loop {
        let Some(command) = queue.recv_next(config.idle_poll) else {
            continue;
        };
        // Drain any stale ACK left over from a previous, already-completed
        // exchange before sending a new command.
        while ack_rx.try_recv().is_ok() {}
        let result = {
            let mut guard = stats.lock().unwrap();
            send_with_retry(tx, &command, ack_rx, &config, &mut guard)
        };
        if let Err(e) = result {
            warn!(error = %e, ?command, "command delivery failed");
            if matches!(e, SerialError::ChannelClosed) {
                return;
            }
        } else {
            trace!(?command, "command acknowledged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delivery_protocol::LedState;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    struct MockTx {
        written: Arc<StdMutex<VecDeque<String>>>,
    }

    impl TxLink for MockTx {
        fn write_line(&mut self, line: &str) -> Result<(), SerialError> {
            self.written.lock().unwrap().push_back(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn send_with_retry_succeeds_on_first_ack() {
        let written = Arc::new(StdMutex::new(VecDeque::new()));
        let mut tx = MockTx { written: written.clone() };
        let (ack_tx, ack_rx) = bounded(1);
        ack_tx.send(()).unwrap();
        let config = PipelineConfig { ack_timeout: Duration::from_millis(50), ..Default::default() };
        let mut stats = LinkStatistics::default();
        let result = send_with_retry(&mut tx, &Command::Led(LedState::Idle), &ack_rx, &config, &mut stats);
        assert!(result.is_ok());
        assert_eq!(written.lock().unwrap().len(), 1);
        assert_eq!(stats.retries, 0);
    }

    #[test]
    fn send_with_retry_retries_then_succeeds() {
        let written = Arc::new(StdMutex::new(VecDeque::new()));
        let mut tx = MockTx { written: written.clone() };
        let (ack_tx, ack_rx) = bounded(1);
        let config = PipelineConfig {
            ack_timeout: Duration::from_millis(20),
            retry_backoff: Duration::from_millis(1),
            max_retries: 3,
            idle_poll: Duration::from_millis(10),
        };
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            ack_tx.send(()).unwrap();
        });
        let mut stats = LinkStatistics::default();
        let result = send_with_retry(&mut tx, &Command::stop_motors(), &ack_rx, &config, &mut stats);
        assert!(result.is_ok());
        assert!(written.lock().unwrap().len() >= 2);
    }

    #[test]
    fn send_with_retry_exhausts_and_reports_link_lost() {
        let written = Arc::new(StdMutex::new(VecDeque::new()));
        let mut tx = MockTx { written };
        let (_ack_tx, ack_rx) = bounded(1);
        let config = PipelineConfig {
            ack_timeout: Duration::from_millis(5),
            retry_backoff: Duration::from_millis(1),
            max_retries: 2,
            idle_poll: Duration::from_millis(5),
        };
        let mut stats = LinkStatistics::default();
        let result = send_with_retry(&mut tx, &Command::Servo { angle: 5 }, &ack_rx, &config, &mut stats);
        assert!(matches!(result, Err(SerialError::LinkLost { attempts: 3 })));
        assert_eq!(stats.timeouts, 3);
    }
}
