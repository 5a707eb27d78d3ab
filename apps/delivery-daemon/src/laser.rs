//! Laser scan source: a background thread that owns the LiDAR's serial
//! connection, decodes one `SCAN:` line per revolution, and publishes the
//! latest scan both to the navigator's measurement update and to the
//! shared slot the person detector reads from.
//!
//! Reuses `delivery-serial`'s line-oriented [`delivery_serial::SerialLink`]
//! machinery rather than inventing a second I/O stack: a LiDAR device and
//! the drive microcontroller are both, at this layer, "a UART that speaks
//! ASCII lines."

use std::sync::{Arc, Mutex};
use std::time::Duration;

use delivery_nav::Navigator;
use delivery_protocol::{parse_scan_line, Scan};
use delivery_serial::{SerialLink, SerialPortLink};
use tracing::warn;

/// Spawns the laser-read loop. Never returns; intended to run for the
/// lifetime of the process on its own thread.
pub fn spawn(
    device: String,
    baud_rate: u32,
    navigator: Arc<Navigator>,
    last_scan: Arc<Mutex<Option<Scan>>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        match SerialPortLink::open(&device, baud_rate) {
            Ok(mut link) => run_read_loop(&mut link, &navigator, &last_scan),
            Err(e) => {
                warn!(error = %e, device, "failed to open laser scanner device, retrying in 1s");
                std::thread::sleep(Duration::from_secs(1));
            }
        }
    })
}

fn run_read_loop(link: &mut impl SerialLink, navigator: &Arc<Navigator>, last_scan: &Arc<Mutex<Option<Scan>>>) {
    loop {
        match link.read_line(Duration::from_millis(500)) {
            Ok(line) => match parse_scan_line(&line) {
                Ok(scan) => {
                    *last_scan.lock().unwrap() = Some(scan.clone());
                    navigator.on_scan(scan);
                }
                Err(e) => warn!(error = %e, %line, "discarding unrecognised laser scan line"),
            },
            Err(delivery_serial::SerialError::Timeout) => continue,
            Err(e) => {
                warn!(error = %e, "laser scanner link error, reopening device");
                return;
            }
        }
    }
}
