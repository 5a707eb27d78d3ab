//! Concrete adapters binding `delivery-orchestrator`'s collaborator traits
//! to the external systems the core assumes but doesn't own: the order
//! database, audio playback, QR capture, and the `Loading` confirmation
//! signal. Each of these is explicitly out of scope for the core per the
//! system design; these are this daemon's own default backends for them,
//! not a reimplementation of the external systems themselves.

use std::collections::HashMap;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use delivery_nav::{detect_person, Navigator, PersonDetectorConfig};
use delivery_orchestrator::{DeliveryError, LoadConfirmationSource, OrderDatabase, PersonDetector, QrScanner};
use delivery_protocol::{Pose, QrPayload, Scan};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct OrderRecord {
    order_id: u32,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct OrdersFile {
    #[serde(default)]
    orders: Vec<OrderRecord>,
}

/// A local TOML file of known `(order_id, secret_key)` pairs, standing in
/// for the real order database this core only ever reads from.
pub struct FileOrderDatabase {
    orders: HashMap<u32, String>,
}

impl FileOrderDatabase {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let orders = match std::fs::read_to_string(path) {
            Ok(text) => {
                let parsed: OrdersFile = toml::from_str(&text)?;
                parsed.orders.into_iter().map(|o| (o.order_id, o.secret_key)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "order database file not found, starting with no known orders");
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { orders })
    }
}

impl OrderDatabase for FileOrderDatabase {
    fn exists(&self, order_id: u32, secret_key: &str) -> bool {
        self.orders.get(&order_id).is_some_and(|known| known == secret_key)
    }
}

/// Fire-and-forget named-clip player. Shells out to an external player
/// binary on its own thread so `play` never blocks the tick loop; a
/// missing clip file is a warning, not an error.
pub struct ProcessAudioSink {
    clip_dir: PathBuf,
    player_cmd: String,
}

impl ProcessAudioSink {
    pub fn new(clip_dir: impl Into<PathBuf>, player_cmd: impl Into<String>) -> Self {
        Self { clip_dir: clip_dir.into(), player_cmd: player_cmd.into() }
    }
}

impl delivery_orchestrator::AudioSink for ProcessAudioSink {
    fn play(&self, clip: &str) {
        let path = self.clip_dir.join(format!("{clip}.wav"));
        if !path.exists() {
            warn!(clip, path = %path.display(), "missing audio clip, skipping playback");
            return;
        }
        let player_cmd = self.player_cmd.clone();
        std::thread::spawn(move || {
            if let Err(e) = std::process::Command::new(&player_cmd).arg(&path).status() {
                warn!(error = %e, player_cmd, "failed to spawn audio player");
            }
        });
    }
}

/// Reads one decoded QR payload from a sentinel file, written by the
/// external QR-decoder process this core only consumes bytes from. The
/// file is removed once read so a stale payload is never replayed.
pub struct FileQrScanner {
    source_path: PathBuf,
    capture_timeout: Duration,
    poll_interval: Duration,
}

impl FileQrScanner {
    pub fn new(source_path: impl Into<PathBuf>, capture_timeout: Duration) -> Self {
        Self { source_path: source_path.into(), capture_timeout, poll_interval: Duration::from_millis(200) }
    }
}

impl QrScanner for FileQrScanner {
    fn capture(&self) -> Result<QrPayload, DeliveryError> {
        let deadline = Instant::now() + self.capture_timeout;
        loop {
            if let Ok(text) = std::fs::read_to_string(&self.source_path) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    let payload = QrPayload::parse(trimmed).map_err(|_| DeliveryError::OrderInvalid);
                    let _ = std::fs::remove_file(&self.source_path);
                    return payload;
                }
            }
            if Instant::now() >= deadline {
                return Err(DeliveryError::OrderInvalid);
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

/// Runs the breakpoint person-cluster detector (`delivery_nav::detect_person`)
/// against the most recently received laser scan and the navigator's
/// current pose estimate.
pub struct LaserPersonDetector {
    navigator: Arc<Navigator>,
    last_scan: Arc<Mutex<Option<Scan>>>,
    config: PersonDetectorConfig,
}

impl LaserPersonDetector {
    pub fn new(navigator: Arc<Navigator>, last_scan: Arc<Mutex<Option<Scan>>>, config: PersonDetectorConfig) -> Self {
        Self { navigator, last_scan, config }
    }
}

impl PersonDetector for LaserPersonDetector {
    fn detect_person(&self) -> Option<Pose> {
        let scan = self.last_scan.lock().unwrap().clone()?;
        let pose = self.navigator.current_pose();
        detect_person(&scan, pose, &self.config)
    }
}

/// Resolves the `Loading` confirmation trigger as a bare network signal:
/// any TCP connection to the listening address counts as one operator
/// confirmation. An operator console (out of scope for this core) is the
/// intended caller.
pub struct TcpLoadConfirmationSource {
    confirmed: Arc<AtomicBool>,
}

impl TcpLoadConfirmationSource {
    pub fn bind(addr: &str) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let confirmed = Arc::new(AtomicBool::new(false));
        let flag = confirmed.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(_) => flag.store(true, Ordering::SeqCst),
                    Err(e) => warn!(error = %e, "load confirmation listener accept error"),
                }
            }
        });
        Ok(Self { confirmed })
    }
}

impl LoadConfirmationSource for TcpLoadConfirmationSource {
    fn poll_confirmed(&mut self) -> bool {
        self.confirmed.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_order_database_matches_only_the_recorded_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.toml");
        std::fs::write(&path, "[[orders]]\norder_id = 42\nsecret_key = \"abc\"\n").unwrap();
        let db = FileOrderDatabase::load(&path).unwrap();
        assert!(db.exists(42, "abc"));
        assert!(!db.exists(42, "wrong"));
        assert!(!db.exists(99, "abc"));
    }

    #[test]
    fn file_order_database_tolerates_a_missing_file() {
        let db = FileOrderDatabase::load("/nonexistent/orders.toml").unwrap();
        assert!(!db.exists(1, "anything"));
    }

    #[test]
    fn file_qr_scanner_reads_and_consumes_the_sentinel_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr.txt");
        std::fs::write(&path, r#"{"order_id":7,"secret_key":"k"}"#).unwrap();
        let scanner = FileQrScanner::new(&path, Duration::from_millis(500));
        let payload = scanner.capture().unwrap();
        assert_eq!(payload.order_id, 7);
        assert!(!path.exists(), "sentinel file should be consumed after a successful read");
    }

    #[test]
    fn file_qr_scanner_times_out_when_nothing_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr.txt");
        let scanner = FileQrScanner::new(&path, Duration::from_millis(50));
        assert!(matches!(scanner.capture(), Err(DeliveryError::OrderInvalid)));
    }
}
