use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

/// Monotonic-enough wall-clock stamp in milliseconds since the Unix epoch,
/// attached to every transition record. Plain `SystemTime` rather than
/// pulling in a calendar/timezone crate this core has no other use for.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Emits the structured transition-log record for a state change:
/// old state, new state, timestamp, and the triggering reason.
pub fn log_transition(old_state: &str, new_state: &str, reason: &str) {
    info!(
        old_state,
        new_state,
        reason,
        timestamp_ms = now_millis(),
        "state transition"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_millis_is_monotonically_non_decreasing() {
        let a = now_millis();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = now_millis();
        assert!(b >= a);
    }
}
