/// Running counters for link health, sampled by the daemon's monitoring
/// surface: frame and ACK counts, retry/timeout counts, and round-trip
/// latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStatistics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub acks_received: u64,
    pub retries: u64,
    pub timeouts: u64,
    sum_round_trip_us: u64,
    acked_commands: u64,
}

impl LinkStatistics {
    pub fn record_send(&mut self) {
        self.frames_sent += 1;
    }

    pub fn record_receive(&mut self) {
        self.frames_received += 1;
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn record_timeout(&mut self) {
        self.timeouts += 1;
    }

    pub fn record_ack(&mut self, round_trip: std::time::Duration) {
        self.acks_received += 1;
        self.acked_commands += 1;
        self.sum_round_trip_us += round_trip.as_micros() as u64;
    }

    /// Average ACK round-trip latency in microseconds, or `None` if no
    /// command has ever been acknowledged.
    pub fn average_round_trip_us(&self) -> Option<u64> {
        if self.acked_commands == 0 {
            None
        } else {
            Some(self.sum_round_trip_us / self.acked_commands)
        }
    }

    /// Fraction of sent reliable commands that were never acknowledged at
    /// all (exhausted retries), in `[0, 1]`.
    pub fn loss_rate(&self) -> f64 {
        if self.frames_sent == 0 {
            0.0
        } else {
            self.timeouts as f64 / self.frames_sent as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn average_round_trip_is_none_until_first_ack() {
        let stats = LinkStatistics::default();
        assert_eq!(stats.average_round_trip_us(), None);
    }

    #[test]
    fn average_round_trip_tracks_mean() {
        let mut stats = LinkStatistics::default();
        stats.record_ack(Duration::from_micros(100));
        stats.record_ack(Duration::from_micros(300));
        assert_eq!(stats.average_round_trip_us(), Some(200));
    }

    #[test]
    fn loss_rate_is_zero_with_no_sends() {
        assert_eq!(LinkStatistics::default().loss_rate(), 0.0);
    }

    #[test]
    fn loss_rate_reflects_timeouts_over_sends() {
        let mut stats = LinkStatistics::default();
        stats.record_send();
        stats.record_send();
        stats.record_timeout();
        assert_eq!(stats.loss_rate(), 0.5);
    }
}
