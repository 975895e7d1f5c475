use std::time::Duration;
use tokio::time::Instant;

/// Decides when a burst of events has settled enough to start a batch.
#[derive(Debug, Clone, Copy)]
pub struct DebounceGate {
    quiet_period: Duration,
}

impl DebounceGate {
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period }
    }

    /// True once the queue holds work and nothing arrived for longer than the
    /// quiet period.
    pub fn should_fire(&self, now: Instant, last_activity: Option<Instant>, pending: usize) -> bool {
        if pending == 0 {
            return false;
        }
        match last_activity {
            Some(last) => now.saturating_duration_since(last) > self.quiet_period,
            None => true,
        }
    }
}
