//! Rate pacing for generator lanes

use std::time::Duration;

use tokio::time::Instant;

/// How often a generator lane wakes up to emit its due packets
pub const PACER_TICK: Duration = Duration::from_millis(1);

/// Tracks how many packets a lane owes at a fixed rate.
///
/// The schedule is anchored at creation, so rounding never drifts: after
/// `t` seconds exactly `floor(rate * t)` packets have been released, unless
/// the lane stalled for more than a second, in which case the backlog beyond
/// one second's worth is forgiven.
#[derive(Debug, Clone)]
pub struct Pacer {
    rate: u64,
    started: Instant,
    released: u64,
}

impl Pacer {
    pub fn new(rate: u64) -> Self {
        Self::starting_at(rate, Instant::now())
    }

    pub fn starting_at(rate: u64, started: Instant) -> Self {
        Pacer {
            rate,
            started,
            released: 0,
        }
    }

    #[inline]
    pub fn rate(&self) -> u64 {
        self.rate
    }

    /// Packets released so far
    #[inline]
    pub fn released(&self) -> u64 {
        self.released
    }

    /// Number of packets to emit now
    pub fn due(&mut self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started);
        let scheduled = (elapsed.as_nanos() * self.rate as u128 / 1_000_000_000) as u64;

        let mut due = scheduled.saturating_sub(self.released);
        if due > self.rate {
            self.released = scheduled - self.rate;
            due = self.rate;
        }
        self.released += due;
        due
    }
}
