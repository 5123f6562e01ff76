//! Time sources for lifecycle timestamps.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Source of "now" for lifecycle timestamps.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock anchor advanced by the tokio timer.
///
/// Monotonic, and it follows paused/advanced time in `tokio::time` tests, so
/// timestamps agree with the timers that produce them.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    anchor_wall: DateTime<Utc>,
    anchor: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Start the clock at a fixed wall time (deterministic tests).
    pub fn anchored_at(anchor_wall: DateTime<Utc>) -> Self {
        Self {
            anchor_wall,
            anchor: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.anchor);
        self.anchor_wall + chrono::Duration::from_std(elapsed).unwrap_or_default()
    }
}

/// Plain system time. Not monotonic; the job entity clamps regressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
