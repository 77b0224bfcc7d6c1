use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use super::models::MessageType;

/// Minimum spacing between two frames of the same type (~20 msgs/sec).
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

/// Smallest usable interval. With a millisecond clock anything shorter
/// would let two frames of one type share a `client_ts`.
pub const MIN_INTERVAL_FLOOR: Duration = Duration::from_millis(1);

/// Source of epoch-millisecond timestamps.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Per-type send limiter. Dropped messages are not queued or coalesced.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval_ms: i64,
    last_sent_at: HashMap<MessageType, i64>,
}

impl Throttle {
    /// Intervals below [`MIN_INTERVAL_FLOOR`] are raised to it.
    pub fn new(min_interval: Duration) -> Self {
        let min_interval = min_interval.max(MIN_INTERVAL_FLOOR);
        Self {
            min_interval_ms: i64::try_from(min_interval.as_millis()).unwrap_or(i64::MAX),
            last_sent_at: HashMap::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms.unsigned_abs())
    }

    /// Returns true and records `now` if a frame of `kind` may go out.
    ///
    /// A type that was never sent always passes.
    pub fn try_acquire(&mut self, kind: MessageType, now: i64) -> bool {
        if let Some(last) = self.last_sent_at.get(&kind) {
            if now.saturating_sub(*last) < self.min_interval_ms {
                return false;
            }
        }
        self.last_sent_at.insert(kind, now);
        true
    }

    pub fn last_sent_at(&self, kind: MessageType) -> Option<i64> {
        self.last_sent_at.get(&kind).copied()
    }

    pub fn reset(&mut self) {
        self.last_sent_at.clear();
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
