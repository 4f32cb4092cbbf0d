//! # Clock
//!
//! Source of the current time for every timestamp the engine writes.
//!
//! Components never call `Utc::now()` directly. The [`Network`](crate::Network)
//! owns a boxed `Clock`; tests inject a [`ManualClock`] and move it forward
//! explicitly, so elapsed-time rendering and feed ordering are reproducible.

use crate::Timestamp;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Provides the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and pass
/// another into a [`Network`](crate::Network).
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn at(start: Timestamp) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(DateTime::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_all_clones() {
        let clock = ManualClock::default();
        let handle = clock.clone();
        handle.advance(Duration::minutes(90));

        let elapsed = clock.now() - DateTime::UNIX_EPOCH;
        assert_eq!(elapsed.num_minutes(), 90);
    }

    #[test]
    fn manual_clock_set() {
        let clock = ManualClock::default();
        let target = DateTime::from_timestamp(1_700_000_000, 0).expect("valid");
        clock.set(target);
        assert_eq!(clock.now(), target);
    }

    #[test]
    fn system_clock_moves_forward() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b >= a);
    }
}
