//! Time sources for record timestamps.
//!
//! The store never calls `Utc::now()` directly so that timestamp rules can be
//! exercised deterministically.

use std::sync::{Arc, Mutex};

use crate::types::Timestamp;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }

    pub fn set(&self, to: Timestamp) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let start = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();
        clock.advance(chrono::Duration::seconds(5));
        assert_eq!(other.now(), start + chrono::Duration::seconds(5));
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b >= a);
    }
}
