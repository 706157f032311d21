//! Time utilities and the clock interface for SealBid.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Default auction timing, matching the reference deployment.
pub mod constants {
    /// Default bidding window in seconds.
    pub const DEFAULT_BIDDING_SECS: u64 = 120;

    /// Default revealing window in seconds.
    pub const DEFAULT_REVEALING_SECS: u64 = 120;
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current wall-clock timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Source of "current time" for deadline checks.
///
/// Implementations must be monotonically non-decreasing. The engine only
/// reads the clock; it never moves it.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// Manually driven clock for simulations and tests.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(RwLock::new(start)),
        }
    }

    /// Move the clock forward. Negative durations are ignored.
    pub fn advance(&self, by: Duration) {
        if by <= Duration::zero() {
            return;
        }
        let mut current = self.current.write();
        *current += by;
    }

    /// Jump to `at` if it is not in the past.
    pub fn advance_to(&self, at: Timestamp) {
        let mut current = self.current.write();
        if at > *current {
            *current = at;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.read()
    }
}

/// Duration conversions between std and chrono.
pub trait DurationExt {
    fn to_chrono(&self) -> Option<Duration>;
}

impl DurationExt for std::time::Duration {
    fn to_chrono(&self) -> Option<Duration> {
        Duration::from_std(*self).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now(), start + Duration::seconds(30));
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let start = now();
        let clock = ManualClock::new(start);

        clock.advance(Duration::seconds(-10));
        assert_eq!(clock.now(), start);

        clock.advance_to(start - Duration::seconds(5));
        assert_eq!(clock.now(), start);

        clock.advance_to(start + Duration::seconds(5));
        assert_eq!(clock.now(), start + Duration::seconds(5));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let observer = clock.clone();
        clock.advance(Duration::seconds(1));
        assert_eq!(clock.now(), observer.now());
    }

    #[test]
    fn test_duration_conversion() {
        let d = std::time::Duration::from_secs(120);
        assert_eq!(d.to_chrono(), Some(Duration::seconds(120)));
    }
}
