//! Injectable time source.
//!
//! All staleness math is derived from a [`Clock`] handed to the supervisor
//! at construction, so liveness decisions are deterministic under test and
//! two instances sharing a store agree on "now" to within ordinary clock
//! drift. Production code uses [`SystemClock`]; tests use [`FixedClock`]
//! or [`ManualClock`] and never sleep to move time.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Trait for clock implementations.
pub trait Clock: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// System clock that reads the real system time.
///
/// This is the default clock for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that returns a constant instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    /// Create a fixed clock pinned to `instant`.
    #[must_use]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// Clock whose reading can be set or advanced by the holder.
///
/// Used by scenario tests that walk a session through check-in cadences
/// without real sleeps.
#[derive(Debug)]
pub struct ManualClock {
    instant: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a manual clock starting at `instant`.
    #[must_use]
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Move the clock forward by `seconds`.
    pub fn advance_secs(&self, seconds: i64) {
        let mut guard = self.instant.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += Duration::seconds(seconds);
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.instant.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .instant
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
