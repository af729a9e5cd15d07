//! Time sources.
//!
//! Elapsed emergency time is always derived from a stored start instant and
//! the current reading of a [`Clock`], never from an accumulated tick count,
//! so that suspended or backgrounded processes report the right value.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// A source of the current wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock for tests and replays.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wraps a clock so that its readings never go backwards.
///
/// A wall clock stepped back (for example by an NTP correction) reads as the
/// latest instant already observed until it catches up again.
#[derive(Debug)]
pub struct MonotonicClock {
    inner: Arc<dyn Clock>,
    floor: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    /// Wrap `inner` with no lower bound beyond its own readings.
    #[must_use]
    pub fn new(inner: Arc<dyn Clock>) -> Self {
        Self::with_floor(inner, None)
    }

    /// Wrap `inner`, never reading earlier than `floor`.
    #[must_use]
    pub fn with_floor(inner: Arc<dyn Clock>, floor: Option<DateTime<Utc>>) -> Self {
        Self {
            inner,
            floor: Mutex::new(floor),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let reading = self.inner.now();
        let mut floor = self.floor.lock().unwrap_or_else(PoisonError::into_inner);
        let now = floor.map_or(reading, |f| f.max(reading));
        *floor = Some(now);
        now
    }
}

/// Whole seconds between `start` and `end`, saturating at zero.
#[must_use]
pub fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}
