//! Timestamps and the clock the engine reads them from.
//!
//! The engine never calls the system clock directly. It is handed a
//! [`Clock`], so tests can use [`ManualClock`] and get deterministic,
//! strictly increasing timestamps.

use std::cell::Cell;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant, serialized as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Milliseconds since the Unix epoch. Out-of-range input clamps to the epoch.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Monotonic timestamp source.
pub trait Clock {
    /// Returns an instant no earlier than any previously returned one.
    fn now(&self) -> Timestamp;
}

/// Wall clock that never goes backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Cell<Option<Timestamp>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp(Utc::now());
        let now = match self.last.get() {
            Some(last) if last > wall => last,
            _ => wall,
        };
        self.last.set(Some(now));
        now
    }
}

/// Test clock: starts at a fixed instant and ticks one millisecond per read.
#[derive(Debug)]
pub struct ManualClock {
    next: Cell<i64>,
}

impl ManualClock {
    pub fn starting_at(millis: i64) -> Self {
        ManualClock {
            next: Cell::new(millis),
        }
    }

    /// Jumps the clock forward.
    pub fn advance(&self, by: Duration) {
        self.next.set(self.next.get() + by.num_milliseconds());
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::starting_at(1_600_000_000_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let millis = self.next.get();
        self.next.set(millis + 1);
        Timestamp::from_millis(millis)
    }
}
