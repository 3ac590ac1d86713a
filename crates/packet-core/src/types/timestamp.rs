//! Capture timestamps
//!
//! Capture files record arrival time as seconds plus a sub-second part; the
//! framers normalize that to microseconds since the Unix epoch. Arrival times
//! are non-decreasing across a capture only in aggregate: merged captures and
//! multi-interface captures routinely deliver a single session's packets out
//! of order, so nothing here assumes monotonicity.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arrival time of a packet, in microseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Create a timestamp from microseconds since the epoch
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Create a timestamp from milliseconds since the epoch
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis.saturating_mul(1_000))
    }

    /// Create a timestamp from whole seconds plus microseconds, the way
    /// pcap record headers store it
    pub const fn from_secs_micros(secs: u64, micros: u32) -> Self {
        Timestamp(secs.saturating_mul(1_000_000).saturating_add(micros as u64))
    }

    /// Microseconds since the epoch
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, or `None` if `earlier` is later
    pub fn checked_duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_micros)
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Shift this timestamp forward
    pub fn saturating_add(&self, delta: Duration) -> Timestamp {
        let micros = u64::try_from(delta.as_micros()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(micros))
    }

    /// Convert to a UTC date-time, `None` if out of chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let micros = i64::try_from(self.0).ok()?;
        DateTime::from_timestamp_micros(micros)
    }
}

impl From<u64> for Timestamp {
    fn from(micros: u64) -> Self {
        Timestamp(micros)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6fZ")),
            None => write!(f, "{}us", self.0),
        }
    }
}
