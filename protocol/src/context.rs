//! Call-time environment for vault and risk operations.
//!
//! Reservoir never reads the wall clock on its own inside an operation:
//! the caller supplies the timestamp it is executing at, and everything
//! time-dependent (daily-window rollover, quote staleness) is derived from
//! that one value. Tests pin time by constructing a context directly.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MS_PER_DAY;

/// The environment-provided timestamp an operation executes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// Wall-clock time of the call.
    pub now: DateTime<Utc>,
}

impl TxContext {
    /// Context at the current wall-clock time.
    pub fn now() -> Self {
        Self { now: Utc::now() }
    }

    /// Context at an explicit instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Context at `ms` milliseconds after the Unix epoch. Timestamps that
    /// chrono cannot represent collapse to the epoch.
    pub fn from_millis(ms: u64) -> Self {
        let now = i64::try_from(ms)
            .ok()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_default();
        Self { now }
    }

    /// Milliseconds since the Unix epoch, clamped at zero.
    pub fn timestamp_ms(&self) -> u64 {
        u64::try_from(self.now.timestamp_millis()).unwrap_or(0)
    }

    /// Index of the UTC day this context falls in.
    pub fn day_index(&self) -> u64 {
        self.timestamp_ms() / MS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_index_rolls_at_midnight_utc() {
        let last_ms_of_day_two = 3 * MS_PER_DAY - 1;
        assert_eq!(TxContext::from_millis(last_ms_of_day_two).day_index(), 2);
        assert_eq!(TxContext::from_millis(3 * MS_PER_DAY).day_index(), 3);
    }

    #[test]
    fn millis_round_trip() {
        let ctx = TxContext::from_millis(1_700_000_123_456);
        assert_eq!(ctx.timestamp_ms(), 1_700_000_123_456);
    }
}
