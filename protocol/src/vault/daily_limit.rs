//! # Daily Withdrawal Governor
//!
//! Caps how much can leave a vault per UTC day. The window is *lazy*:
//! there is no timer. The first withdrawal-adjacent call that arrives with a
//! newer day index than the stored one zeroes the counter and advances the
//! day, then evaluates its own request. A call carrying an older day index
//! (clock skew between callers) never rewinds anything.
//!
//! Invariant: `withdrawn_today <= max_daily_withdrawal`.

use serde::{Deserialize, Serialize};

use super::error::VaultError;
use crate::math;

/// Rolling per-day withdrawal quota.
///
/// Deserialization re-checks the invariant, so a snapshot with a zero
/// maximum or an over-full counter is refused at restore time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DailyLimitRecord")]
pub struct DailyLimit {
    max_daily_withdrawal: u64,
    current_day: u64,
    withdrawn_today: u64,
}

impl DailyLimit {
    /// Creates a governor with nothing withdrawn, anchored at `day`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidConfig`] if `max_daily_withdrawal == 0`.
    pub fn new(max_daily_withdrawal: u64, day: u64) -> Result<Self, VaultError> {
        Self::check_max(max_daily_withdrawal)?;
        Ok(Self {
            max_daily_withdrawal,
            current_day: day,
            withdrawn_today: 0,
        })
    }

    pub fn max_daily_withdrawal(&self) -> u64 {
        self.max_daily_withdrawal
    }

    pub fn current_day(&self) -> u64 {
        self.current_day
    }

    pub fn withdrawn_today(&self) -> u64 {
        self.withdrawn_today
    }

    /// Quota left as seen from `day`, accounting for a pending rollover.
    /// Does not mutate.
    pub fn remaining(&self, day: u64) -> u64 {
        let rolled = self.rolled_to(day);
        rolled
            .max_daily_withdrawal
            .saturating_sub(rolled.withdrawn_today)
    }

    /// Records a withdrawal of `amount` on `day`.
    ///
    /// Rolls the window first if `day` is newer than the stored day.
    ///
    /// # Errors
    ///
    /// [`VaultError::DailyLimitExceeded`] if the request does not fit in
    /// the remaining quota. On error nothing changes, including the
    /// rollover.
    pub fn consume(&mut self, amount: u64, day: u64) -> Result<(), VaultError> {
        let mut next = self.rolled_to(day);
        let total = math::add(next.withdrawn_today, amount)?;
        if total > next.max_daily_withdrawal {
            return Err(VaultError::DailyLimitExceeded {
                requested: amount,
                remaining: next
                    .max_daily_withdrawal
                    .saturating_sub(next.withdrawn_today),
            });
        }
        next.withdrawn_today = total;
        *self = next;
        Ok(())
    }

    /// Replaces the daily maximum. If more than the new maximum has already
    /// been withdrawn today, the counter is clamped to it (leaving zero
    /// quota) to keep the invariant.
    pub fn set_max(&mut self, new_max: u64) -> Result<(), VaultError> {
        Self::check_max(new_max)?;
        self.max_daily_withdrawal = new_max;
        self.withdrawn_today = self.withdrawn_today.min(new_max);
        Ok(())
    }

    /// Zeroes today's counter without touching the day index.
    pub fn reset(&mut self) {
        self.withdrawn_today = 0;
    }

    /// Sets the day index to `day` unconditionally and zeroes the counter.
    pub fn force_day(&mut self, day: u64) {
        self.current_day = day;
        self.withdrawn_today = 0;
    }

    /// Consumes the whole of `day`'s quota, rolling the window forward
    /// first if `day` is newer.
    pub fn exhaust(&mut self, day: u64) {
        *self = self.rolled_to(day);
        self.withdrawn_today = self.max_daily_withdrawal;
    }

    fn rolled_to(&self, day: u64) -> Self {
        if day > self.current_day {
            Self {
                current_day: day,
                withdrawn_today: 0,
                ..*self
            }
        } else {
            *self
        }
    }

    fn check_max(max: u64) -> Result<(), VaultError> {
        if max == 0 {
            return Err(VaultError::InvalidConfig(
                "max_daily_withdrawal must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Wire form of [`DailyLimit`], validated on the way in.
#[derive(Deserialize)]
struct DailyLimitRecord {
    max_daily_withdrawal: u64,
    current_day: u64,
    withdrawn_today: u64,
}

impl TryFrom<DailyLimitRecord> for DailyLimit {
    type Error = VaultError;

    fn try_from(record: DailyLimitRecord) -> Result<Self, Self::Error> {
        DailyLimit::check_max(record.max_daily_withdrawal)?;
        if record.withdrawn_today > record.max_daily_withdrawal {
            return Err(VaultError::InvalidConfig(format!(
                "withdrawn_today {} exceeds max_daily_withdrawal {}",
                record.withdrawn_today, record.max_daily_withdrawal
            )));
        }
        Ok(Self {
            max_daily_withdrawal: record.max_daily_withdrawal,
            current_day: record.current_day,
            withdrawn_today: record.withdrawn_today,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_quota() {
        let mut limit = DailyLimit::new(1_000, 10).unwrap();
        limit.consume(400, 10).unwrap();
        limit.consume(600, 10).unwrap();
        assert_eq!(limit.withdrawn_today(), 1_000);
        assert_eq!(limit.remaining(10), 0);
    }

    #[test]
    fn over_quota_rejected_without_side_effects() {
        let mut limit = DailyLimit::new(1_000, 10).unwrap();
        limit.consume(700, 10).unwrap();
        let before = limit;

        let err = limit.consume(301, 10).unwrap_err();
        assert!(matches!(
            err,
            VaultError::DailyLimitExceeded {
                requested: 301,
                remaining: 300
            }
        ));
        assert_eq!(limit, before);
    }

    #[test]
    fn new_day_resets_lazily() {
        let mut limit = DailyLimit::new(1_000, 10).unwrap();
        limit.consume(1_000, 10).unwrap();

        // Nothing happens until someone shows up on day 11.
        assert_eq!(limit.current_day(), 10);
        assert_eq!(limit.remaining(11), 1_000);

        limit.consume(250, 11).unwrap();
        assert_eq!(limit.current_day(), 11);
        assert_eq!(limit.withdrawn_today(), 250);
    }

    #[test]
    fn older_day_never_rewinds() {
        let mut limit = DailyLimit::new(1_000, 10).unwrap();
        limit.consume(900, 10).unwrap();

        assert!(limit.consume(200, 9).is_err());
        limit.consume(100, 9).unwrap();
        assert_eq!(limit.current_day(), 10);
        assert_eq!(limit.withdrawn_today(), 1_000);
    }

    #[test]
    fn failed_request_on_new_day_does_not_commit_rollover() {
        let mut limit = DailyLimit::new(100, 10).unwrap();
        limit.consume(100, 10).unwrap();

        assert!(limit.consume(101, 11).is_err());
        assert_eq!(limit.current_day(), 10);
        assert_eq!(limit.withdrawn_today(), 100);
    }

    #[test]
    fn set_max_clamps_counter() {
        let mut limit = DailyLimit::new(1_000, 1).unwrap();
        limit.consume(800, 1).unwrap();
        limit.set_max(500).unwrap();
        assert_eq!(limit.withdrawn_today(), 500);
        assert_eq!(limit.remaining(1), 0);

        assert!(limit.set_max(0).is_err());
    }

    #[test]
    fn exhaust_blocks_until_reset_or_rollover() {
        let mut limit = DailyLimit::new(1_000, 5).unwrap();
        limit.exhaust(5);
        assert!(limit.consume(1, 5).is_err());

        limit.reset();
        limit.consume(1, 5).unwrap();

        limit.exhaust(5);
        limit.consume(1, 6).unwrap();
    }

    #[test]
    fn exhaust_on_stale_window_covers_the_new_day() {
        let mut limit = DailyLimit::new(1_000, 5).unwrap();
        limit.exhaust(9);
        assert_eq!(limit.current_day(), 9);
        assert!(limit.consume(1, 9).is_err());
        limit.consume(1, 10).unwrap();
    }

    #[test]
    fn force_day_moves_either_direction() {
        let mut limit = DailyLimit::new(1_000, 20).unwrap();
        limit.consume(500, 20).unwrap();
        limit.force_day(3);
        assert_eq!(limit.current_day(), 3);
        assert_eq!(limit.withdrawn_today(), 0);
    }

    #[test]
    fn restore_rejects_counter_above_max() {
        let json = r#"{"max_daily_withdrawal":100,"current_day":7,"withdrawn_today":500}"#;
        assert!(serde_json::from_str::<DailyLimit>(json).is_err());

        let json = r#"{"max_daily_withdrawal":0,"current_day":7,"withdrawn_today":0}"#;
        assert!(serde_json::from_str::<DailyLimit>(json).is_err());

        let json = r#"{"max_daily_withdrawal":100,"current_day":7,"withdrawn_today":100}"#;
        let limit: DailyLimit = serde_json::from_str(json).unwrap();
        assert_eq!(limit.remaining(7), 0);
    }
}
