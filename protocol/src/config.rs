//! # Protocol Configuration & Constants
//!
//! Every magic number in Reservoir lives here, next to the per-vault
//! [`VaultConfig`] that admins are allowed to tune. If you're hardcoding a
//! constant somewhere else, move it here.
//!
//! Constants split into three groups: ledger accounting (basis points,
//! schema versioning, day length), risk math (fixed-point precision and
//! the minimum health factor), and oracle safety (staleness, skew and
//! confidence ceilings).

use serde::{Deserialize, Serialize};

use crate::vault::VaultError;

// ---------------------------------------------------------------------------
// Ledger Accounting
// ---------------------------------------------------------------------------

/// 10,000 basis points = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Highest fee an admin may configure. A 100% fee is legal (it turns a
/// vault into a sink) but anything above it is nonsense.
pub const MAX_FEE_BPS: u64 = BPS_DENOMINATOR;

/// Schema version stamped on every vault this build creates. Mutating
/// calls refuse to touch a vault carrying any other tag.
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// Milliseconds per day. The daily withdrawal window is
/// `timestamp_ms / MS_PER_DAY`, i.e. UTC calendar days.
pub const MS_PER_DAY: u64 = 86_400_000;

/// Default minimum deposit, in smallest units.
pub const DEFAULT_MIN_DEPOSIT: u64 = 1;

/// Default minimum withdrawal, in smallest units.
pub const DEFAULT_MIN_WITHDRAWAL: u64 = 1;

// ---------------------------------------------------------------------------
// Risk Math
// ---------------------------------------------------------------------------

/// Fixed-point scale for health factors. `PRECISION` == 1.0.
pub const PRECISION: u128 = 1_000_000_000;

/// Positions with a health factor below this are liquidatable.
pub const MIN_HEALTH_FACTOR: u128 = PRECISION;

/// Health factor reported for a position with no debt.
pub const MAX_HEALTH_FACTOR_SENTINEL: u128 = 10 * PRECISION;

/// Liquidations are capped at `min(collateral, debt) / LIQUIDATION_CAP_DIVISOR`.
pub const LIQUIDATION_CAP_DIVISOR: u128 = 2;

// ---------------------------------------------------------------------------
// Oracle Safety
// ---------------------------------------------------------------------------

/// A quote older than this (relative to the caller's clock) is stale.
pub const MAX_PRICE_STALENESS_SECS: i64 = 60;

/// A quote stamped further than this into the future is rejected too.
pub const MAX_CLOCK_SKEW_SECS: i64 = 5;

/// Maximum confidence interval, as bps of the price. 200 = 2%.
pub const MAX_CONFIDENCE_INTERVAL_BPS: u64 = 200;

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Per-vault fee and minimum parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Smallest deposit accepted, gross of fees.
    pub min_deposit: u64,
    /// Smallest withdrawal accepted, measured in assets before fees.
    pub min_withdrawal: u64,
    /// Fee taken from every deposit, in basis points.
    pub deposit_fee_bps: u64,
    /// Fee taken from every withdrawal, in basis points.
    pub withdrawal_fee_bps: u64,
}

impl VaultConfig {
    /// Checks the config invariants: non-zero minimums and fees within
    /// `[0, MAX_FEE_BPS]`.
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.min_deposit == 0 {
            return Err(VaultError::InvalidConfig("min_deposit must be > 0".into()));
        }
        if self.min_withdrawal == 0 {
            return Err(VaultError::InvalidConfig(
                "min_withdrawal must be > 0".into(),
            ));
        }
        if self.deposit_fee_bps > MAX_FEE_BPS {
            return Err(VaultError::InvalidConfig(format!(
                "deposit_fee_bps {} exceeds {}",
                self.deposit_fee_bps, MAX_FEE_BPS
            )));
        }
        if self.withdrawal_fee_bps > MAX_FEE_BPS {
            return Err(VaultError::InvalidConfig(format!(
                "withdrawal_fee_bps {} exceeds {}",
                self.withdrawal_fee_bps, MAX_FEE_BPS
            )));
        }
        Ok(())
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            min_deposit: DEFAULT_MIN_DEPOSIT,
            min_withdrawal: DEFAULT_MIN_WITHDRAWAL,
            deposit_fee_bps: 0,
            withdrawal_fee_bps: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(VaultConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_minimums_rejected() {
        let cfg = VaultConfig {
            min_deposit: 0,
            ..VaultConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(VaultError::InvalidConfig(_))));

        let cfg = VaultConfig {
            min_withdrawal: 0,
            ..VaultConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn fee_ceiling_is_inclusive() {
        let at_cap = VaultConfig {
            deposit_fee_bps: MAX_FEE_BPS,
            withdrawal_fee_bps: MAX_FEE_BPS,
            ..VaultConfig::default()
        };
        assert!(at_cap.validate().is_ok());

        let over = VaultConfig {
            withdrawal_fee_bps: MAX_FEE_BPS + 1,
            ..VaultConfig::default()
        };
        assert!(matches!(over.validate(), Err(VaultError::InvalidConfig(_))));
    }

    #[test]
    fn risk_constants_sanity() {
        // The no-debt sentinel must read as healthy.
        assert!(MAX_HEALTH_FACTOR_SENTINEL > MIN_HEALTH_FACTOR);
        assert_eq!(MIN_HEALTH_FACTOR, PRECISION);
        assert!(MAX_CONFIDENCE_INTERVAL_BPS < BPS_DENOMINATOR);
    }
}
