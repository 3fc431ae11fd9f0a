//! # Risk Engine
//!
//! Read-only collateral math for the credit subsystem: health factors,
//! liquidation eligibility, and borrowing capacity. All values are `u128`
//! fixed point; a health factor of [`PRECISION`] is exactly 1.0.
//!
//! ```text
//! collateral_usd = price * amount / 10^decimals
//! adjusted       = collateral_usd * liquidation_threshold_bps / 10_000
//! health_factor  = adjusted * PRECISION / debt_usd       (debt > 0)
//!                = 10 * PRECISION                        (debt = 0)
//! ```
//!
//! The engine never returns an error. When it cannot vouch for an answer
//! (unsafe oracle, bad threshold, overflow) it returns the most conservative
//! one instead, tagged with a [`RiskStatus`] saying why: health factor 0 and
//! unhealthy, not eligible for liquidation, zero borrowing capacity. A
//! caller that ignores the status still cannot lend against a bad price or
//! liquidate on one.

use serde::{Deserialize, Serialize};

use crate::config::{
    BPS_DENOMINATOR, LIQUIDATION_CAP_DIVISOR, MAX_HEALTH_FACTOR_SENTINEL, MIN_HEALTH_FACTOR,
    PRECISION,
};
use crate::context::TxContext;
use crate::math::{self, MathError};
use crate::oracle::{OracleFault, PriceOracle};
use crate::vault::AssetId;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a risk result was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskStatus {
    /// Inputs and prices were sound; the numbers are real.
    Computed,
    /// The price gate refused; numbers are conservative placeholders.
    OracleUnsafe(OracleFault),
    /// `liquidation_threshold_bps` above 10_000.
    InvalidThreshold(u64),
    /// Intermediate arithmetic overflowed.
    ArithmeticFault,
}

impl RiskStatus {
    pub fn is_computed(&self) -> bool {
        matches!(self, RiskStatus::Computed)
    }
}

/// A collateralized debt position to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Collateral asset.
    pub asset: AssetId,
    /// Collateral in smallest units.
    pub collateral_amount: u128,
    /// Decimals of the collateral asset.
    pub collateral_decimals: u8,
    /// Outstanding debt in USD units.
    pub debt_usd: u128,
    /// Share of collateral value that counts towards solvency.
    pub liquidation_threshold_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHealth {
    pub status: RiskStatus,
    pub collateral_usd: u128,
    pub adjusted_collateral_usd: u128,
    pub debt_usd: u128,
    pub health_factor: u128,
    pub is_healthy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCheck {
    pub status: RiskStatus,
    pub health_factor: u128,
    pub eligible: bool,
    /// Most debt (USD) a liquidator may repay in one go. Zero unless
    /// eligible.
    pub max_liquidation_usd: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowingCapacity {
    pub status: RiskStatus,
    pub collateral_usd: u128,
    pub max_borrow_usd: u128,
    pub existing_debt_usd: u128,
    pub available_borrow_usd: u128,
}

impl PositionHealth {
    fn failed(status: RiskStatus, debt_usd: u128) -> Self {
        Self {
            status,
            collateral_usd: 0,
            adjusted_collateral_usd: 0,
            debt_usd,
            health_factor: 0,
            is_healthy: false,
        }
    }
}

impl BorrowingCapacity {
    fn failed(status: RiskStatus, existing_debt_usd: u128) -> Self {
        Self {
            status,
            collateral_usd: 0,
            max_borrow_usd: 0,
            existing_debt_usd,
            available_borrow_usd: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct Valuation {
    collateral_usd: u128,
    adjusted: u128,
}

/// Risk calculations against a borrowed oracle.
pub struct RiskEngine<'a, O: PriceOracle + ?Sized> {
    oracle: &'a O,
}

impl<'a, O: PriceOracle + ?Sized> RiskEngine<'a, O> {
    pub fn new(oracle: &'a O) -> Self {
        Self { oracle }
    }

    /// Whether `asset`'s current quote clears the safety gate at `ctx`.
    pub fn is_oracle_safe(&self, asset: &AssetId, ctx: &TxContext) -> bool {
        self.oracle.safe_price(asset, ctx).is_ok()
    }

    /// Health factor of `position`.
    pub fn calculate_position_health(
        &self,
        position: &Position,
        ctx: &TxContext,
    ) -> PositionHealth {
        let valuation = match self.value(position, ctx) {
            Ok(v) => v,
            Err(status) => return PositionHealth::failed(status, position.debt_usd),
        };

        let health_factor = if position.debt_usd == 0 {
            MAX_HEALTH_FACTOR_SENTINEL
        } else {
            match math::mul_div_wide(valuation.adjusted, PRECISION, position.debt_usd) {
                Ok(hf) => hf,
                Err(_) => {
                    return PositionHealth::failed(RiskStatus::ArithmeticFault, position.debt_usd)
                }
            }
        };

        let health = PositionHealth {
            status: RiskStatus::Computed,
            collateral_usd: valuation.collateral_usd,
            adjusted_collateral_usd: valuation.adjusted,
            debt_usd: position.debt_usd,
            health_factor,
            is_healthy: health_factor >= MIN_HEALTH_FACTOR,
        };
        tracing::debug!(
            asset = %position.asset,
            health_factor,
            healthy = health.is_healthy,
            "position health"
        );
        health
    }

    /// Whether `position` may be liquidated, and by how much.
    pub fn check_liquidation_eligibility(
        &self,
        position: &Position,
        ctx: &TxContext,
    ) -> LiquidationCheck {
        let health = self.calculate_position_health(position, ctx);
        if !health.status.is_computed() || health.is_healthy {
            return LiquidationCheck {
                status: health.status,
                health_factor: health.health_factor,
                eligible: false,
                max_liquidation_usd: 0,
            };
        }

        let max_liquidation_usd =
            health.collateral_usd.min(health.debt_usd) / LIQUIDATION_CAP_DIVISOR;
        tracing::debug!(
            asset = %position.asset,
            health_factor = health.health_factor,
            max_liquidation_usd,
            "position eligible for liquidation"
        );
        LiquidationCheck {
            status: RiskStatus::Computed,
            health_factor: health.health_factor,
            eligible: true,
            max_liquidation_usd,
        }
    }

    /// How much more `position` could borrow while staying at or above the
    /// minimum health factor.
    pub fn calculate_borrowing_capacity(
        &self,
        position: &Position,
        ctx: &TxContext,
    ) -> BorrowingCapacity {
        let valuation = match self.value(position, ctx) {
            Ok(v) => v,
            Err(status) => return BorrowingCapacity::failed(status, position.debt_usd),
        };
        let max_borrow_usd =
            match math::mul_div_wide(valuation.adjusted, PRECISION, MIN_HEALTH_FACTOR) {
                Ok(v) => v,
                Err(_) => {
                    return BorrowingCapacity::failed(RiskStatus::ArithmeticFault, position.debt_usd)
                }
            };
        BorrowingCapacity {
            status: RiskStatus::Computed,
            collateral_usd: valuation.collateral_usd,
            max_borrow_usd,
            existing_debt_usd: position.debt_usd,
            available_borrow_usd: max_borrow_usd.saturating_sub(position.debt_usd),
        }
    }

    fn value(&self, position: &Position, ctx: &TxContext) -> Result<Valuation, RiskStatus> {
        if let Err(fault) = self.oracle.safe_price(&position.asset, ctx) {
            tracing::warn!(asset = %position.asset, %fault, "oracle unsafe, failing closed");
            return Err(RiskStatus::OracleUnsafe(fault));
        }
        if position.liquidation_threshold_bps > BPS_DENOMINATOR {
            return Err(RiskStatus::InvalidThreshold(
                position.liquidation_threshold_bps,
            ));
        }

        let collateral_usd = self
            .oracle
            .usd_value(
                &position.asset,
                position.collateral_amount,
                position.collateral_decimals,
            )
            .ok_or(RiskStatus::ArithmeticFault)?;
        let adjusted = math::mul_div_wide(
            collateral_usd,
            u128::from(position.liquidation_threshold_bps),
            u128::from(BPS_DENOMINATOR),
        )
        .map_err(|_: MathError| RiskStatus::ArithmeticFault)?;

        Ok(Valuation {
            collateral_usd,
            adjusted,
        })
    }
}
