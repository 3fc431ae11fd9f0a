//! # Asset Pool & Share Ledger
//!
//! A [`Vault`] pools one asset type. Depositors receive shares; each share
//! is a proportional claim on `total_assets = pool_balance +
//! borrowed_principal`. The credit subsystem can borrow out of the pool
//! (and repay into it) without touching the share supply: borrowed
//! principal still backs shares, so lending never moves the exchange rate.
//!
//! ## Rounding
//!
//! Both conversions floor. A depositor gets *at most* their fair share
//! count and a redeemer gets *at most* their fair asset amount; the
//! remainder stays in the pool for everyone else. Rounding either direction
//! in the caller's favour would let repeated dust operations pull value out
//! of the pool, and makes the first-depositor share-inflation trick viable.
//! Tests pin this behaviour.
//!
//! ## Atomicity
//!
//! Every mutating method stages its effect on copies of the ledger and the
//! daily limit, runs every precondition against those copies, and assigns
//! them back in one step at the end. An `Err` therefore leaves the vault
//! exactly as it was. The composites ([`Vault::deposit_and_borrow`],
//! [`Vault::repay_and_withdraw`]) are just two staged steps on the same
//! copies.
//!
//! ## Check order
//!
//! capability identity → schema version → status → amounts → daily limit
//! → liquidity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::AssetId;
use super::daily_limit::DailyLimit;
use super::error::VaultError;
use super::status::{OperationClass, VaultStatus};
use crate::capability::{AdminCap, Capability, CreditCap};
use crate::config::{VaultConfig, BPS_DENOMINATOR, CURRENT_SCHEMA_VERSION};
use crate::context::TxContext;
use crate::math::{self, MathError};

const AUDIT: &str = "reservoir::audit";

// ---------------------------------------------------------------------------
// PoolLedger
// ---------------------------------------------------------------------------

/// The accounting core of a vault: balances and share supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    /// Assets physically held.
    pub pool_balance: u64,
    /// Assets lent to the credit subsystem. Still backs shares.
    pub borrowed_principal: u64,
    /// Total shares issued.
    pub shares_outstanding: u64,
    /// Fees retained by the protocol. Held outside `pool_balance` and
    /// backs no shares.
    pub accrued_fees: u64,
}

impl PoolLedger {
    /// `pool_balance + borrowed_principal`.
    pub fn total_assets(&self) -> Result<u64, MathError> {
        math::add(self.pool_balance, self.borrowed_principal)
    }

    /// Shares minted for `assets`, floored. 1:1 while the vault is empty.
    pub fn to_shares(&self, assets: u64) -> Result<u64, MathError> {
        let total = self.total_assets()?;
        if self.shares_outstanding == 0 || total == 0 {
            return Ok(assets);
        }
        math::mul_div(assets, self.shares_outstanding, total)
    }

    /// Assets redeemable for `shares`, floored. Zero while no shares exist.
    pub fn to_assets(&self, shares: u64) -> Result<u64, MathError> {
        if self.shares_outstanding == 0 {
            return Ok(0);
        }
        math::mul_div(shares, self.total_assets()?, self.shares_outstanding)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// How a repayment was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayOutcome {
    /// Principal actually retired.
    pub principal_repaid: u64,
    /// Amount paid beyond the outstanding principal. It stays in the pool
    /// and accrues to shareholders.
    pub excess: u64,
}

/// Point-in-time summary of a vault's books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatistics {
    pub total_assets: u64,
    pub total_shares: u64,
    pub borrowed: u64,
    /// Assets physically available for withdrawal or borrowing.
    pub available: u64,
    /// `borrowed / total_assets` in basis points. Zero for an empty vault.
    pub utilization_bps: u64,
    pub accrued_fees: u64,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A pooled-asset vault for a single asset type.
///
/// A restored snapshot must pass the same config and ledger checks a live
/// vault keeps; anything else fails to deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "VaultRecord")]
pub struct Vault {
    id: Uuid,
    asset: AssetId,
    ledger: PoolLedger,
    status: VaultStatus,
    daily_limit: DailyLimit,
    config: VaultConfig,
    schema_version: u64,
    admin_cap_id: Uuid,
    credit_cap_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Wire form of [`Vault`], validated on the way in.
#[derive(Deserialize)]
struct VaultRecord {
    id: Uuid,
    asset: AssetId,
    ledger: PoolLedger,
    status: VaultStatus,
    daily_limit: DailyLimit,
    config: VaultConfig,
    schema_version: u64,
    admin_cap_id: Uuid,
    credit_cap_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VaultRecord> for Vault {
    type Error = VaultError;

    fn try_from(r: VaultRecord) -> Result<Self, Self::Error> {
        r.config.validate()?;
        let vault = Vault {
            id: r.id,
            asset: r.asset,
            ledger: r.ledger,
            status: r.status,
            daily_limit: r.daily_limit,
            config: r.config,
            schema_version: r.schema_version,
            admin_cap_id: r.admin_cap_id,
            credit_cap_id: r.credit_cap_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
        };
        if !vault.invariants_hold() {
            return Err(VaultError::InvalidConfig(format!(
                "restored vault {} violates ledger invariants",
                vault.id
            )));
        }
        Ok(vault)
    }
}

impl Vault {
    /// Creates an empty, `Active` vault. Called by the registry, which has
    /// already verified the admin capability.
    pub(crate) fn new(
        asset: AssetId,
        config: VaultConfig,
        max_daily_withdrawal: u64,
        admin_cap_id: Uuid,
        credit_cap_id: Uuid,
        ctx: &TxContext,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        let daily_limit = DailyLimit::new(max_daily_withdrawal, ctx.day_index())?;
        Ok(Self {
            id: Uuid::new_v4(),
            asset,
            ledger: PoolLedger::default(),
            status: VaultStatus::Active,
            daily_limit,
            config,
            schema_version: CURRENT_SCHEMA_VERSION,
            admin_cap_id,
            credit_cap_id,
            created_at: ctx.now,
            updated_at: ctx.now,
        })
    }

    // -- Queries ------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn asset(&self) -> &AssetId {
        &self.asset
    }

    pub fn status(&self) -> VaultStatus {
        self.status
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn daily_limit(&self) -> &DailyLimit {
        &self.daily_limit
    }

    pub fn ledger(&self) -> &PoolLedger {
        &self.ledger
    }

    pub fn schema_version(&self) -> u64 {
        self.schema_version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn pool_balance(&self) -> u64 {
        self.ledger.pool_balance
    }

    pub fn borrowed_principal(&self) -> u64 {
        self.ledger.borrowed_principal
    }

    pub fn accrued_fees(&self) -> u64 {
        self.ledger.accrued_fees
    }

    /// `pool_balance + borrowed_principal`.
    pub fn total_assets(&self) -> u64 {
        // Deposits check the sum before committing, so this cannot saturate.
        self.ledger
            .pool_balance
            .saturating_add(self.ledger.borrowed_principal)
    }

    pub fn total_shares(&self) -> u64 {
        self.ledger.shares_outstanding
    }

    /// Shares `assets` would mint at the current rate (before fees).
    pub fn to_shares(&self, assets: u64) -> Result<u64, VaultError> {
        Ok(self.ledger.to_shares(assets)?)
    }

    /// Assets `shares` would redeem at the current rate (before fees).
    pub fn to_assets(&self, shares: u64) -> Result<u64, VaultError> {
        Ok(self.ledger.to_assets(shares)?)
    }

    /// Withdrawal quota left as of `ctx`.
    pub fn remaining_withdrawal_today(&self, ctx: &TxContext) -> u64 {
        self.daily_limit.remaining(ctx.day_index())
    }

    pub fn statistics(&self) -> VaultStatistics {
        let total_assets = self.total_assets();
        let borrowed = self.ledger.borrowed_principal;
        let utilization_bps = if total_assets == 0 {
            0
        } else {
            // borrowed <= total_assets, so this is at most 10_000.
            math::mul_div(borrowed, BPS_DENOMINATOR, total_assets).unwrap_or(BPS_DENOMINATOR)
        };
        VaultStatistics {
            total_assets,
            total_shares: self.ledger.shares_outstanding,
            borrowed,
            available: self.ledger.pool_balance,
            utilization_bps,
            accrued_fees: self.ledger.accrued_fees,
        }
    }

    /// Checks the ledger invariants. Used by tests and debug assertions.
    pub fn invariants_hold(&self) -> bool {
        let total = match self.ledger.total_assets() {
            Ok(t) => t,
            Err(_) => return false,
        };
        self.daily_limit.withdrawn_today() <= self.daily_limit.max_daily_withdrawal()
            && self.config.validate().is_ok()
            && (total != 0 || self.ledger.shares_outstanding == 0)
    }

    // -- User operations ----------------------------------------------------

    /// Deposits `assets` and returns the shares minted.
    ///
    /// # Errors
    ///
    /// - [`VaultError::SchemaVersionMismatch`] for a vault from another build.
    /// - [`VaultError::StatusViolation`] unless status permits deposits.
    /// - [`VaultError::ZeroAmount`] / [`VaultError::BelowMinimum`].
    /// - [`VaultError::ZeroShares`] if the net amount rounds to no shares.
    pub fn deposit(&mut self, assets: u64, ctx: &TxContext) -> Result<u64, VaultError> {
        self.check_schema()?;
        self.status.ensure(OperationClass::Deposit)?;

        let mut ledger = self.ledger;
        let shares = stage_deposit(&mut ledger, &self.config, assets)?;

        self.ledger = ledger;
        self.touch(ctx);
        tracing::debug!(vault = %self.id, asset = %self.asset, assets, shares, "deposit");
        Ok(shares)
    }

    /// Redeems `shares` and returns the assets paid out, net of the
    /// withdrawal fee.
    ///
    /// # Errors
    ///
    /// - [`VaultError::SchemaVersionMismatch`], [`VaultError::StatusViolation`].
    /// - [`VaultError::ZeroAmount`], [`VaultError::InsufficientShares`].
    /// - [`VaultError::BelowMinimum`] if the redeemed assets are under
    ///   `min_withdrawal`.
    /// - [`VaultError::DailyLimitExceeded`].
    /// - [`VaultError::InsufficientLiquidity`] if too much is lent out.
    pub fn withdraw(&mut self, shares: u64, ctx: &TxContext) -> Result<u64, VaultError> {
        self.check_schema()?;
        self.status.ensure(OperationClass::Withdraw)?;

        let mut ledger = self.ledger;
        let mut limit = self.daily_limit;
        let assets = stage_withdraw(&mut ledger, &mut limit, &self.config, shares, ctx)?;

        self.ledger = ledger;
        self.daily_limit = limit;
        self.touch(ctx);
        tracing::debug!(vault = %self.id, asset = %self.asset, shares, assets, "withdraw");
        Ok(assets)
    }

    // -- Credit subsystem ---------------------------------------------------

    /// Lends `amount` out of the pool to the credit subsystem.
    pub fn borrow(
        &mut self,
        cap: &CreditCap,
        amount: u64,
        ctx: &TxContext,
    ) -> Result<u64, VaultError> {
        cap.verify(&self.credit_cap_id)?;
        self.check_schema()?;
        self.status.ensure(OperationClass::Credit)?;

        let mut ledger = self.ledger;
        stage_borrow(&mut ledger, amount)?;

        self.ledger = ledger;
        self.touch(ctx);
        tracing::debug!(vault = %self.id, asset = %self.asset, amount, "borrow");
        Ok(amount)
    }

    /// Returns `amount` to the pool, retiring up to that much principal.
    ///
    /// Paying more than is owed is accepted: principal is clamped at zero
    /// and the excess is reported in the outcome and logged.
    pub fn repay(
        &mut self,
        cap: &CreditCap,
        amount: u64,
        ctx: &TxContext,
    ) -> Result<RepayOutcome, VaultError> {
        cap.verify(&self.credit_cap_id)?;
        self.check_schema()?;
        self.status.ensure(OperationClass::Credit)?;

        let mut ledger = self.ledger;
        let outcome = stage_repay(&mut ledger, amount)?;

        self.ledger = ledger;
        self.touch(ctx);
        self.log_repay(amount, &outcome);
        Ok(outcome)
    }

    /// Deposits and then borrows as one unit. The borrow is checked against
    /// the post-deposit pool. Returns `(shares, borrowed)`.
    pub fn deposit_and_borrow(
        &mut self,
        cap: &CreditCap,
        deposit_assets: u64,
        borrow_amount: u64,
        ctx: &TxContext,
    ) -> Result<(u64, u64), VaultError> {
        cap.verify(&self.credit_cap_id)?;
        self.check_schema()?;
        self.status.ensure(OperationClass::Deposit)?;
        self.status.ensure(OperationClass::Credit)?;

        let mut ledger = self.ledger;
        let shares = stage_deposit(&mut ledger, &self.config, deposit_assets)?;
        stage_borrow(&mut ledger, borrow_amount)?;

        self.ledger = ledger;
        self.touch(ctx);
        tracing::debug!(
            vault = %self.id,
            asset = %self.asset,
            deposit_assets,
            shares,
            borrow_amount,
            "deposit_and_borrow"
        );
        Ok((shares, borrow_amount))
    }

    /// Repays and then withdraws as one unit. The withdrawal is checked
    /// against the post-repay pool. Returns the repay outcome and the
    /// assets paid out.
    pub fn repay_and_withdraw(
        &mut self,
        cap: &CreditCap,
        repay_amount: u64,
        shares: u64,
        ctx: &TxContext,
    ) -> Result<(RepayOutcome, u64), VaultError> {
        cap.verify(&self.credit_cap_id)?;
        self.check_schema()?;
        self.status.ensure(OperationClass::Credit)?;
        self.status.ensure(OperationClass::Withdraw)?;

        let mut ledger = self.ledger;
        let mut limit = self.daily_limit;
        let outcome = stage_repay(&mut ledger, repay_amount)?;
        let assets = stage_withdraw(&mut ledger, &mut limit, &self.config, shares, ctx)?;

        self.ledger = ledger;
        self.daily_limit = limit;
        self.touch(ctx);
        self.log_repay(repay_amount, &outcome);
        tracing::debug!(
            vault = %self.id,
            asset = %self.asset,
            shares,
            assets,
            "repay_and_withdraw"
        );
        Ok((outcome, assets))
    }

    // -- Admin --------------------------------------------------------------

    /// `Active` → `Paused` (or any status → `Paused`).
    pub fn pause(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        self.transition(cap, VaultStatus::Paused, "pause", ctx)
    }

    /// Back to `Active`.
    pub fn resume(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        self.transition(cap, VaultStatus::Active, "resume", ctx)
    }

    pub fn deactivate(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        self.transition(cap, VaultStatus::Inactive, "deactivate", ctx)
    }

    pub fn set_deposits_only(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        self.transition(cap, VaultStatus::DepositsOnly, "set_deposits_only", ctx)
    }

    pub fn set_withdrawals_only(
        &mut self,
        cap: &AdminCap,
        ctx: &TxContext,
    ) -> Result<(), VaultError> {
        self.transition(cap, VaultStatus::WithdrawalsOnly, "set_withdrawals_only", ctx)
    }

    fn transition(
        &mut self,
        cap: &AdminCap,
        status: VaultStatus,
        action: &'static str,
        ctx: &TxContext,
    ) -> Result<(), VaultError> {
        self.admin_guard(cap)?;
        let previous = self.status;
        self.status = status;
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            action,
            from = %previous,
            to = %status,
            "vault status changed"
        );
        Ok(())
    }

    pub fn update_config(
        &mut self,
        cap: &AdminCap,
        config: VaultConfig,
        ctx: &TxContext,
    ) -> Result<(), VaultError> {
        self.admin_guard(cap)?;
        config.validate()?;
        self.config = config;
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            ?config,
            "config updated"
        );
        Ok(())
    }

    pub fn update_daily_limit(
        &mut self,
        cap: &AdminCap,
        max_daily_withdrawal: u64,
        ctx: &TxContext,
    ) -> Result<(), VaultError> {
        self.admin_guard(cap)?;
        self.daily_limit.set_max(max_daily_withdrawal)?;
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            max_daily_withdrawal,
            "daily limit updated"
        );
        Ok(())
    }

    pub fn reset_daily_limit(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        self.admin_guard(cap)?;
        let cleared = self.daily_limit.withdrawn_today();
        self.daily_limit.reset();
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            cleared,
            "daily limit reset"
        );
        Ok(())
    }

    /// Re-anchors the daily window at `ctx`'s day and zeroes the counter.
    pub fn force_update_day_counter(
        &mut self,
        cap: &AdminCap,
        ctx: &TxContext,
    ) -> Result<(), VaultError> {
        self.admin_guard(cap)?;
        let previous_day = self.daily_limit.current_day();
        self.daily_limit.force_day(ctx.day_index());
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            previous_day,
            day = ctx.day_index(),
            "day counter forced"
        );
        Ok(())
    }

    /// Break-glass: forces `Inactive`. Skips the schema check so it works
    /// on a vault this build otherwise refuses to touch.
    pub fn emergency_pause(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        cap.verify(&self.admin_cap_id)?;
        self.status = VaultStatus::Inactive;
        self.touch(ctx);
        tracing::warn!(target: AUDIT, vault = %self.id, asset = %self.asset, "emergency pause");
        Ok(())
    }

    /// [`emergency_pause`](Self::emergency_pause) plus exhausting today's
    /// withdrawal quota, so relaxing the status later does not reopen
    /// withdrawals before the next day (or an explicit reset).
    pub fn global_emergency_pause(
        &mut self,
        cap: &AdminCap,
        ctx: &TxContext,
    ) -> Result<(), VaultError> {
        cap.verify(&self.admin_cap_id)?;
        self.status = VaultStatus::Inactive;
        self.daily_limit.exhaust(ctx.day_index());
        self.touch(ctx);
        tracing::warn!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            "global emergency pause"
        );
        Ok(())
    }

    /// Drains the protocol's accrued fees and returns the amount.
    pub fn collect_fees(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<u64, VaultError> {
        self.admin_guard(cap)?;
        let amount = self.ledger.accrued_fees;
        self.ledger.accrued_fees = 0;
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            amount,
            "fees collected"
        );
        Ok(amount)
    }

    /// Raises the schema tag to [`CURRENT_SCHEMA_VERSION`]. The tag only
    /// ever increases.
    pub fn upgrade_schema(&mut self, cap: &AdminCap, ctx: &TxContext) -> Result<(), VaultError> {
        cap.verify(&self.admin_cap_id)?;
        if self.schema_version >= CURRENT_SCHEMA_VERSION {
            return Err(VaultError::NotUpgradeable {
                current: self.schema_version,
                target: CURRENT_SCHEMA_VERSION,
            });
        }
        let from = self.schema_version;
        self.schema_version = CURRENT_SCHEMA_VERSION;
        self.touch(ctx);
        tracing::info!(
            target: AUDIT,
            vault = %self.id,
            asset = %self.asset,
            from,
            to = CURRENT_SCHEMA_VERSION,
            "schema upgraded"
        );
        Ok(())
    }

    // -- Internals ----------------------------------------------------------

    fn check_schema(&self) -> Result<(), VaultError> {
        if self.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(VaultError::SchemaVersionMismatch {
                expected: CURRENT_SCHEMA_VERSION,
                found: self.schema_version,
            });
        }
        Ok(())
    }

    pub(crate) fn verify_admin(&self, cap: &AdminCap) -> Result<(), VaultError> {
        cap.verify(&self.admin_cap_id)
    }

    fn admin_guard(&self, cap: &AdminCap) -> Result<(), VaultError> {
        cap.verify(&self.admin_cap_id)?;
        self.check_schema()
    }

    fn touch(&mut self, ctx: &TxContext) {
        self.updated_at = ctx.now;
        debug_assert!(self.invariants_hold(), "vault invariants violated");
    }

    fn log_repay(&self, amount: u64, outcome: &RepayOutcome) {
        if outcome.excess > 0 {
            tracing::warn!(
                vault = %self.id,
                asset = %self.asset,
                amount,
                excess = outcome.excess,
                "repayment exceeded outstanding principal"
            );
        } else {
            tracing::debug!(vault = %self.id, asset = %self.asset, amount, "repay");
        }
    }
}

// ---------------------------------------------------------------------------
// Staged steps
// ---------------------------------------------------------------------------

fn stage_deposit(
    ledger: &mut PoolLedger,
    config: &VaultConfig,
    assets: u64,
) -> Result<u64, VaultError> {
    if assets == 0 {
        return Err(VaultError::ZeroAmount);
    }
    if assets < config.min_deposit {
        return Err(VaultError::BelowMinimum {
            amount: assets,
            minimum: config.min_deposit,
        });
    }

    let fee = math::bps_of(assets, config.deposit_fee_bps)?;
    let net = math::sub(assets, fee)?;
    let shares = ledger.to_shares(net)?;
    if shares == 0 {
        return Err(VaultError::ZeroShares { assets: net });
    }

    // Keep total_assets representable, not just pool_balance.
    math::add(ledger.total_assets()?, net)?;

    ledger.pool_balance = math::add(ledger.pool_balance, net)?;
    ledger.accrued_fees = math::add(ledger.accrued_fees, fee)?;
    ledger.shares_outstanding = math::add(ledger.shares_outstanding, shares)?;
    Ok(shares)
}

fn stage_withdraw(
    ledger: &mut PoolLedger,
    limit: &mut DailyLimit,
    config: &VaultConfig,
    shares: u64,
    ctx: &TxContext,
) -> Result<u64, VaultError> {
    if shares == 0 {
        return Err(VaultError::ZeroAmount);
    }
    if shares > ledger.shares_outstanding {
        return Err(VaultError::InsufficientShares {
            requested: shares,
            outstanding: ledger.shares_outstanding,
        });
    }

    let gross = ledger.to_assets(shares)?;
    if gross == 0 {
        return Err(VaultError::ZeroAmount);
    }
    if gross < config.min_withdrawal {
        return Err(VaultError::BelowMinimum {
            amount: gross,
            minimum: config.min_withdrawal,
        });
    }

    limit.consume(gross, ctx.day_index())?;

    if ledger.pool_balance < gross {
        return Err(VaultError::InsufficientLiquidity {
            requested: gross,
            available: ledger.pool_balance,
        });
    }

    let fee = math::bps_of(gross, config.withdrawal_fee_bps)?;
    ledger.shares_outstanding = math::sub(ledger.shares_outstanding, shares)?;
    ledger.pool_balance = math::sub(ledger.pool_balance, gross)?;
    ledger.accrued_fees = math::add(ledger.accrued_fees, fee)?;
    Ok(math::sub(gross, fee)?)
}

fn stage_borrow(ledger: &mut PoolLedger, amount: u64) -> Result<(), VaultError> {
    if amount == 0 {
        return Err(VaultError::ZeroAmount);
    }
    if ledger.pool_balance < amount {
        return Err(VaultError::InsufficientLiquidity {
            requested: amount,
            available: ledger.pool_balance,
        });
    }
    ledger.pool_balance = math::sub(ledger.pool_balance, amount)?;
    ledger.borrowed_principal = math::add(ledger.borrowed_principal, amount)?;
    Ok(())
}

fn stage_repay(ledger: &mut PoolLedger, amount: u64) -> Result<RepayOutcome, VaultError> {
    if amount == 0 {
        return Err(VaultError::ZeroAmount);
    }
    let principal_repaid = amount.min(ledger.borrowed_principal);
    ledger.pool_balance = math::add(ledger.pool_balance, amount)?;
    ledger.borrowed_principal = math::sub(ledger.borrowed_principal, principal_repaid)?;
    // The excess raises total_assets; make sure that is still representable.
    ledger.total_assets()?;
    Ok(RepayOutcome {
        principal_repaid,
        excess: amount - principal_repaid,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
