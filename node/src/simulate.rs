//! # Script Replay
//!
//! `reservoir-node simulate <script.json>` builds a fresh registry, replays
//! a list of operations against it on a simulated clock, and prints a JSON
//! report: how many steps were accepted, why the others were refused, and
//! the final books of every vault.
//!
//! ```json
//! {
//!   "start_ms": 1700000000000,
//!   "vaults": [{ "asset": "USDC", "max_daily_withdrawal": 5000 }],
//!   "steps": [
//!     { "op": "deposit", "asset": "USDC", "assets": 1000 },
//!     { "op": "borrow", "asset": "USDC", "amount": 400 },
//!     { "op": "advance", "ms": 86400000 },
//!     { "op": "withdraw", "asset": "USDC", "shares": 500 }
//!   ]
//! }
//! ```
//!
//! A rejected step is recorded and replay continues; the protocol
//! guarantees the rejected step changed nothing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use reservoir_protocol::config::VaultConfig;
use reservoir_protocol::vault::{
    AssetId, DailyLimit, VaultError, VaultRegistry, VaultStatistics, VaultStatus,
};
use reservoir_protocol::{AdminCap, CreditCap, TxContext};

/// Default simulated start: 2024-01-01T00:00:00Z.
const DEFAULT_START_MS: u64 = 1_704_067_200_000;

/// Daily limit for script vaults that don't specify one.
const DEFAULT_MAX_DAILY_WITHDRAWAL: u64 = u64::MAX;

#[derive(Debug, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub start_ms: Option<u64>,
    pub vaults: Vec<VaultSetup>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct VaultSetup {
    pub asset: AssetId,
    #[serde(default)]
    pub config: Option<VaultConfig>,
    #[serde(default)]
    pub max_daily_withdrawal: Option<u64>,
}

/// One scripted operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Deposit { asset: AssetId, assets: u64 },
    Withdraw { asset: AssetId, shares: u64 },
    Borrow { asset: AssetId, amount: u64 },
    Repay { asset: AssetId, amount: u64 },
    DepositAndBorrow {
        asset: AssetId,
        deposit_assets: u64,
        borrow_amount: u64,
    },
    RepayAndWithdraw {
        asset: AssetId,
        repay_amount: u64,
        shares: u64,
    },
    SetStatus { asset: AssetId, status: VaultStatus },
    UpdateConfig { asset: AssetId, config: VaultConfig },
    UpdateDailyLimit { asset: AssetId, max_daily_withdrawal: u64 },
    ResetDailyLimit { asset: AssetId },
    ForceDay { asset: AssetId },
    EmergencyPause { asset: AssetId },
    GlobalEmergencyPause,
    CollectFees { asset: AssetId },
    /// Moves the simulated clock forward.
    Advance { ms: u64 },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::Borrow { .. } => "borrow",
            Step::Repay { .. } => "repay",
            Step::DepositAndBorrow { .. } => "deposit_and_borrow",
            Step::RepayAndWithdraw { .. } => "repay_and_withdraw",
            Step::SetStatus { .. } => "set_status",
            Step::UpdateConfig { .. } => "update_config",
            Step::UpdateDailyLimit { .. } => "update_daily_limit",
            Step::ResetDailyLimit { .. } => "reset_daily_limit",
            Step::ForceDay { .. } => "force_day",
            Step::EmergencyPause { .. } => "emergency_pause",
            Step::GlobalEmergencyPause => "global_emergency_pause",
            Step::CollectFees { .. } => "collect_fees",
            Step::Advance { .. } => "advance",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Rejection {
    pub step: usize,
    pub op: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct VaultReport {
    pub asset: AssetId,
    pub status: VaultStatus,
    pub statistics: VaultStatistics,
    pub daily_limit: DailyLimit,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub steps: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
    pub final_time_ms: u64,
    pub vaults: Vec<VaultReport>,
}

/// Reads and replays the script at `path`.
pub fn simulate_file(path: &Path) -> Result<SimulationReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse script {}", path.display()))?;
    run_script(&script)
}

/// Replays `script` against a fresh registry.
///
/// # Errors
///
/// Fails only if the script's vault list itself cannot be set up. Step
/// rejections are reported, not returned.
pub fn run_script(script: &Script) -> Result<SimulationReport> {
    let (mut registry, admin, credit) = VaultRegistry::initialize();
    let mut clock = script.start_ms.unwrap_or(DEFAULT_START_MS);

    for setup in &script.vaults {
        registry
            .create_vault(
                &admin,
                setup.asset.clone(),
                setup.config.unwrap_or_default(),
                setup.max_daily_withdrawal.unwrap_or(DEFAULT_MAX_DAILY_WITHDRAWAL),
                &TxContext::from_millis(clock),
            )
            .with_context(|| format!("failed to create vault for {}", setup.asset))?;
    }

    let mut rejections = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        if let Step::Advance { ms } = step {
            clock = clock.saturating_add(*ms);
            continue;
        }
        let ctx = TxContext::from_millis(clock);
        if let Err(err) = apply(&mut registry, &admin, &credit, step, &ctx) {
            tracing::debug!(step = index, op = step.name(), error = %err, "step rejected");
            rejections.push(Rejection {
                step: index,
                op: step.name(),
                error: err.to_string(),
            });
        }
    }

    let vaults = registry
        .vaults()
        .map(|v| VaultReport {
            asset: v.asset().clone(),
            status: v.status(),
            statistics: v.statistics(),
            daily_limit: *v.daily_limit(),
        })
        .collect();

    let rejected = rejections.len();
    Ok(SimulationReport {
        steps: script.steps.len(),
        accepted: script.steps.len() - rejected,
        rejected,
        rejections,
        final_time_ms: clock,
        vaults,
    })
}

fn apply(
    registry: &mut VaultRegistry,
    admin: &AdminCap,
    credit: &CreditCap,
    step: &Step,
    ctx: &TxContext,
) -> Result<(), VaultError> {
    match step {
        Step::Deposit { asset, assets } => {
            registry.vault_mut(asset)?.deposit(*assets, ctx)?;
        }
        Step::Withdraw { asset, shares } => {
            registry.vault_mut(asset)?.withdraw(*shares, ctx)?;
        }
        Step::Borrow { asset, amount } => {
            registry.vault_mut(asset)?.borrow(credit, *amount, ctx)?;
        }
        Step::Repay { asset, amount } => {
            registry.vault_mut(asset)?.repay(credit, *amount, ctx)?;
        }
        Step::DepositAndBorrow {
            asset,
            deposit_assets,
            borrow_amount,
        } => {
            registry
                .vault_mut(asset)?
                .deposit_and_borrow(credit, *deposit_assets, *borrow_amount, ctx)?;
        }
        Step::RepayAndWithdraw {
            asset,
            repay_amount,
            shares,
        } => {
            registry
                .vault_mut(asset)?
                .repay_and_withdraw(credit, *repay_amount, *shares, ctx)?;
        }
        Step::SetStatus { asset, status } => {
            let vault = registry.vault_mut(asset)?;
            match status {
                VaultStatus::Active => vault.resume(admin, ctx)?,
                VaultStatus::Paused => vault.pause(admin, ctx)?,
                VaultStatus::DepositsOnly => vault.set_deposits_only(admin, ctx)?,
                VaultStatus::WithdrawalsOnly => vault.set_withdrawals_only(admin, ctx)?,
                VaultStatus::Inactive => vault.deactivate(admin, ctx)?,
            }
        }
        Step::UpdateConfig { asset, config } => {
            registry.vault_mut(asset)?.update_config(admin, *config, ctx)?;
        }
        Step::UpdateDailyLimit {
            asset,
            max_daily_withdrawal,
        } => {
            registry
                .vault_mut(asset)?
                .update_daily_limit(admin, *max_daily_withdrawal, ctx)?;
        }
        Step::ResetDailyLimit { asset } => {
            registry.vault_mut(asset)?.reset_daily_limit(admin, ctx)?;
        }
        Step::ForceDay { asset } => {
            registry
                .vault_mut(asset)?
                .force_update_day_counter(admin, ctx)?;
        }
        Step::EmergencyPause { asset } => {
            registry.vault_mut(asset)?.emergency_pause(admin, ctx)?;
        }
        Step::GlobalEmergencyPause => {
            registry.global_emergency_pause(admin, ctx)?;
        }
        Step::CollectFees { asset } => {
            registry.vault_mut(asset)?.collect_fees(admin, ctx)?;
        }
        Step::Advance { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn script(json: serde_json::Value) -> Script {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn replays_lending_scenario() {
        let report = run_script(&script(serde_json::json!({
            "vaults": [{ "asset": "usdc" }],
            "steps": [
                { "op": "deposit", "asset": "USDC", "assets": 1000 },
                { "op": "borrow", "asset": "USDC", "amount": 400 },
                { "op": "withdraw", "asset": "USDC", "shares": 500 }
            ]
        })))
        .unwrap();

        assert_eq!(report.accepted, 3);
        assert_eq!(report.rejected, 0);
        let usdc = &report.vaults[0];
        assert_eq!(usdc.statistics.available, 100);
        assert_eq!(usdc.statistics.borrowed, 400);
        assert_eq!(usdc.statistics.total_shares, 500);
    }

    #[test]
    fn rejections_are_reported_and_replay_continues() {
        let report = run_script(&script(serde_json::json!({
            "vaults": [{ "asset": "USDC", "max_daily_withdrawal": 100 }],
            "steps": [
                { "op": "deposit", "asset": "USDC", "assets": 1000 },
                { "op": "withdraw", "asset": "USDC", "shares": 150 },
                { "op": "deposit", "asset": "DAI", "assets": 1 },
                { "op": "advance", "ms": 86400000 },
                { "op": "withdraw", "asset": "USDC", "shares": 100 }
            ]
        })))
        .unwrap();

        assert_eq!(report.rejected, 2);
        assert_eq!(report.rejections[0].step, 1);
        assert_eq!(report.rejections[0].op, "withdraw");
        assert!(report.rejections[1].error.contains("DAI"));
        assert_eq!(report.vaults[0].statistics.available, 900);
    }

    #[test]
    fn global_pause_in_script() {
        let report = run_script(&script(serde_json::json!({
            "vaults": [{ "asset": "USDC" }, { "asset": "WETH" }],
            "steps": [
                { "op": "deposit", "asset": "WETH", "assets": 10 },
                { "op": "global_emergency_pause" },
                { "op": "set_status", "asset": "WETH", "status": "Active" },
                { "op": "withdraw", "asset": "WETH", "shares": 1 }
            ]
        })))
        .unwrap();

        assert_eq!(report.rejected, 1);
        let usdc = report
            .vaults
            .iter()
            .find(|v| v.asset.as_str() == "USDC")
            .unwrap();
        assert_eq!(usdc.status, VaultStatus::Inactive);
    }

    #[test]
    fn duplicate_vault_in_script_is_an_error() {
        let result = run_script(&script(serde_json::json!({
            "vaults": [{ "asset": "USDC" }, { "asset": "usdc" }],
            "steps": []
        })));
        assert!(result.is_err());
    }

    #[test]
    fn simulate_file_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!({
            "vaults": [{ "asset": "USDC" }],
            "steps": [{ "op": "deposit", "asset": "USDC", "assets": 5 }]
        });
        write!(file, "{body}").unwrap();
        let report = simulate_file(file.path()).unwrap();
        assert_eq!(report.accepted, 1);
        assert_eq!(report.vaults[0].statistics.total_assets, 5);
    }
}
