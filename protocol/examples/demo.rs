//! Terminal walkthrough of a Reservoir vault's lifecycle.
//!
//! Creates a registry, deposits into a USDC vault, lends against it, trips
//! the daily withdrawal limit, checks a WBTC collateral position against a
//! manual price feed, and finally pulls the global emergency brake.
//!
//! Run with:
//!   cargo run --example demo

use chrono::TimeZone;

use reservoir_protocol::config::{VaultConfig, MS_PER_DAY, PRECISION};
use reservoir_protocol::oracle::{ManualOracle, PriceQuote};
use reservoir_protocol::risk::{Position, RiskEngine};
use reservoir_protocol::vault::{AssetId, Vault, VaultRegistry};
use reservoir_protocol::TxContext;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

fn section(title: &str) {
    println!();
    println!("{BOLD}{CYAN}== {title} =={RESET}");
}

fn ok(msg: impl std::fmt::Display) {
    println!("  {GREEN}✓{RESET} {msg}");
}

fn refused(msg: impl std::fmt::Display) {
    println!("  {RED}✗{RESET} {msg}");
}

fn books(vault: &Vault) {
    let s = vault.statistics();
    println!(
        "  {DIM}assets={} shares={} borrowed={} available={} utilization={}bps fees={}{RESET}",
        s.total_assets, s.total_shares, s.borrowed, s.available, s.utilization_bps, s.accrued_fees
    );
}

fn fixed(value: u128) -> String {
    format!("{}.{:09}", value / PRECISION, value % PRECISION)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let day0 = chrono::Utc
        .with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .ok_or("bad start date")?;
    let ctx = TxContext::at(day0);

    println!("{BOLD}Reservoir{RESET} {DIM}pooled-asset vault walkthrough{RESET}");

    section("Registry");
    let (mut registry, admin, credit) = VaultRegistry::initialize();
    let usdc = AssetId::new("usdc")?;
    let config = VaultConfig {
        withdrawal_fee_bps: 30,
        ..VaultConfig::default()
    };
    registry.create_vault(&admin, usdc.clone(), config, 2_000, &ctx)?;
    ok(format!("vault for {usdc} created, 30bps withdrawal fee, 2000/day cap"));

    section("Deposits and credit");
    let vault = registry.vault_mut(&usdc)?;
    let shares = vault.deposit(10_000, &ctx)?;
    ok(format!("deposited 10000, minted {shares} shares"));
    vault.borrow(&credit, 6_000, &ctx)?;
    ok("credit line drew 6000");
    books(vault);

    section("Daily withdrawal limit");
    let out = vault.withdraw(1_500, &ctx)?;
    ok(format!("redeemed 1500 shares for {out} after fee"));
    match vault.withdraw(1_000, &ctx) {
        Ok(_) => ok("second withdrawal accepted"),
        Err(e) => refused(e),
    }
    let tomorrow = TxContext::from_millis(ctx.timestamp_ms() + MS_PER_DAY);
    let out = vault.withdraw(1_000, &tomorrow)?;
    ok(format!("next day: redeemed 1000 shares for {out}"));

    let outcome = vault.repay(&credit, 6_250, &tomorrow)?;
    ok(format!(
        "repaid {} principal, {} excess left in the pool",
        outcome.principal_repaid, outcome.excess
    ));
    let fees = vault.collect_fees(&admin, &tomorrow)?;
    ok(format!("collected {fees} in fees"));
    books(vault);

    section("Collateral risk");
    let wbtc = AssetId::new("WBTC")?;
    let mut oracle = ManualOracle::new();
    oracle.set_price(
        wbtc.clone(),
        PriceQuote {
            price: 60_000_000_000,
            confidence: 30_000_000,
            timestamp: tomorrow.now.timestamp(),
            decimals: 6,
            valid: true,
        },
    );
    let position = Position {
        asset: wbtc,
        collateral_amount: 100_000_000,
        collateral_decimals: 8,
        debt_usd: 45_000_000_000,
        liquidation_threshold_bps: 8_000,
    };
    let engine = RiskEngine::new(&oracle);
    let health = engine.calculate_position_health(&position, &tomorrow);
    let colour = if health.is_healthy { GREEN } else { YELLOW };
    println!(
        "  health factor {colour}{}{RESET} ({:?})",
        fixed(health.health_factor),
        health.status
    );
    let liq = engine.check_liquidation_eligibility(&position, &tomorrow);
    println!("  liquidatable: {} (max {})", liq.eligible, liq.max_liquidation_usd);

    let stale = TxContext::from_millis(tomorrow.timestamp_ms() + 120_000);
    let health = engine.calculate_position_health(&position, &stale);
    refused(format!(
        "two minutes later the feed is stale: {:?}, health {}",
        health.status,
        fixed(health.health_factor)
    ));

    section("Emergency");
    let paused = registry.global_emergency_pause(&admin, &tomorrow)?;
    ok(format!("global emergency pause hit {paused} vault(s)"));
    let vault = registry.vault_mut(&usdc)?;
    match vault.deposit(100, &tomorrow) {
        Ok(_) => ok("deposit accepted"),
        Err(e) => refused(e),
    }
    println!("  status: {:?}", vault.status());
    Ok(())
}
