//! Risk engine integration tests against the manual oracle.
//!
//! The engine is exercised the way the credit subsystem would use it: a
//! position in, a result struct out, and the status field checked before
//! any number is trusted.

use reservoir_protocol::config::{MIN_HEALTH_FACTOR, PRECISION};
use reservoir_protocol::oracle::{ManualOracle, OracleFault, PriceOracle, PriceQuote};
use reservoir_protocol::risk::{Position, RiskEngine, RiskStatus};
use reservoir_protocol::vault::AssetId;
use reservoir_protocol::TxContext;

const NOW: i64 = 1_750_000_000;

fn ctx_at(secs: i64) -> TxContext {
    TxContext::from_millis(secs as u64 * 1_000)
}

fn wbtc() -> AssetId {
    AssetId::new("WBTC").unwrap()
}

/// WBTC at $60,000 with 8 decimals on the collateral side and a 6-decimal
/// USD price.
fn oracle() -> ManualOracle {
    let mut oracle = ManualOracle::new();
    oracle.set_price(
        wbtc(),
        PriceQuote {
            price: 60_000_000_000,
            confidence: 30_000_000,
            timestamp: NOW,
            decimals: 6,
            valid: true,
        },
    );
    oracle
}

fn position(collateral_sats: u128, debt_usd: u128) -> Position {
    Position {
        asset: wbtc(),
        collateral_amount: collateral_sats,
        collateral_decimals: 8,
        debt_usd,
        liquidation_threshold_bps: 8_000,
    }
}

#[test]
fn one_btc_against_forty_thousand_is_healthy() {
    let oracle = oracle();
    let engine = RiskEngine::new(&oracle);

    // 1 BTC = $60k, 80% counts = $48k, debt $40k -> HF 1.2.
    let health =
        engine.calculate_position_health(&position(100_000_000, 40_000_000_000), &ctx_at(NOW));
    assert_eq!(health.status, RiskStatus::Computed);
    assert_eq!(health.collateral_usd, 60_000_000_000);
    assert_eq!(health.health_factor, 12 * PRECISION / 10);
    assert!(health.is_healthy);
}

#[test]
fn price_drop_makes_position_liquidatable() {
    let mut oracle = oracle();
    let engine_before = RiskEngine::new(&oracle);
    let pos = position(100_000_000, 40_000_000_000);
    assert!(!engine_before.check_liquidation_eligibility(&pos, &ctx_at(NOW)).eligible);

    oracle.set_price(
        wbtc(),
        PriceQuote {
            price: 45_000_000_000,
            confidence: 10_000_000,
            timestamp: NOW + 30,
            decimals: 6,
            valid: true,
        },
    );
    let engine = RiskEngine::new(&oracle);
    let liq = engine.check_liquidation_eligibility(&pos, &ctx_at(NOW + 30));
    assert_eq!(liq.status, RiskStatus::Computed);
    assert!(liq.eligible);
    assert!(liq.health_factor < MIN_HEALTH_FACTOR);
    // min($45k, $40k) / 2
    assert_eq!(liq.max_liquidation_usd, 20_000_000_000);
}

#[test]
fn capacity_shrinks_as_debt_grows() {
    let oracle = oracle();
    let engine = RiskEngine::new(&oracle);

    let fresh = engine.calculate_borrowing_capacity(&position(50_000_000, 0), &ctx_at(NOW));
    assert_eq!(fresh.max_borrow_usd, 24_000_000_000);
    assert_eq!(fresh.available_borrow_usd, 24_000_000_000);

    let used =
        engine.calculate_borrowing_capacity(&position(50_000_000, 20_000_000_000), &ctx_at(NOW));
    assert_eq!(used.available_borrow_usd, 4_000_000_000);
}

fn assert_fails_closed(oracle: &ManualOracle, now: i64, expected: impl Fn(&RiskStatus) -> bool) {
    let engine = RiskEngine::new(oracle);
    let ctx = ctx_at(now);
    let pos = position(100_000_000, 1);
    assert!(!engine.is_oracle_safe(&wbtc(), &ctx));

    let health = engine.calculate_position_health(&pos, &ctx);
    assert!(expected(&health.status), "unexpected status {:?}", health.status);
    assert_eq!(health.health_factor, 0);
    assert!(!health.is_healthy);

    assert!(!engine.check_liquidation_eligibility(&pos, &ctx).eligible);
    assert_eq!(
        engine
            .calculate_borrowing_capacity(&pos, &ctx)
            .available_borrow_usd,
        0
    );
}

#[test]
fn every_gate_condition_fails_closed() {
    let base = oracle();

    let mut paused = base.clone();
    paused.pause();
    assert_fails_closed(&paused, NOW, |s| {
        *s == RiskStatus::OracleUnsafe(OracleFault::Paused)
    });

    assert_fails_closed(&ManualOracle::new(), NOW, |s| {
        *s == RiskStatus::OracleUnsafe(OracleFault::NoFeed)
    });

    assert_fails_closed(&base, NOW + 61, |s| {
        matches!(s, RiskStatus::OracleUnsafe(OracleFault::Stale { .. }))
    });

    assert_fails_closed(&base, NOW - 6, |s| {
        matches!(s, RiskStatus::OracleUnsafe(OracleFault::FutureTimestamp { .. }))
    });

    let mut wide = base.clone();
    let mut q = wide.get_price(&wbtc()).unwrap();
    q.confidence = q.price / 10;
    wide.set_price(wbtc(), q);
    assert_fails_closed(&wide, NOW, |s| {
        matches!(s, RiskStatus::OracleUnsafe(OracleFault::ConfidenceTooWide { .. }))
    });

    let mut invalid = base.clone();
    let mut q = invalid.get_price(&wbtc()).unwrap();
    q.valid = false;
    invalid.set_price(wbtc(), q);
    assert_fails_closed(&invalid, NOW, |s| {
        *s == RiskStatus::OracleUnsafe(OracleFault::InvalidQuote)
    });
}

#[test]
fn engine_works_through_a_trait_object() {
    let oracle = oracle();
    let dyn_oracle: &dyn PriceOracle = &oracle;
    let engine = RiskEngine::new(dyn_oracle);
    assert!(engine.is_oracle_safe(&wbtc(), &ctx_at(NOW)));
}
