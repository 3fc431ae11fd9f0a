// Vault hot-path benchmarks for Reservoir.
//
// Covers share conversions at a skewed exchange rate, a deposit/withdraw
// round trip, and a health-factor evaluation against the manual oracle.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use reservoir_protocol::config::VaultConfig;
use reservoir_protocol::oracle::{ManualOracle, PriceQuote};
use reservoir_protocol::risk::{Position, RiskEngine};
use reservoir_protocol::vault::{AssetId, VaultRegistry};
use reservoir_protocol::TxContext;

fn usdc() -> AssetId {
    AssetId::new("USDC").unwrap()
}

fn bench_share_conversion(c: &mut Criterion) {
    let ctx = TxContext::from_millis(1_700_000_000_000);
    let (mut registry, admin, credit) = VaultRegistry::initialize();
    registry
        .create_vault(&admin, usdc(), VaultConfig::default(), u64::MAX, &ctx)
        .unwrap();
    let vault = registry.vault_mut(&usdc()).unwrap();
    vault.deposit(1_000_000_007, &ctx).unwrap();
    vault.repay(&credit, 3_333_331, &ctx).unwrap();

    let mut group = c.benchmark_group("vault/convert");
    for amount in [1u64, 1_000, 1_000_000_000] {
        group.bench_with_input(BenchmarkId::new("to_shares", amount), &amount, |b, &a| {
            b.iter(|| vault.to_shares(black_box(a)));
        });
        group.bench_with_input(BenchmarkId::new("to_assets", amount), &amount, |b, &a| {
            b.iter(|| vault.to_assets(black_box(a)));
        });
    }
    group.finish();
}

fn bench_deposit_withdraw(c: &mut Criterion) {
    let ctx = TxContext::from_millis(1_700_000_000_000);
    let (mut registry, admin, _) = VaultRegistry::initialize();
    let config = VaultConfig {
        deposit_fee_bps: 10,
        withdrawal_fee_bps: 10,
        ..VaultConfig::default()
    };
    registry
        .create_vault(&admin, usdc(), config, u64::MAX, &ctx)
        .unwrap();
    let vault = registry.vault_mut(&usdc()).unwrap();
    vault.deposit(10_000_000, &ctx).unwrap();

    let mut group = c.benchmark_group("vault/round_trip");
    group.throughput(Throughput::Elements(2));
    group.bench_function("deposit_withdraw", |b| {
        b.iter(|| {
            let shares = vault.deposit(black_box(50_000), &ctx).unwrap();
            vault.withdraw(shares, &ctx).unwrap()
        });
    });
    group.finish();
}

fn bench_health_factor(c: &mut Criterion) {
    let now = 1_700_000_000;
    let ctx = TxContext::from_millis(now as u64 * 1_000);
    let weth = AssetId::new("WETH").unwrap();
    let mut oracle = ManualOracle::new();
    oracle.set_price(
        weth.clone(),
        PriceQuote {
            price: 3_000_000_000,
            confidence: 1_000_000,
            timestamp: now,
            decimals: 6,
            valid: true,
        },
    );
    let engine = RiskEngine::new(&oracle);
    let position = Position {
        asset: weth,
        collateral_amount: 2_000_000_000_000_000_000,
        collateral_decimals: 18,
        debt_usd: 4_000_000_000,
        liquidation_threshold_bps: 8_250,
    };

    c.bench_function("risk/position_health", |b| {
        b.iter(|| engine.calculate_position_health(black_box(&position), &ctx));
    });
}

criterion_group!(
    benches,
    bench_share_conversion,
    bench_deposit_withdraw,
    bench_health_factor
);
criterion_main!(benches);
