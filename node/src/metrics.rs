//! # Prometheus Metrics
//!
//! Exposes operational metrics for the node. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

use reservoir_protocol::vault::VaultRegistry;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Accepted deposits (including the deposit leg of composites).
    pub deposits_total: IntCounter,
    /// Accepted withdrawals (including the withdraw leg of composites).
    pub withdrawals_total: IntCounter,
    /// Accepted borrows.
    pub borrows_total: IntCounter,
    /// Accepted repayments.
    pub repays_total: IntCounter,
    /// Operations refused by the protocol, for any reason.
    pub rejected_operations_total: IntCounter,
    /// Sum of `total_assets` across every vault.
    pub total_assets: IntGauge,
    /// Sum of `borrowed_principal` across every vault.
    pub total_borrowed: IntGauge,
    /// Number of registered vaults.
    pub vaults: IntGauge,
    /// Histogram of API request latency in seconds.
    pub request_latency_seconds: Histogram,
}

fn register<C>(registry: &Registry, metric: C) -> prometheus::Result<C>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("reservoir".into()), None)?;

        let deposits_total = register(
            &registry,
            IntCounter::new("deposits_total", "Total number of accepted deposits")?,
        )?;
        let withdrawals_total = register(
            &registry,
            IntCounter::new("withdrawals_total", "Total number of accepted withdrawals")?,
        )?;
        let borrows_total = register(
            &registry,
            IntCounter::new("borrows_total", "Total number of accepted borrows")?,
        )?;
        let repays_total = register(
            &registry,
            IntCounter::new("repays_total", "Total number of accepted repayments")?,
        )?;
        let rejected_operations_total = register(
            &registry,
            IntCounter::new(
                "rejected_operations_total",
                "Total number of operations rejected by the protocol",
            )?,
        )?;
        let total_assets = register(
            &registry,
            IntGauge::new("total_assets", "Sum of total assets across all vaults")?,
        )?;
        let total_borrowed = register(
            &registry,
            IntGauge::new("total_borrowed", "Sum of borrowed principal across all vaults")?,
        )?;
        let vaults = register(
            &registry,
            IntGauge::new("vaults", "Number of registered vaults")?,
        )?;
        let request_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "request_latency_seconds",
                    "API request handling latency in seconds",
                )
                .buckets(vec![
                    0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            deposits_total,
            withdrawals_total,
            borrows_total,
            repays_total,
            rejected_operations_total,
            total_assets,
            total_borrowed,
            vaults,
            request_latency_seconds,
        })
    }

    /// Refreshes the book-level gauges from the registry.
    pub fn observe_registry(&self, registry: &VaultRegistry) {
        let (assets, borrowed) = registry.vaults().fold((0u128, 0u128), |(a, b), v| {
            (
                a + u128::from(v.total_assets()),
                b + u128::from(v.borrowed_principal()),
            )
        });
        self.total_assets.set(clamp_i64(assets));
        self.total_borrowed.set(clamp_i64(borrowed));
        self.vaults.set(clamp_i64(registry.len() as u128));
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn clamp_i64(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

/// Middleware that times every API request into `request_latency_seconds`.
pub async fn track_latency(
    State(metrics): State<SharedMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let timer = metrics.request_latency_seconds.start_timer();
    let response = next.run(request).await;
    timer.observe_duration();
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use reservoir_protocol::config::VaultConfig;
    use reservoir_protocol::vault::AssetId;
    use reservoir_protocol::TxContext;

    #[test]
    fn encodes_with_namespace() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.deposits_total.inc();
        let text = metrics.encode().unwrap();
        assert!(text.contains("reservoir_deposits_total 1"));
        assert!(text.contains("reservoir_request_latency_seconds_bucket"));
    }

    #[test]
    fn gauges_follow_registry() {
        let metrics = NodeMetrics::new().unwrap();
        let ctx = TxContext::now();
        let (mut registry, admin, credit) = VaultRegistry::initialize();
        let usdc = AssetId::new("USDC").unwrap();
        registry
            .create_vault(&admin, usdc.clone(), VaultConfig::default(), 1_000, &ctx)
            .unwrap();
        let vault = registry.vault_mut(&usdc).unwrap();
        vault.deposit(500, &ctx).unwrap();
        vault.borrow(&credit, 200, &ctx).unwrap();

        metrics.observe_registry(&registry);
        assert_eq!(metrics.total_assets.get(), 500);
        assert_eq!(metrics.total_borrowed.get(), 200);
        assert_eq!(metrics.vaults.get(), 1);
    }
}
