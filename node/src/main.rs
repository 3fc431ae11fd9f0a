// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Reservoir Node
//!
//! Entry point for the `reservoir-node` binary. Parses CLI arguments,
//! initializes logging and metrics, builds the vault registry, and serves
//! the HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`      start the node
//! - `simulate` replay a JSON operation script and print a report
//! - `version`  print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use reservoir_protocol::config::CURRENT_SCHEMA_VERSION;
use reservoir_protocol::vault::{AssetId, VaultRegistry};
use reservoir_protocol::{Capability, TxContext};

use cli::{Commands, ReservoirCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ReservoirCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Simulate(args) => run_simulation(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format);

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        assets = ?args.assets,
        "starting reservoir-node"
    );

    let defaults = api::VaultDefaults {
        config: args.vault_config(),
        max_daily_withdrawal: args.max_daily_withdrawal,
    };
    defaults
        .config
        .validate()
        .context("invalid default vault configuration")?;

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Registry ---
    let (mut registry, admin_cap, credit_cap) = VaultRegistry::initialize();
    let ctx = TxContext::now();
    for raw in &args.assets {
        let asset: AssetId = raw
            .parse()
            .with_context(|| format!("invalid asset type {:?}", raw))?;
        registry
            .create_vault(
                &admin_cap,
                asset.clone(),
                defaults.config,
                defaults.max_daily_withdrawal,
                &ctx,
            )
            .with_context(|| format!("failed to create vault for {}", asset))?;
    }

    // The bearer tokens are only ever shown here.
    tracing::info!(
        target: "reservoir::audit",
        admin_token = %admin_cap.id(),
        credit_token = %credit_cap.id(),
        "capabilities issued"
    );

    // --- Application state ---
    let app_state = api::AppState::new(
        format!(
            "{} (schema {})",
            env!("CARGO_PKG_VERSION"),
            CURRENT_SCHEMA_VERSION,
        ),
        registry,
        admin_cap,
        credit_cap,
        defaults,
        Arc::clone(&node_metrics),
    );

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("reservoir-node stopped");
    Ok(())
}

/// Replays a script and prints the JSON report to stdout.
fn run_simulation(args: cli::SimulateArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_DIRECTIVES, args.log_format);

    let report = simulate::simulate_file(&args.script)?;
    tracing::info!(
        steps = report.steps,
        accepted = report.accepted,
        rejected = report.rejected,
        "simulation finished"
    );

    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{}", json);
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("reservoir-node {}", env!("CARGO_PKG_VERSION"));
    println!("schema         {}", CURRENT_SCHEMA_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
