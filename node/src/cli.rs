//! # CLI Interface
//!
//! Defines the command-line argument structure for `reservoir-node` using
//! `clap` derive. Supports three subcommands: `run`, `simulate`, and
//! `version`. Every `run` flag can also be set through a `RESERVOIR_*`
//! environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reservoir_protocol::config::{VaultConfig, DEFAULT_MIN_DEPOSIT, DEFAULT_MIN_WITHDRAWAL};

use crate::logging::LogFormat;

/// Reservoir node.
///
/// Hosts a vault registry behind an HTTP/JSON API, exposes Prometheus
/// metrics, and can replay operation scripts against a fresh registry.
#[derive(Parser, Debug)]
#[command(
    name = "reservoir-node",
    about = "Reservoir pooled-asset vault node",
    version,
    propagate_version = true
)]
pub struct ReservoirCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Reservoir node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node: API server and metrics endpoint.
    Run(RunArgs),
    /// Replay a JSON operation script against a fresh registry and print
    /// the resulting vault statistics.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the REST API.
    #[arg(long, env = "RESERVOIR_RPC_PORT", default_value_t = 9841)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "RESERVOIR_METRICS_PORT", default_value_t = 9842)]
    pub metrics_port: u16,

    /// Asset types to create a vault for at startup, comma separated.
    #[arg(
        long,
        env = "RESERVOIR_ASSETS",
        value_delimiter = ',',
        default_value = "USDC"
    )]
    pub assets: Vec<String>,

    /// Daily withdrawal cap for vaults created at startup or via the API
    /// without an explicit limit.
    #[arg(
        long,
        env = "RESERVOIR_MAX_DAILY_WITHDRAWAL",
        default_value_t = 1_000_000_000_000
    )]
    pub max_daily_withdrawal: u64,

    /// Smallest deposit accepted by default.
    #[arg(long, env = "RESERVOIR_MIN_DEPOSIT", default_value_t = DEFAULT_MIN_DEPOSIT)]
    pub min_deposit: u64,

    /// Smallest withdrawal accepted by default.
    #[arg(long, env = "RESERVOIR_MIN_WITHDRAWAL", default_value_t = DEFAULT_MIN_WITHDRAWAL)]
    pub min_withdrawal: u64,

    /// Default deposit fee in basis points.
    #[arg(long, env = "RESERVOIR_DEPOSIT_FEE_BPS", default_value_t = 0)]
    pub deposit_fee_bps: u64,

    /// Default withdrawal fee in basis points.
    #[arg(long, env = "RESERVOIR_WITHDRAWAL_FEE_BPS", default_value_t = 0)]
    pub withdrawal_fee_bps: u64,

    /// Log output format.
    #[arg(long, env = "RESERVOIR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl RunArgs {
    /// The vault config assembled from the default-fee and minimum flags.
    pub fn vault_config(&self) -> VaultConfig {
        VaultConfig {
            min_deposit: self.min_deposit,
            min_withdrawal: self.min_withdrawal,
            deposit_fee_bps: self.deposit_fee_bps,
            withdrawal_fee_bps: self.withdrawal_fee_bps,
        }
    }
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Path to the JSON script to replay.
    pub script: PathBuf,

    /// Log output format.
    #[arg(long, env = "RESERVOIR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
