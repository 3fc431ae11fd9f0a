// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Reservoir Protocol: Core Library
//!
//! Reservoir pools assets into per-asset vaults, issues shares against them,
//! lends out of them to a credit subsystem, and refuses to do any of that on
//! a price it cannot trust. This crate is the whole of that logic; the node
//! binary just puts it behind HTTP.
//!
//! ## Architecture
//!
//! - **math**: checked `u64`/`u128` arithmetic. Nothing in here wraps.
//! - **config**: protocol constants and the per-vault [`config::VaultConfig`].
//! - **context**: the caller-supplied clock every operation runs against.
//! - **capability**: `AdminCap` / `CreditCap`, possession-based authority.
//! - **vault**: status machine, daily limit, pool ledger, registry.
//! - **oracle**: the price interface and its safety gate.
//! - **risk**: health factor, liquidation and capacity math.
//!
//! ## Design Philosophy
//!
//! 1. Rounding favours the pool. Always. Both directions.
//! 2. An `Err` means nothing happened. Operations stage, then commit.
//! 3. Authority is something you hold, not something you claim.
//! 4. A bad price produces a conservative answer, never an optimistic one.
//! 5. If it touches money, it has tests. Plural.

pub mod capability;
pub mod config;
pub mod context;
pub mod math;
pub mod oracle;
pub mod risk;
pub mod vault;

pub use capability::{AdminCap, Capability, CreditCap};
pub use context::TxContext;
