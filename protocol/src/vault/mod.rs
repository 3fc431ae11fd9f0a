//! # Vault Module: Pooled Assets, Shares, and the Rules Around Them
//!
//! The vault is where money lives in Reservoir. Depositors hand assets to a
//! per-asset pool and get shares back; the credit subsystem borrows out of
//! the same pool and pays back into it. Everything else in this module
//! exists to keep those books straight under an admin who can pause things
//! and a clock that keeps turning over days.
//!
//! ## Architecture
//!
//! ```text
//! asset.rs        Asset identifiers (normalized symbols)
//! status.rs       Vault status state machine and permission matrix
//! daily_limit.rs  Per-day withdrawal governor with lazy rollover
//! pool.rs         The Vault: pool ledger, share math, all operations
//! registry.rs     Asset → vault directory, capability issuance
//! error.rs        VaultError
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` in smallest-unit denomination.** No floating
//!    point. Every `+`, `-`, `*` on an amount goes through [`crate::math`]
//!    and fails instead of wrapping.
//!
//! 2. **Rounding favours the pool.** Share conversions floor in both
//!    directions. See [`pool`] for why.
//!
//! 3. **Errors change nothing.** Operations stage their effect on copies and
//!    commit in one assignment. If you get an `Err`, the vault is exactly
//!    as you left it.
//!
//! 4. **Serializable state.** Every struct here derives `Serialize` and
//!    `Deserialize`, so a registry can be snapshotted and restored. The
//!    schema version tag on each vault is what keeps a restored snapshot
//!    from being driven by code that does not understand it. `Vault` and
//!    `DailyLimit` re-check their invariants while deserializing.

pub mod asset;
pub mod daily_limit;
pub mod error;
pub mod pool;
pub mod registry;
pub mod status;

pub use asset::{AssetId, AssetIdError};
pub use daily_limit::DailyLimit;
pub use error::VaultError;
pub use pool::{PoolLedger, RepayOutcome, Vault, VaultStatistics};
pub use registry::VaultRegistry;
pub use status::{OperationClass, VaultStatus};
