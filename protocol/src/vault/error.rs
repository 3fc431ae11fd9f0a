//! Errors returned by vault, registry and admin operations.
//!
//! An `Err` from any mutating call means nothing changed: operations stage
//! their effects and commit only after every precondition has passed.

use thiserror::Error;
use uuid::Uuid;

use super::asset::AssetId;
use super::status::{OperationClass, VaultStatus};
use crate::math::MathError;

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The vault was written by a different build of the protocol.
    #[error("schema version mismatch: vault is v{found}, this build expects v{expected}")]
    SchemaVersionMismatch {
        /// The version this build operates on.
        expected: u64,
        /// The version stored on the vault.
        found: u64,
    },

    /// The vault's status does not permit this class of operation.
    #[error("{operation} not permitted while vault is {status}")]
    StatusViolation {
        /// Current vault status.
        status: VaultStatus,
        /// The operation class that was attempted.
        operation: OperationClass,
    },

    /// A zero amount was supplied where a positive one is required.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// The amount is below the vault's configured minimum.
    #[error("amount {amount} below minimum {minimum}")]
    BelowMinimum {
        /// The amount that was rejected.
        amount: u64,
        /// The configured minimum.
        minimum: u64,
    },

    /// A deposit converted to zero shares.
    #[error("deposit of {assets} would mint zero shares")]
    ZeroShares {
        /// The net assets that rounded down to nothing.
        assets: u64,
    },

    /// Tried to redeem more shares than exist.
    #[error("insufficient shares: requested {requested}, outstanding {outstanding}")]
    InsufficientShares {
        /// Shares the caller tried to redeem.
        requested: u64,
        /// Total shares outstanding.
        outstanding: u64,
    },

    /// The withdrawal would breach today's withdrawal quota.
    #[error("daily limit exceeded: requested {requested}, remaining {remaining}")]
    DailyLimitExceeded {
        /// Amount the caller tried to withdraw.
        requested: u64,
        /// Quota left for the current day.
        remaining: u64,
    },

    /// The pool does not physically hold enough to cover the request.
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        /// Amount requested out of the pool.
        requested: u64,
        /// Current pool balance.
        available: u64,
    },

    /// Admin-supplied parameters are out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The presented capability is not the one this vault trusts.
    #[error("unauthorized: capability identity does not match")]
    Unauthorized,

    /// No vault is registered for the asset type.
    #[error("no vault registered for asset {0}")]
    VaultNotFound(AssetId),

    /// The asset type already has a vault.
    #[error("vault already exists for asset {0}")]
    VaultAlreadyExists(AssetId),

    /// The registry entry and the vault record disagree.
    #[error("identity mismatch for asset {asset}: directory has {expected}, vault is {found}")]
    IdentityMismatch {
        /// Asset type being looked up.
        asset: AssetId,
        /// Vault id recorded in the directory.
        expected: Uuid,
        /// Vault id stored on the record.
        found: Uuid,
    },

    /// `upgrade_schema` was called on a vault that is already current.
    #[error("vault schema v{current} cannot be upgraded to v{target}")]
    NotUpgradeable {
        /// The vault's version.
        current: u64,
        /// The version this build would upgrade to.
        target: u64,
    },

    /// Checked arithmetic failed.
    #[error("arithmetic error: {0}")]
    Math(#[from] MathError),
}
