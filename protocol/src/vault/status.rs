//! # Vault Status State Machine
//!
//! A vault is always in exactly one [`VaultStatus`]. There are no automatic
//! transitions: every change is a single admin-gated assignment. What the
//! status gates is captured by [`VaultStatus::permits`], an exhaustive
//! match over (status, operation class):
//!
//! ```text
//!                  deposit  withdraw  borrow/repay
//! Active              ✓        ✓          ✓
//! Paused              ✗        ✗          ✗
//! DepositsOnly        ✓        ✗          ✓
//! WithdrawalsOnly     ✗        ✓          ✓
//! Inactive            ✗        ✗          ✗
//! ```
//!
//! New states are added by extending the enum and the match, never by
//! adding boolean flags next to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::VaultError;

/// Lifecycle status of a vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VaultStatus {
    /// Normal operation.
    Active,
    /// Temporarily halted. Nothing moves.
    Paused,
    /// Accepting deposits (and credit traffic) but not withdrawals.
    DepositsOnly,
    /// Accepting withdrawals (and credit traffic) but not deposits.
    WithdrawalsOnly,
    /// Shut down. Reached by `deactivate` or an emergency pause.
    Inactive,
}

/// The classes of operation the status machine gates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationClass {
    Deposit,
    Withdraw,
    /// Borrow and repay by the credit subsystem.
    Credit,
}

impl VaultStatus {
    /// Returns `true` if `op` is allowed in this status.
    pub fn permits(&self, op: OperationClass) -> bool {
        use OperationClass::*;
        use VaultStatus::*;
        match (self, op) {
            (Active, _) => true,
            (Paused, _) => false,
            (DepositsOnly, Deposit | Credit) => true,
            (DepositsOnly, Withdraw) => false,
            (WithdrawalsOnly, Withdraw | Credit) => true,
            (WithdrawalsOnly, Deposit) => false,
            (Inactive, _) => false,
        }
    }

    /// Like [`permits`](Self::permits) but as a `Result`.
    pub fn ensure(&self, op: OperationClass) -> Result<(), VaultError> {
        if self.permits(op) {
            Ok(())
        } else {
            Err(VaultError::StatusViolation {
                status: *self,
                operation: op,
            })
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultStatus::Active => write!(f, "Active"),
            VaultStatus::Paused => write!(f, "Paused"),
            VaultStatus::DepositsOnly => write!(f, "DepositsOnly"),
            VaultStatus::WithdrawalsOnly => write!(f, "WithdrawalsOnly"),
            VaultStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationClass::Deposit => write!(f, "deposit"),
            OperationClass::Withdraw => write!(f, "withdraw"),
            OperationClass::Credit => write!(f, "borrow/repay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperationClass::*;
    use VaultStatus::*;

    #[test]
    fn permission_matrix() {
        let cases = [
            (Active, [true, true, true]),
            (Paused, [false, false, false]),
            (DepositsOnly, [true, false, true]),
            (WithdrawalsOnly, [false, true, true]),
            (Inactive, [false, false, false]),
        ];
        for (status, [dep, wd, credit]) in cases {
            assert_eq!(status.permits(Deposit), dep, "{status} deposit");
            assert_eq!(status.permits(Withdraw), wd, "{status} withdraw");
            assert_eq!(status.permits(Credit), credit, "{status} credit");
        }
    }

    #[test]
    fn ensure_reports_status_and_operation() {
        let err = WithdrawalsOnly.ensure(Deposit).unwrap_err();
        match err {
            VaultError::StatusViolation { status, operation } => {
                assert_eq!(status, WithdrawalsOnly);
                assert_eq!(operation, Deposit);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn status_serializes_by_name() {
        let json = serde_json::to_string(&DepositsOnly).unwrap();
        assert_eq!(json, "\"DepositsOnly\"");
    }
}
