//! # Capability Tokens
//!
//! Privileged operations in Reservoir are authorized by *possession* of a
//! capability, never by who the caller claims to be. A capability is an
//! opaque token carrying a UUID identity; a vault records the identities it
//! trusts when it is created and compares against them on every privileged
//! call.
//!
//! Tokens can only be minted inside this crate (by
//! [`VaultRegistry::initialize`](crate::vault::VaultRegistry::initialize))
//! and are neither `Clone` nor `Copy`, so the holder cannot duplicate one
//! and nobody outside the crate can fabricate one with a chosen identity.
//!
//! | Token        | Authorizes                                           |
//! |--------------|------------------------------------------------------|
//! | [`AdminCap`] | vault creation, status, config, limits, fees, schema |
//! | [`CreditCap`]| borrow / repay and the atomic composites             |

use std::fmt;

use uuid::Uuid;

use crate::vault::VaultError;

/// Common behaviour of every capability token.
pub trait Capability {
    /// Human-readable kind, used in logs.
    const KIND: &'static str;

    /// The token's identity.
    fn id(&self) -> Uuid;

    /// Succeeds iff this token's identity equals `expected`.
    fn verify(&self, expected: &Uuid) -> Result<(), VaultError> {
        if self.id() == *expected {
            Ok(())
        } else {
            tracing::warn!(
                kind = Self::KIND,
                presented = %self.id(),
                "capability rejected"
            );
            Err(VaultError::Unauthorized)
        }
    }
}

/// Administrative capability.
#[derive(Debug, PartialEq, Eq)]
pub struct AdminCap {
    id: Uuid,
}

impl AdminCap {
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Capability for AdminCap {
    const KIND: &'static str = "admin";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for AdminCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdminCap({})", self.id)
    }
}

/// Capability held by the credit subsystem for borrow/repay.
#[derive(Debug, PartialEq, Eq)]
pub struct CreditCap {
    id: Uuid,
}

impl CreditCap {
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4() }
    }
}

impl Capability for CreditCap {
    const KIND: &'static str = "credit";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for CreditCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CreditCap({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_tokens_are_distinct() {
        let a = AdminCap::mint();
        let b = AdminCap::mint();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn verify_matches_identity_only() {
        let cap = CreditCap::mint();
        assert!(cap.verify(&cap.id()).is_ok());
        assert!(matches!(
            cap.verify(&Uuid::new_v4()),
            Err(VaultError::Unauthorized)
        ));
    }

    #[test]
    fn admin_and_credit_identities_never_alias() {
        let admin = AdminCap::mint();
        let credit = CreditCap::mint();
        assert!(credit.verify(&admin.id()).is_err());
    }
}
