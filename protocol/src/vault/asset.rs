//! # Asset Identifiers
//!
//! Every vault pools exactly one asset type, named by an [`AssetId`]. The
//! id is the asset's ticker-like symbol, normalized to upper case so that
//! `"usdc"` and `"USDC"` address the same vault and the same price feed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest symbol accepted.
pub const MAX_ASSET_ID_LEN: usize = 32;

/// Reasons an asset symbol fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetIdError {
    #[error("asset id is empty")]
    Empty,
    #[error("asset id longer than {MAX_ASSET_ID_LEN} characters")]
    TooLong,
    #[error("asset id contains invalid character {0:?}")]
    InvalidChar(char),
}

/// A normalized asset type identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    /// Parses and normalizes a symbol.
    ///
    /// Accepts ASCII alphanumerics plus `_`, `-`, `.` and `:`; surrounding
    /// whitespace is trimmed.
    pub fn new(symbol: &str) -> Result<Self, AssetIdError> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err(AssetIdError::Empty);
        }
        if trimmed.len() > MAX_ASSET_ID_LEN {
            return Err(AssetIdError::TooLong);
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        {
            return Err(AssetIdError::InvalidChar(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The normalized symbol.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AssetId {
    type Err = AssetIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AssetId {
    type Error = AssetIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let id = AssetId::new("  usdc ").unwrap();
        assert_eq!(id.as_str(), "USDC");
        assert_eq!(id, "USDC".parse().unwrap());
    }

    #[test]
    fn rejects_bad_symbols() {
        assert_eq!(AssetId::new("   "), Err(AssetIdError::Empty));
        assert_eq!(AssetId::new("US DC"), Err(AssetIdError::InvalidChar(' ')));
        assert_eq!(AssetId::new(&"X".repeat(33)), Err(AssetIdError::TooLong));
    }

    #[test]
    fn deserialization_validates() {
        let ok: AssetId = serde_json::from_str("\"wbtc\"").unwrap();
        assert_eq!(ok.as_str(), "WBTC");
        assert!(serde_json::from_str::<AssetId>("\"bad symbol\"").is_err());
    }
}
