//! # Price Oracle
//!
//! The risk engine never trusts a price it cannot vouch for. This module
//! defines the interface the engine consumes ([`PriceOracle`]), the quote
//! shape ([`PriceQuote`]), and the safety gate every quote has to clear
//! ([`check_quote`]). [`ManualOracle`] is an in-memory feed for the node
//! and for tests; production deployments implement the trait over whatever
//! feed they actually have.
//!
//! ## The gate
//!
//! A quote is usable only if all of these hold:
//!
//! - the oracle is not paused and has a feed for the asset
//! - the feed marks the quote `valid`
//! - it is no older than [`MAX_PRICE_STALENESS_SECS`] and no further than
//!   [`MAX_CLOCK_SKEW_SECS`] in the future
//! - the price is non-zero
//! - `confidence / price <= MAX_CONFIDENCE_INTERVAL_BPS / 10_000`
//!
//! Confidence is the absolute half-width of the feed's interval, in the same
//! units as the price. The ratio check is done cross-multiplied in `u128` so
//! it cannot overflow or lose precision.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    BPS_DENOMINATOR, MAX_CLOCK_SKEW_SECS, MAX_CONFIDENCE_INTERVAL_BPS, MAX_PRICE_STALENESS_SECS,
};
use crate::context::TxContext;
use crate::vault::AssetId;

// ---------------------------------------------------------------------------
// PriceQuote
// ---------------------------------------------------------------------------

/// A single price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// USD price per whole unit of the asset, in the feed's fixed-point units.
    pub price: u128,
    /// Absolute confidence half-width, same units as `price`.
    pub confidence: u128,
    /// Unix timestamp (seconds) the quote was published at.
    pub timestamp: i64,
    /// Decimals of the price's fixed-point representation. Informational.
    pub decimals: u8,
    /// The feed's own validity flag.
    pub valid: bool,
}

/// Why a quote (or the oracle as a whole) was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OracleFault {
    #[error("oracle is paused")]
    Paused,

    #[error("no price feed for asset")]
    NoFeed,

    #[error("feed marked quote invalid")]
    InvalidQuote,

    #[error("quote is {age_secs}s old (max {MAX_PRICE_STALENESS_SECS}s)")]
    Stale {
        /// Age of the quote relative to the caller's clock.
        age_secs: i64,
    },

    #[error("quote timestamp is {ahead_secs}s in the future (max skew {MAX_CLOCK_SKEW_SECS}s)")]
    FutureTimestamp {
        /// How far ahead of the caller's clock the quote claims to be.
        ahead_secs: i64,
    },

    #[error("price is zero")]
    ZeroPrice,

    #[error("confidence {confidence} too wide for price {price}")]
    ConfidenceTooWide {
        /// Reported confidence half-width.
        confidence: u128,
        /// Reported price.
        price: u128,
    },
}

/// Runs every per-quote check against a caller clock of `now_secs`.
pub fn check_quote(quote: &PriceQuote, now_secs: i64) -> Result<(), OracleFault> {
    if !quote.valid {
        return Err(OracleFault::InvalidQuote);
    }

    let age = now_secs.saturating_sub(quote.timestamp);
    if age > MAX_PRICE_STALENESS_SECS {
        return Err(OracleFault::Stale { age_secs: age });
    }
    let ahead = quote.timestamp.saturating_sub(now_secs);
    if ahead > MAX_CLOCK_SKEW_SECS {
        return Err(OracleFault::FutureTimestamp { ahead_secs: ahead });
    }

    if quote.price == 0 {
        return Err(OracleFault::ZeroPrice);
    }

    // confidence / price > bps / 10_000, cross-multiplied.
    let lhs = quote.confidence.checked_mul(u128::from(BPS_DENOMINATOR));
    let rhs = quote
        .price
        .checked_mul(u128::from(MAX_CONFIDENCE_INTERVAL_BPS));
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) if lhs <= rhs => Ok(()),
        // A confidence so large it overflows is certainly too wide. A price
        // so large that `rhs` overflows while `lhs` doesn't is fine.
        (Some(_), None) => Ok(()),
        _ => Err(OracleFault::ConfidenceTooWide {
            confidence: quote.confidence,
            price: quote.price,
        }),
    }
}

// ---------------------------------------------------------------------------
// PriceOracle trait
// ---------------------------------------------------------------------------

/// Source of prices consumed by the risk engine.
pub trait PriceOracle {
    /// Whether a feed exists for `asset` at all.
    fn has_feed(&self, asset: &AssetId) -> bool;

    /// The latest quote for `asset`, unvalidated.
    fn get_price(&self, asset: &AssetId) -> Option<PriceQuote>;

    /// Whether the oracle as a whole is halted.
    fn is_paused(&self) -> bool;

    /// USD value of `amount` smallest units of `asset`, where one whole unit
    /// is `10^decimals` smallest units: `price * amount / 10^decimals`,
    /// floored. `None` without a feed or on overflow.
    fn usd_value(&self, asset: &AssetId, amount: u128, decimals: u8) -> Option<u128> {
        let quote = self.get_price(asset)?;
        let scale = 10u128.checked_pow(u32::from(decimals))?;
        quote.price.checked_mul(amount)?.checked_div(scale)
    }

    /// The latest quote for `asset` if it clears the full safety gate at
    /// `ctx`'s time.
    fn safe_price(&self, asset: &AssetId, ctx: &TxContext) -> Result<PriceQuote, OracleFault> {
        if self.is_paused() {
            return Err(OracleFault::Paused);
        }
        if !self.has_feed(asset) {
            return Err(OracleFault::NoFeed);
        }
        let quote = self.get_price(asset).ok_or(OracleFault::NoFeed)?;
        check_quote(&quote, ctx.now.timestamp())?;
        Ok(quote)
    }
}

// ---------------------------------------------------------------------------
// ManualOracle
// ---------------------------------------------------------------------------

/// In-memory oracle whose prices are set by hand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualOracle {
    feeds: HashMap<AssetId, PriceQuote>,
    paused: bool,
}

impl ManualOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes (or replaces) the quote for `asset`.
    pub fn set_price(&mut self, asset: AssetId, quote: PriceQuote) {
        tracing::debug!(asset = %asset, price = quote.price, ts = quote.timestamp, "price set");
        self.feeds.insert(asset, quote);
    }

    /// Drops the feed for `asset`. Returns the last quote, if any.
    pub fn remove_feed(&mut self, asset: &AssetId) -> Option<PriceQuote> {
        self.feeds.remove(asset)
    }

    pub fn pause(&mut self) {
        tracing::warn!("oracle paused");
        self.paused = true;
    }

    pub fn resume(&mut self) {
        tracing::info!("oracle resumed");
        self.paused = false;
    }

    /// Assets with a live feed.
    pub fn assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<_> = self.feeds.keys().cloned().collect();
        assets.sort();
        assets
    }
}

impl PriceOracle for ManualOracle {
    fn has_feed(&self, asset: &AssetId) -> bool {
        self.feeds.contains_key(asset)
    }

    fn get_price(&self, asset: &AssetId) -> Option<PriceQuote> {
        self.feeds.get(asset).copied()
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
