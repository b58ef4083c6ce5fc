//! Per-client threshold configuration.
//!
//! One active configuration per client identity. A configuration is
//! replaced as a whole (all fields plus a version bump) or not at all;
//! there is no partial-field merging.

use crate::error::{CoreError, Result};
use crate::price::Price;
use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client/account identifier keying a stored configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The price band a client wants tracked, plus the asset it applies to.
///
/// Invariants: `lower_bound <= upper_bound`, symbol non-empty (enforced
/// by `Symbol`). `version` increases monotonically with every committed
/// replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub symbol: Symbol,
    pub lower_bound: Price,
    pub upper_bound: Price,
    pub version: u64,
}

impl ThresholdConfig {
    /// Build a validated configuration at version 0.
    pub fn new(symbol: Symbol, lower_bound: Price, upper_bound: Price) -> Result<Self> {
        if lower_bound > upper_bound {
            return Err(CoreError::InvalidBounds {
                lower: lower_bound.inner(),
                upper: upper_bound.inner(),
            });
        }
        Ok(Self {
            symbol,
            lower_bound,
            upper_bound,
            version: 0,
        })
    }

    /// Hard-coded default used when no configuration is stored and as the
    /// startup fallback when the store is unreachable.
    pub fn fallback() -> Self {
        Self {
            symbol: Symbol::parse("cardano").expect("static symbol"),
            lower_bound: Price::new(Decimal::new(5, 1)),
            upper_bound: Price::new(Decimal::new(8, 1)),
            version: 0,
        }
    }

    /// Check whether this configuration watches the given symbol.
    #[inline]
    pub fn applies_to(&self, symbol: &Symbol) -> bool {
        self.symbol == *symbol
    }

    /// Breach check: a price strictly outside `[lower_bound, upper_bound]`.
    ///
    /// A price exactly equal to either bound is NOT a breach.
    #[inline]
    pub fn is_breach(&self, price: Price) -> bool {
        price < self.lower_bound || price > self.upper_bound
    }
}
