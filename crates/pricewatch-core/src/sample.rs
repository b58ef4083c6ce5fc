//! Price samples and delivered stream messages.

use crate::price::Price;
use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single point-in-time price observation.
///
/// Produced by the feed adapter, consumed once by the broker, never
/// persisted. Timestamps are UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSample {
    pub symbol: Symbol,
    pub price: Price,
    pub observed_at: DateTime<Utc>,
}

impl PriceSample {
    /// Create a sample observed now.
    pub fn new(symbol: Symbol, price: Price) -> Self {
        Self {
            symbol,
            price,
            observed_at: Utc::now(),
        }
    }
}

/// The message delivered to a stream session: the sample plus the
/// breach flag evaluated against the owning client's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub symbol: Symbol,
    pub price: Price,
    pub observed_at: DateTime<Utc>,
    pub breached: bool,
}

impl PriceUpdate {
    pub fn new(sample: &PriceSample, breached: bool) -> Self {
        Self {
            symbol: sample.symbol.clone(),
            price: sample.price,
            observed_at: sample.observed_at,
            breached,
        }
    }
}
