//! HTTP client for the upstream price source.
//!
//! Speaks the CoinGecko-style simple-price shape:
//! `GET {base}/simple/price?ids={symbol}&vs_currencies=usd` returning
//! `{"cardano": {"usd": 0.612}}`.

use crate::error::{FeedError, FeedResult};
use pricewatch_core::{Price, PriceSample, Symbol};
use reqwest::Client;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default timeout for upstream requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upstream price feed client.
pub struct PriceFeed {
    client: Client,
    base_url: String,
}

impl PriceFeed {
    /// Create a new feed client.
    ///
    /// # Arguments
    /// * `base_url` - API base (e.g., "https://api.coingecko.com/api/v3")
    pub fn new(base_url: impl Into<String>) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Upstream(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch a single point-in-time price for a symbol.
    ///
    /// Used for the initial snapshot and by the background poller.
    /// All failures map to `Upstream`/`Parse`/`InvalidData`; none are
    /// fatal to the caller.
    pub async fn fetch_once(&self, symbol: &Symbol) -> FeedResult<PriceSample> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.base_url, symbol
        );
        debug!(%symbol, "Fetching price snapshot");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Upstream(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Upstream(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Upstream(format!("Failed to read response: {e}")))?;

        parse_simple_price(symbol, &body)
    }
}

/// Parse a simple-price response body into a sample for `symbol`.
///
/// Extracted as a separate function for testability.
fn parse_simple_price(symbol: &Symbol, body: &str) -> FeedResult<PriceSample> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    let usd = value
        .get(symbol.as_str())
        .and_then(|entry| entry.get("usd"))
        .ok_or_else(|| FeedError::Parse(format!("No usd quote for {symbol} in response")))?;

    // Go through the raw JSON token rather than f64 so the decimal
    // representation survives exactly. Some sources quote the number.
    let raw = usd.to_string();
    let price = rust_decimal::Decimal::from_str(raw.trim_matches('"'))
        .map_err(|e| FeedError::Parse(format!("Bad price for {symbol}: {e}")))?;
    let price = Price::new(price);

    if price.is_negative() {
        return Err(FeedError::InvalidData(format!(
            "Negative price {price} for {symbol}"
        )));
    }

    Ok(PriceSample::new(symbol.clone(), price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_parse_simple_price() {
        let sample =
            parse_simple_price(&symbol("cardano"), r#"{"cardano":{"usd":0.612}}"#).unwrap();
        assert_eq!(sample.symbol.as_str(), "cardano");
        assert_eq!(sample.price.inner(), dec!(0.612));
    }

    #[test]
    fn test_parse_preserves_decimal_representation() {
        let sample =
            parse_simple_price(&symbol("bitcoin"), r#"{"bitcoin":{"usd":65000.01}}"#).unwrap();
        assert_eq!(sample.price.inner(), dec!(65000.01));
    }

    #[test]
    fn test_parse_accepts_quoted_numbers() {
        let sample =
            parse_simple_price(&symbol("cardano"), r#"{"cardano":{"usd":"0.612"}}"#).unwrap();
        assert_eq!(sample.price.inner(), dec!(0.612));
    }

    #[test]
    fn test_missing_symbol_is_parse_error() {
        let result = parse_simple_price(&symbol("cardano"), r#"{"bitcoin":{"usd":1.0}}"#);
        assert!(matches!(result, Err(FeedError::Parse(_))));
    }

    #[test]
    fn test_negative_price_rejected() {
        let result = parse_simple_price(&symbol("cardano"), r#"{"cardano":{"usd":-0.1}}"#);
        assert!(matches!(result, Err(FeedError::InvalidData(_))));
    }

    #[test]
    fn test_malformed_body_is_json_error() {
        let result = parse_simple_price(&symbol("cardano"), "not json");
        assert!(matches!(result, Err(FeedError::Json(_))));
    }
}
