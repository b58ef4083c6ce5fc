//! Background price poller.
//!
//! Polls the upstream source at a fixed interval for every watched
//! symbol and hands each sample to the broker channel. The poller has
//! no notion of subscribers: it produces samples unconditionally, and
//! a failed poll is logged and retried on the next interval, never
//! terminating the loop.

use crate::adapter::PriceFeed;
use pricewatch_core::{PriceSample, Symbol};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source of the symbols the poller should currently fetch.
///
/// Implemented by whoever knows which symbols are being watched
/// (configured thresholds plus open stream sessions).
pub trait WatchList: Send + Sync {
    fn symbols(&self) -> Vec<Symbol>;
}

/// Run the polling loop until cancelled.
///
/// Samples are sent to `tx` in emission order; the receiving side (the
/// broker pump) is the single consumer, which preserves per-symbol
/// ordering end to end.
pub async fn run_poller(
    feed: Arc<PriceFeed>,
    watch_list: Arc<dyn WatchList>,
    tx: mpsc::Sender<PriceSample>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    info!(interval_secs = interval.as_secs(), "Price poller started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = shutdown.cancelled() => {
                info!("Price poller shutting down");
                return;
            }
        }

        for symbol in watch_list.symbols() {
            match feed.fetch_once(&symbol).await {
                Ok(sample) => {
                    debug!(symbol = %sample.symbol, price = %sample.price, "Polled price");
                    if tx.send(sample).await.is_err() {
                        info!("Sample receiver dropped, stopping poller");
                        return;
                    }
                }
                Err(e) => {
                    pricewatch_telemetry::metrics::POLL_FAILURES_TOTAL.inc();
                    warn!(%symbol, error = %e, "Price poll failed, will retry next interval");
                }
            }
        }
    }
}
