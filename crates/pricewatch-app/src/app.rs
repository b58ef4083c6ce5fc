//! Main application orchestration.
//!
//! Coordinates the threshold store, the upstream feed poller, the
//! stream broker, and the HTTP server.

use crate::config::AppConfig;
use crate::control::LocalControlPlane;
use crate::error::{AppError, AppResult};
use pricewatch_broker::{run_pump, run_server, StreamBroker};
use pricewatch_core::{PriceSample, Symbol};
use pricewatch_feed::{run_poller, PriceFeed, WatchList};
use pricewatch_store::ThresholdStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Capacity of the feed-to-broker sample channel.
const SAMPLE_CHANNEL_CAPACITY: usize = 256;

/// Symbols the poller should fetch: the configured default plus every
/// symbol referenced by a stored configuration or an open session.
struct ActiveSymbols {
    default_symbol: Symbol,
    store: Arc<ThresholdStore>,
    broker: Arc<StreamBroker>,
}

impl WatchList for ActiveSymbols {
    fn symbols(&self) -> Vec<Symbol> {
        let mut symbols = vec![self.default_symbol.clone()];
        symbols.extend(self.store.symbols());
        symbols.extend(self.broker.watched_symbols());
        symbols.sort();
        symbols.dedup();
        symbols
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    store: Arc<ThresholdStore>,
    feed: Arc<PriceFeed>,
    broker: Arc<StreamBroker>,
}

impl Application {
    /// Create a new application from configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let store = if config.store.snapshot_path.is_empty() {
            Arc::new(ThresholdStore::new())
        } else {
            Arc::new(ThresholdStore::with_snapshot(config.store.snapshot_path.clone())?)
        };
        let feed = Arc::new(PriceFeed::new(config.feed.base_url.clone())?);
        let broker = Arc::new(StreamBroker::new(store.clone()));

        Ok(Self {
            config,
            store,
            feed,
            broker,
        })
    }

    /// In-process control plane over this application's components.
    pub fn control_plane(&self) -> LocalControlPlane {
        LocalControlPlane::new(self.store.clone(), self.feed.clone(), self.broker.clone())
    }

    /// Run the poller, the broker pump, and the HTTP server until
    /// ctrl-c or server failure.
    pub async fn run(self) -> AppResult<()> {
        let default_symbol = Symbol::parse(&self.config.default_symbol)
            .map_err(|e| AppError::Config(format!("Bad default_symbol: {e}")))?;

        let shutdown = CancellationToken::new();
        let (sample_tx, sample_rx) = mpsc::channel::<PriceSample>(SAMPLE_CHANNEL_CAPACITY);

        let watch_list = Arc::new(ActiveSymbols {
            default_symbol,
            store: self.store.clone(),
            broker: self.broker.clone(),
        });

        let poller = tokio::spawn(run_poller(
            self.feed.clone(),
            watch_list,
            sample_tx,
            Duration::from_secs(self.config.feed.poll_interval_secs),
            shutdown.clone(),
        ));

        let pump = tokio::spawn(run_pump(self.broker.clone(), sample_rx, shutdown.clone()));

        let server = tokio::spawn(run_server(
            self.broker.clone(),
            self.feed.clone(),
            self.config.server.clone(),
        ));

        info!(
            port = self.config.server.port,
            poll_interval_secs = self.config.feed.poll_interval_secs,
            "pricewatch running"
        );

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
            }
            result = server => {
                match result {
                    Ok(Ok(())) => info!("Server stopped"),
                    Ok(Err(e)) => {
                        error!(error = %e, "Server failed");
                        shutdown.cancel();
                        return Err(AppError::Server(e.to_string()));
                    }
                    Err(e) => {
                        error!(error = %e, "Server task panicked");
                        shutdown.cancel();
                        return Err(AppError::Server(e.to_string()));
                    }
                }
            }
        }

        shutdown.cancel();
        let _ = poller.await;
        let _ = pump.await;
        info!("pricewatch stopped");
        Ok(())
    }
}
