//! In-process control plane.
//!
//! Wires the store, feed, and broker directly behind the
//! `ControlPlane` trait so an embedded controller (and the integration
//! tests) can consume the same operations the HTTP server exposes.

use pricewatch_broker::StreamBroker;
use pricewatch_client::{BoxFuture, ControlError, ControlPlane, StreamHandle};
use pricewatch_core::{
    ClientId, Price, PriceSample, SessionId, Symbol, ThresholdConfig,
};
use pricewatch_feed::PriceFeed;
use pricewatch_store::{StoreError, ThresholdStore};
use std::sync::Arc;

/// Control plane backed by in-process components.
pub struct LocalControlPlane {
    store: Arc<ThresholdStore>,
    feed: Arc<PriceFeed>,
    broker: Arc<StreamBroker>,
}

impl LocalControlPlane {
    pub fn new(store: Arc<ThresholdStore>, feed: Arc<PriceFeed>, broker: Arc<StreamBroker>) -> Self {
        Self {
            store,
            feed,
            broker,
        }
    }
}

fn store_error(e: StoreError) -> ControlError {
    match e {
        StoreError::InvalidBounds { lower, upper } => ControlError::InvalidBounds { lower, upper },
        StoreError::InvalidSymbol(symbol) => ControlError::InvalidSymbol(symbol),
        other => ControlError::Transport(other.to_string()),
    }
}

impl ControlPlane for LocalControlPlane {
    fn get_configuration(
        &self,
        client: ClientId,
    ) -> BoxFuture<'_, Result<ThresholdConfig, ControlError>> {
        Box::pin(async move { Ok(self.store.get(&client)) })
    }

    fn update_configuration(
        &self,
        client: ClientId,
        symbol: String,
        lower: Price,
        upper: Price,
    ) -> BoxFuture<'_, Result<ThresholdConfig, ControlError>> {
        Box::pin(async move {
            self.store
                .set(&client, &symbol, lower, upper)
                .map_err(store_error)
        })
    }

    fn snapshot_price(
        &self,
        symbol: Symbol,
    ) -> BoxFuture<'_, Result<PriceSample, ControlError>> {
        Box::pin(async move {
            self.feed
                .fetch_once(&symbol)
                .await
                .map_err(|e| ControlError::Upstream(e.to_string()))
        })
    }

    fn open_stream(
        &self,
        client: ClientId,
        symbol: Symbol,
    ) -> BoxFuture<'_, Result<StreamHandle, ControlError>> {
        Box::pin(async move {
            let (session, updates) = self.broker.open(client, symbol);
            Ok(StreamHandle { session, updates })
        })
    }

    fn close_stream(&self, session: SessionId) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.broker.close(&session);
        })
    }
}
