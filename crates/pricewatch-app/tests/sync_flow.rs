//! End-to-end synchronization flow over the in-process control plane.

mod integration;
use integration::common::mock_upstream::MockUpstream;

use pricewatch_app::LocalControlPlane;
use pricewatch_broker::StreamBroker;
use pricewatch_client::{
    Backoff, BackoffConfig, ClientError, ClientSyncController, ControlError, SyncState,
};
use pricewatch_core::{ClientId, Price, PriceSample, Symbol, ThresholdConfig};
use pricewatch_feed::PriceFeed;
use pricewatch_store::ThresholdStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

struct Harness {
    store: Arc<ThresholdStore>,
    broker: Arc<StreamBroker>,
    control: Arc<LocalControlPlane>,
}

impl Harness {
    fn new(upstream: &MockUpstream) -> Self {
        let store = Arc::new(ThresholdStore::new());
        let feed = Arc::new(PriceFeed::new(upstream.base_url()).unwrap());
        let broker = Arc::new(StreamBroker::new(store.clone()));
        let control = Arc::new(LocalControlPlane::new(
            store.clone(),
            feed.clone(),
            broker.clone(),
        ));
        Self {
            store,
            broker,
            control,
        }
    }

    fn controller(&self) -> ClientSyncController {
        ClientSyncController::new(
            self.control.clone(),
            ClientId::from("default"),
            Backoff::new(BackoffConfig {
                base_delay_ms: 1,
                max_delay_ms: 10,
                max_attempts: 0,
            }),
        )
    }

    fn publish(&self, symbol: &str, price: rust_decimal::Decimal) {
        self.broker.publish(&PriceSample::new(
            Symbol::parse(symbol).unwrap(),
            Price::new(price),
        ));
    }
}

/// The scenario from the design: no stored configuration, snapshot
/// seeds the display, a breaching stream update replaces it.
#[tokio::test]
async fn test_end_to_end_default_flow() {
    let upstream = MockUpstream::start().await;
    upstream.set_price("cardano", dec!(0.612));
    let harness = Harness::new(&upstream);

    let mut controller = harness.controller();
    controller.start().await.unwrap();

    // No stored configuration: the fallback applies.
    assert_eq!(controller.configuration(), &ThresholdConfig::fallback());
    assert_eq!(controller.state(), SyncState::Streaming);
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.612");

    harness.publish("cardano", dec!(0.495));

    let update = timeout(Duration::from_secs(2), controller.next_update())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(update.breached, "0.495 is below the 0.5 lower bound");
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.495");

    controller.shutdown().await;
}

/// Breach evaluation at the band boundaries, through the whole stack.
#[tokio::test]
async fn test_breach_boundaries_end_to_end() {
    let upstream = MockUpstream::start().await;
    upstream.set_price("cardano", dec!(0.612));
    let harness = Harness::new(&upstream);
    harness
        .store
        .set(
            &ClientId::from("default"),
            "cardano",
            Price::new(dec!(0.5)),
            Price::new(dec!(0.8)),
        )
        .unwrap();

    let mut controller = harness.controller();
    controller.start().await.unwrap();

    for (price, expect_breach) in [
        (dec!(0.5), false),
        (dec!(0.8), false),
        (dec!(0.4999), true),
        (dec!(0.8001), true),
    ] {
        harness.publish("cardano", price);
        let update = timeout(Duration::from_secs(2), controller.next_update())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            update.breached, expect_breach,
            "price {price} breach expectation"
        );
    }

    controller.shutdown().await;
}

/// After an accepted symbol change, the old symbol can never surface
/// again, while the new one flows straight through.
#[tokio::test]
async fn test_session_replacement_after_symbol_change() {
    let upstream = MockUpstream::start().await;
    upstream.set_price("cardano", dec!(0.612));
    upstream.set_price("bitcoin", dec!(65000));
    let harness = Harness::new(&upstream);

    let mut controller = harness.controller();
    controller.start().await.unwrap();
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.612");

    let accepted = controller
        .update_configuration("bitcoin", Price::new(dec!(60000)), Price::new(dec!(70000)))
        .await
        .unwrap();
    assert_eq!(accepted.version, 1);
    assert_eq!(controller.displayed_price().to_string(), "BITCOIN: $65000");

    // A late cardano sample finds no session watching it anymore.
    harness.publish("cardano", dec!(0.61));
    harness.publish("bitcoin", dec!(65000.5));

    let update = timeout(Duration::from_secs(2), controller.next_update())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(update.symbol.as_str(), "bitcoin");
    assert_eq!(controller.displayed_price().to_string(), "BITCOIN: $65000.5");

    controller.shutdown().await;
}

/// A rejected update changes nothing: state, configuration, display.
#[tokio::test]
async fn test_invalid_bounds_rejected_in_full() {
    let upstream = MockUpstream::start().await;
    upstream.set_price("cardano", dec!(0.612));
    let harness = Harness::new(&upstream);

    let mut controller = harness.controller();
    controller.start().await.unwrap();
    let config_before = controller.configuration().clone();

    let result = controller
        .update_configuration("cardano", Price::new(dec!(0.8)), Price::new(dec!(0.5)))
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Control(ControlError::InvalidBounds { .. }))
    ));

    assert_eq!(controller.state(), SyncState::Streaming);
    assert_eq!(controller.configuration(), &config_before);
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.612");
    assert!(harness.store.is_empty(), "nothing was committed");

    controller.shutdown().await;
}

/// An unavailable upstream leaves the placeholder until the stream
/// delivers the first sample.
#[tokio::test]
async fn test_snapshot_unavailable_placeholder() {
    let upstream = MockUpstream::start().await;
    // No price configured: snapshot requests return 404.
    let harness = Harness::new(&upstream);

    let mut controller = harness.controller();
    controller.start().await.unwrap();
    assert_eq!(controller.displayed_price().to_string(), "--");

    harness.publish("cardano", dec!(0.61));
    timeout(Duration::from_secs(2), controller.next_update())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.61");

    controller.shutdown().await;
}
