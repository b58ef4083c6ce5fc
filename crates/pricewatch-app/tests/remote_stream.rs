//! End-to-end test of the remote HTTP/WS control plane against a
//! real server instance.

mod integration;
use integration::common::mock_upstream::MockUpstream;

use pricewatch_broker::{create_router, AppState, ServerConfig, StreamBroker};
use pricewatch_client::{
    Backoff, BackoffConfig, ClientError, ClientSyncController, ControlError, RemoteControlPlane,
    SyncState,
};
use pricewatch_core::{ClientId, Price, PriceSample, Symbol, ThresholdConfig};
use pricewatch_feed::PriceFeed;
use pricewatch_store::ThresholdStore;
use rust_decimal_macros::dec;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

async fn start_server(upstream: &MockUpstream) -> (SocketAddr, Arc<StreamBroker>) {
    let store = Arc::new(ThresholdStore::new());
    let feed = Arc::new(PriceFeed::new(upstream.base_url()).unwrap());
    let broker = Arc::new(StreamBroker::new(store));

    let state = AppState::new(broker.clone(), feed, &ServerConfig::default());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, broker)
}

/// Wait until the broker sees a session watching `symbol`.
async fn wait_for_session(broker: &StreamBroker, symbol: &str) {
    let symbol = Symbol::parse(symbol).unwrap();
    timeout(Duration::from_secs(2), async {
        loop {
            if broker.watched_symbols().contains(&symbol) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session should register within timeout");
}

#[tokio::test]
async fn test_remote_control_plane_end_to_end() {
    let upstream = MockUpstream::start().await;
    upstream.set_price("cardano", dec!(0.612));
    upstream.set_price("bitcoin", dec!(65000));

    let (addr, broker) = start_server(&upstream).await;
    let control = Arc::new(RemoteControlPlane::new(format!("http://{addr}")).unwrap());

    let mut controller = ClientSyncController::new(
        control,
        ClientId::from("default"),
        Backoff::new(BackoffConfig {
            base_delay_ms: 10,
            max_delay_ms: 100,
            max_attempts: 0,
        }),
    );

    // Startup: stored configuration (fallback), snapshot, stream.
    controller.start().await.unwrap();
    assert_eq!(controller.configuration(), &ThresholdConfig::fallback());
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.612");
    wait_for_session(&broker, "cardano").await;

    // A breaching sample flows through the WebSocket with its flag.
    broker.publish(&PriceSample::new(
        Symbol::parse("cardano").unwrap(),
        Price::new(dec!(0.495)),
    ));
    let update = timeout(Duration::from_secs(2), controller.next_update())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(update.breached);
    assert_eq!(controller.displayed_price().to_string(), "CARDANO: $0.495");

    // Invalid bounds are rejected by the server and surfaced as such.
    let result = controller
        .update_configuration("cardano", Price::new(dec!(0.9)), Price::new(dec!(0.1)))
        .await;
    assert!(matches!(
        result,
        Err(ClientError::Control(ControlError::InvalidBounds { .. }))
    ));
    assert_eq!(controller.state(), SyncState::Streaming);

    // Symbol change: new session, new snapshot, old symbol gone.
    let accepted = controller
        .update_configuration("bitcoin", Price::new(dec!(60000)), Price::new(dec!(70000)))
        .await
        .unwrap();
    assert_eq!(accepted.version, 1);
    assert_eq!(controller.displayed_price().to_string(), "BITCOIN: $65000");
    wait_for_session(&broker, "bitcoin").await;

    broker.publish(&PriceSample::new(
        Symbol::parse("bitcoin").unwrap(),
        Price::new(dec!(65000.5)),
    ));
    let update = timeout(Duration::from_secs(2), controller.next_update())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!update.breached);
    assert_eq!(controller.displayed_price().to_string(), "BITCOIN: $65000.5");

    controller.shutdown().await;
    assert!(controller.next_update().await.unwrap().is_none());
}

#[tokio::test]
async fn test_remote_snapshot_unavailable() {
    let upstream = MockUpstream::start().await;
    let (addr, _broker) = start_server(&upstream).await;
    let control = RemoteControlPlane::new(format!("http://{addr}")).unwrap();

    use pricewatch_client::ControlPlane;
    let result = control
        .snapshot_price(Symbol::parse("cardano").unwrap())
        .await;
    assert!(matches!(result, Err(ControlError::Upstream(_))));
}
