//! Mock upstream price source for integration tests.
//!
//! Serves the simple-price shape the feed adapter expects:
//! `GET /simple/price?ids=cardano&vs_currencies=usd`
//! -> `{"cardano":{"usd":0.612}}`

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

type PriceMap = Arc<Mutex<HashMap<String, Decimal>>>;

/// A mock upstream price API on an ephemeral port.
pub struct MockUpstream {
    addr: SocketAddr,
    prices: PriceMap,
}

impl MockUpstream {
    /// Start the mock server.
    pub async fn start() -> Self {
        let prices: PriceMap = Arc::new(Mutex::new(HashMap::new()));

        let app = Router::new()
            .route("/simple/price", get(simple_price))
            .with_state(prices.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, prices }
    }

    /// Base URL for the feed adapter.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Set the quote returned for a symbol. Symbols with no quote get
    /// a 404, which the feed adapter reports as upstream-unavailable.
    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices.lock().insert(symbol.to_string(), price);
    }
}

#[derive(Debug, serde::Deserialize)]
struct PriceParams {
    ids: String,
}

async fn simple_price(
    State(prices): State<PriceMap>,
    Query(params): Query<PriceParams>,
) -> impl IntoResponse {
    let prices = prices.lock();
    match prices.get(&params.ids) {
        Some(price) => (
            [(header::CONTENT_TYPE, "application/json")],
            format!(r#"{{"{}":{{"usd":{}}}}}"#, params.ids, price),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "unknown id").into_response(),
    }
}
