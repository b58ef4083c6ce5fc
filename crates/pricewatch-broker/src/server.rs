//! HTTP server exposing the control plane and the price stream.
//!
//! Routes:
//! - `GET  /api/config`  — current threshold configuration for a client
//! - `POST /api/config`  — replace a client's configuration
//! - `GET  /api/price`   — one-shot snapshot for a symbol
//! - `GET  /ws`          — price stream session bound to one symbol
//! - `GET  /metrics`     — Prometheus text exposition

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use pricewatch_core::{ClientId, Price, PriceSample, Symbol, ThresholdConfig};
use pricewatch_feed::PriceFeed;
use pricewatch_store::StoreError;
use pricewatch_telemetry::metrics;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::broker::StreamBroker;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum concurrent stream connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_port() -> u16 {
    5000
}

fn default_max_connections() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

/// Connection limiter to bound concurrent stream sessions.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    pub fn try_acquire(&self) -> Option<ConnectionGuard<'_>> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard { limiter: self });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard<'a> {
    limiter: &'a ConnectionLimiter,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    broker: Arc<StreamBroker>,
    feed: Arc<PriceFeed>,
    limiter: Arc<ConnectionLimiter>,
}

impl AppState {
    pub fn new(broker: Arc<StreamBroker>, feed: Arc<PriceFeed>, config: &ServerConfig) -> Self {
        Self {
            broker,
            feed,
            limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
        }
    }
}

/// Error payload for rejected requests.
#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    error: String,
}

fn error_response(status: StatusCode, kind: &'static str, error: String) -> Response {
    (status, Json(ErrorBody { kind, error })).into_response()
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/price", get(get_price))
        .route("/ws", get(ws_handler))
        .route("/metrics", get(get_metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn default_client() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
struct ConfigQuery {
    #[serde(default = "default_client")]
    client: String,
}

/// Current configuration for a client (the fallback when none stored).
async fn get_config(
    State(state): State<AppState>,
    Query(query): Query<ConfigQuery>,
) -> Json<ThresholdConfig> {
    Json(state.broker.store().get(&ClientId::new(query.client)))
}

#[derive(Debug, Deserialize)]
struct UpdateConfigRequest {
    #[serde(default = "default_client")]
    client: String,
    symbol: String,
    lower_bound: rust_decimal::Decimal,
    upper_bound: rust_decimal::Decimal,
}

/// Replace a client's configuration, all fields at once.
async fn update_config(
    State(state): State<AppState>,
    Json(request): Json<UpdateConfigRequest>,
) -> Result<Json<ThresholdConfig>, Response> {
    let client = ClientId::new(request.client);
    match state.broker.store().set(
        &client,
        &request.symbol,
        Price::new(request.lower_bound),
        Price::new(request.upper_bound),
    ) {
        Ok(config) => {
            info!(%client, symbol = %config.symbol, version = config.version, "Configuration updated");
            Ok(Json(config))
        }
        Err(e @ StoreError::InvalidBounds { .. }) => Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_bounds",
            e.to_string(),
        )),
        Err(e @ StoreError::InvalidSymbol(_)) => Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_symbol",
            e.to_string(),
        )),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            e.to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct PriceQuery {
    symbol: String,
}

/// One-shot snapshot price, straight from the upstream source.
async fn get_price(
    State(state): State<AppState>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceSample>, Response> {
    let symbol = Symbol::parse(&query.symbol).map_err(|e| {
        error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_symbol",
            e.to_string(),
        )
    })?;

    match state.feed.fetch_once(&symbol).await {
        Ok(sample) => Ok(Json(sample)),
        Err(e) => {
            warn!(%symbol, error = %e, "Snapshot fetch failed");
            Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "upstream_unavailable",
                e.to_string(),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    #[serde(default = "default_client")]
    client: String,
    symbol: String,
}

/// WebSocket upgrade handler for price stream sessions.
async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let symbol = match Symbol::parse(&query.symbol) {
        Ok(symbol) => symbol,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_symbol",
                e.to_string(),
            )
        }
    };

    if state.limiter.current_count() >= state.limiter.max {
        warn!(
            current = state.limiter.current_count(),
            "Stream connection limit reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    }

    ws.on_upgrade(move |socket| handle_stream_socket(socket, state, query.client, symbol))
}

/// Bridge one broker session onto a WebSocket.
async fn handle_stream_socket(socket: WebSocket, state: AppState, client: String, symbol: Symbol) {
    let _guard = match state.limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!("Connection limit reached during upgrade");
            return;
        }
    };

    let (session, mut updates) = state.broker.open(ClientId::new(client), symbol);
    let (mut sender, mut receiver) = socket.split();

    // Watch the incoming side for close frames and errors.
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(update) => {
                        let json = match serde_json::to_string(&update) {
                            Ok(json) => json,
                            Err(e) => {
                                debug!(error = %e, "Failed to serialize price update");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            debug!("Failed to send update, client disconnected");
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing session");
                break;
            }
        }
    }

    state.broker.close(&session.id);
    info!(session_id = %session.id, "Stream socket closed");
}

/// Prometheus text exposition.
async fn get_metrics() -> String {
    metrics::gather_text()
}

/// Run the HTTP server until the listener fails.
pub async fn run_server(
    broker: Arc<StreamBroker>,
    feed: Arc<PriceFeed>,
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState::new(broker, feed, &config);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(port = config.port, "Starting pricewatch server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
