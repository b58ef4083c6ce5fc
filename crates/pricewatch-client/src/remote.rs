//! Remote control plane over HTTP and WebSocket.
//!
//! Talks to the pricewatch server: REST for configuration and
//! snapshots, a WebSocket per stream session. Reconnection is the
//! controller's responsibility; this layer only reports the drop by
//! ending the update channel.

use crate::control::{BoxFuture, ControlPlane, StreamHandle};
use crate::error::ControlError;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use pricewatch_core::{
    ClientId, Price, PriceSample, PriceUpdate, SessionId, SessionState, StreamSession, Symbol,
    ThresholdConfig,
};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default timeout for control-plane requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-session update buffer on the client side.
const UPDATE_BUFFER: usize = 32;

/// HTTP/WS implementation of the control plane.
pub struct RemoteControlPlane {
    http: reqwest::Client,
    base_url: String,
    /// Cancellation tokens for the reader task of each open session.
    sessions: DashMap<SessionId, CancellationToken>,
}

impl RemoteControlPlane {
    /// Create a client for a server base URL (e.g. "http://127.0.0.1:5000").
    pub fn new(base_url: impl Into<String>) -> Result<Self, ControlError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ControlError::Transport(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            http,
            base_url,
            sessions: DashMap::new(),
        })
    }

    fn ws_base(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        }
    }
}

/// Shape of the server's error payload.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    kind: String,
    error: String,
}

async fn rejection_to_error(
    response: reqwest::Response,
    lower: Price,
    upper: Price,
) -> ControlError {
    let status = response.status();
    let body: Option<ErrorBody> = response.json().await.ok();
    match body {
        Some(body) if body.kind == "invalid_bounds" => ControlError::InvalidBounds {
            lower: lower.inner(),
            upper: upper.inner(),
        },
        Some(body) if body.kind == "invalid_symbol" => ControlError::InvalidSymbol(body.error),
        Some(body) if body.kind == "upstream_unavailable" => ControlError::Upstream(body.error),
        Some(body) => ControlError::Transport(format!("HTTP {status}: {}", body.error)),
        None => ControlError::Transport(format!("HTTP {status}")),
    }
}

impl ControlPlane for RemoteControlPlane {
    fn get_configuration(
        &self,
        client: ClientId,
    ) -> BoxFuture<'_, Result<ThresholdConfig, ControlError>> {
        Box::pin(async move {
            let url = format!("{}/api/config?client={}", self.base_url, client);
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| ControlError::Transport(format!("HTTP request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(ControlError::Transport(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            response
                .json::<ThresholdConfig>()
                .await
                .map_err(|e| ControlError::Transport(format!("Bad configuration payload: {e}")))
        })
    }

    fn update_configuration(
        &self,
        client: ClientId,
        symbol: String,
        lower: Price,
        upper: Price,
    ) -> BoxFuture<'_, Result<ThresholdConfig, ControlError>> {
        Box::pin(async move {
            let url = format!("{}/api/config", self.base_url);
            let body = json!({
                "client": client.as_str(),
                "symbol": symbol,
                "lower_bound": lower,
                "upper_bound": upper,
            });

            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| ControlError::Transport(format!("HTTP request failed: {e}")))?;

            if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
                return Err(rejection_to_error(response, lower, upper).await);
            }
            if !response.status().is_success() {
                return Err(ControlError::Transport(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            response
                .json::<ThresholdConfig>()
                .await
                .map_err(|e| ControlError::Transport(format!("Bad configuration payload: {e}")))
        })
    }

    fn snapshot_price(
        &self,
        symbol: Symbol,
    ) -> BoxFuture<'_, Result<PriceSample, ControlError>> {
        Box::pin(async move {
            let url = format!("{}/api/price?symbol={}", self.base_url, symbol);
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| ControlError::Transport(format!("HTTP request failed: {e}")))?;

            if response.status() == StatusCode::SERVICE_UNAVAILABLE {
                let body: Option<ErrorBody> = response.json().await.ok();
                return Err(ControlError::Upstream(
                    body.map(|b| b.error).unwrap_or_else(|| "unavailable".to_string()),
                ));
            }
            if !response.status().is_success() {
                return Err(ControlError::Transport(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            response
                .json::<PriceSample>()
                .await
                .map_err(|e| ControlError::Transport(format!("Bad snapshot payload: {e}")))
        })
    }

    fn open_stream(
        &self,
        client: ClientId,
        symbol: Symbol,
    ) -> BoxFuture<'_, Result<StreamHandle, ControlError>> {
        Box::pin(async move {
            let url = format!(
                "{}/ws?client={}&symbol={}",
                self.ws_base(),
                client,
                symbol
            );

            let (ws_stream, _response) = connect_async(&url)
                .await
                .map_err(|e| ControlError::Transport(format!("WebSocket connect failed: {e}")))?;

            let mut session = StreamSession::open(client, symbol);
            session.state = SessionState::Connected;

            let token = CancellationToken::new();
            self.sessions.insert(session.id, token.clone());

            let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
            let session_id = session.id;
            tokio::spawn(run_stream_reader(ws_stream, tx, token, session_id));

            Ok(StreamHandle {
                session,
                updates: rx,
            })
        })
    }

    fn close_stream(&self, session: SessionId) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some((_, token)) = self.sessions.remove(&session) {
                token.cancel();
                debug!(session_id = %session, "Stream session cancelled");
            }
        })
    }
}

/// Pump WebSocket frames into the update channel until the socket
/// drops or the session is cancelled.
async fn run_stream_reader(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    tx: mpsc::Sender<PriceUpdate>,
    token: CancellationToken,
    session_id: SessionId,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            () = token.cancelled() => {
                let _ = write.send(Message::Close(None)).await;
                debug!(session_id = %session_id, "Stream reader closed by controller");
                return;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let update: PriceUpdate = match serde_json::from_str(&text) {
                            Ok(update) => update,
                            Err(e) => {
                                warn!(session_id = %session_id, error = %e, "Unparseable stream frame");
                                continue;
                            }
                        };
                        if tx.send(update).await.is_err() {
                            // Handle dropped on the controller side.
                            let _ = write.send(Message::Close(None)).await;
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(session_id = %session_id, "Stream socket closed by server");
                        return;
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "Stream socket error");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_base_scheme_mapping() {
        let remote = RemoteControlPlane::new("http://localhost:5000/").unwrap();
        assert_eq!(remote.ws_base(), "ws://localhost:5000");

        let remote = RemoteControlPlane::new("https://example.com").unwrap();
        assert_eq!(remote.ws_base(), "wss://example.com");
    }
}
