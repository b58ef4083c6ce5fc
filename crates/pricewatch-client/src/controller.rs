//! Client synchronization controller.
//!
//! State machine per client instance:
//!
//! ```text
//! Uninitialized -> LoadingConfig -> LoadingSnapshot -> Streaming
//!                     Streaming  -> Reconciling -> LoadingSnapshot -> Streaming
//!                     Streaming  -> Closed
//! ```
//!
//! The controller owns its stream session handle; changing the watched
//! symbol closes the session and opens a new one. The configuration
//! update is committed (or rejected) strictly before the new session
//! is opened, so a fresh session never runs with stale bounds.

use crate::backoff::Backoff;
use crate::control::{ControlPlane, StreamHandle};
use crate::error::{ClientError, ClientResult, ControlError};
use pricewatch_core::{
    ClientId, Price, PriceSample, PriceUpdate, SessionState, ThresholdConfig,
};
use pricewatch_telemetry::metrics;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    LoadingConfig,
    LoadingSnapshot,
    Streaming,
    Reconciling,
    Closed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::LoadingConfig => write!(f, "loading-config"),
            Self::LoadingSnapshot => write!(f, "loading-snapshot"),
            Self::Streaming => write!(f, "streaming"),
            Self::Reconciling => write!(f, "reconciling"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// The most recently accepted sample for the configured symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayedPrice {
    Unknown,
    Price(PriceSample),
}

impl DisplayedPrice {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Price(_))
    }

    pub fn sample(&self) -> Option<&PriceSample> {
        match self {
            Self::Price(sample) => Some(sample),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for DisplayedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "--"),
            Self::Price(sample) => write!(
                f,
                "{}: ${}",
                sample.symbol.as_str().to_uppercase(),
                sample.price
            ),
        }
    }
}

/// Per-client synchronization controller.
pub struct ClientSyncController {
    control: Arc<dyn ControlPlane>,
    client: ClientId,
    state: SyncState,
    config: ThresholdConfig,
    displayed: DisplayedPrice,
    stream: Option<StreamHandle>,
    backoff: Backoff,
    mismatch_discards: u64,
}

impl ClientSyncController {
    pub fn new(control: Arc<dyn ControlPlane>, client: ClientId, backoff: Backoff) -> Self {
        Self {
            control,
            client,
            state: SyncState::Uninitialized,
            config: ThresholdConfig::fallback(),
            displayed: DisplayedPrice::Unknown,
            stream: None,
            backoff,
            mismatch_discards: 0,
        }
    }

    /// Bring the controller from `Uninitialized` to `Streaming`.
    ///
    /// A failed configuration read falls back to the hard-coded default
    /// rather than blocking; a failed snapshot leaves the placeholder in
    /// place until the stream delivers.
    pub async fn start(&mut self) -> ClientResult<()> {
        self.state = SyncState::LoadingConfig;
        match self.control.get_configuration(self.client.clone()).await {
            Ok(config) => self.config = config,
            Err(e) => {
                warn!(client = %self.client, error = %e, "Configuration read failed, using fallback");
                self.config = ThresholdConfig::fallback();
            }
        }

        self.state = SyncState::LoadingSnapshot;
        self.load_snapshot().await;

        self.open_session().await?;
        info!(
            client = %self.client,
            symbol = %self.config.symbol,
            "Controller streaming"
        );
        Ok(())
    }

    /// Seed `DisplayedPrice` with a one-shot snapshot for the active
    /// symbol so the user is never shown "unknown" longer than one
    /// round trip.
    async fn load_snapshot(&mut self) {
        match self.control.snapshot_price(self.config.symbol.clone()).await {
            Ok(sample) if sample.symbol == self.config.symbol => {
                self.displayed = DisplayedPrice::Price(sample);
            }
            Ok(sample) => {
                self.discard_mismatch(&sample.symbol);
            }
            Err(e) => {
                warn!(symbol = %self.config.symbol, error = %e, "Snapshot fetch failed, placeholder retained");
            }
        }
    }

    async fn open_session(&mut self) -> ClientResult<()> {
        let handle = self
            .control
            .open_stream(self.client.clone(), self.config.symbol.clone())
            .await?;
        self.stream = Some(handle);
        self.state = SyncState::Streaming;
        self.backoff.reset();
        Ok(())
    }

    /// Receive the next accepted update, reconnecting across transport
    /// drops.
    ///
    /// Returns `Ok(None)` once the controller is closed. Samples whose
    /// symbol does not match the active configuration are discarded
    /// silently (they indicate a session not yet torn down after a
    /// symbol change) and counted for diagnostics.
    pub async fn next_update(&mut self) -> ClientResult<Option<PriceUpdate>> {
        loop {
            if self.state == SyncState::Closed {
                return Ok(None);
            }

            let Some(stream) = self.stream.as_mut() else {
                self.reconnect().await?;
                continue;
            };

            match stream.updates.recv().await {
                Some(update) => {
                    if update.symbol != self.config.symbol {
                        self.discard_mismatch(&update.symbol);
                        continue;
                    }
                    self.displayed = DisplayedPrice::Price(PriceSample {
                        symbol: update.symbol.clone(),
                        price: update.price,
                        observed_at: update.observed_at,
                    });
                    return Ok(Some(update));
                }
                None => {
                    self.reconnect().await?;
                }
            }
        }
    }

    /// Re-open the stream session after a transport drop.
    ///
    /// The configuration is assumed unchanged unless the user updates
    /// it explicitly, so no configuration read happens here.
    async fn reconnect(&mut self) -> ClientResult<()> {
        if let Some(mut handle) = self.stream.take() {
            handle.session.state = SessionState::Reconnecting;
            // Release any transport-side resources tied to the dead
            // session before replacing it.
            self.control.close_stream(handle.session.id).await;
        }

        loop {
            let Some(delay) = self.backoff.next_delay() else {
                return Err(ClientError::Control(ControlError::Transport(
                    "reconnect attempts exhausted".to_string(),
                )));
            };

            metrics::RECONNECTS_TOTAL.inc();
            warn!(
                client = %self.client,
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Stream dropped, reconnecting"
            );
            tokio::time::sleep(delay).await;

            match self
                .control
                .open_stream(self.client.clone(), self.config.symbol.clone())
                .await
            {
                Ok(handle) => {
                    self.stream = Some(handle);
                    self.state = SyncState::Streaming;
                    self.backoff.reset();
                    info!(client = %self.client, "Stream restored");
                    return Ok(());
                }
                Err(e) => {
                    warn!(client = %self.client, error = %e, "Reconnect attempt failed");
                }
            }
        }
    }

    /// Atomically change the watched symbol and/or bounds.
    ///
    /// The store commit comes first; a rejected update leaves the
    /// controller in `Streaming` with the old configuration and display
    /// untouched. On acceptance the old session is closed before the
    /// new one is opened, so no cross-symbol sample can be delivered
    /// mid-transition.
    pub async fn update_configuration(
        &mut self,
        symbol: &str,
        lower: Price,
        upper: Price,
    ) -> ClientResult<ThresholdConfig> {
        if self.state != SyncState::Streaming {
            return Err(ClientError::NotStreaming(self.state));
        }

        let accepted = self
            .control
            .update_configuration(self.client.clone(), symbol.to_string(), lower, upper)
            .await?;

        self.state = SyncState::Reconciling;
        if let Some(handle) = self.stream.take() {
            self.control.close_stream(handle.session.id).await;
            // Dropping the handle discards anything still buffered for
            // the old session.
        }

        let symbol_changed = accepted.symbol != self.config.symbol;
        self.config = accepted.clone();
        if symbol_changed {
            self.displayed = DisplayedPrice::Unknown;
        }

        self.state = SyncState::LoadingSnapshot;
        self.load_snapshot().await;
        self.open_session().await?;

        info!(
            client = %self.client,
            symbol = %self.config.symbol,
            version = self.config.version,
            "Configuration reconciled"
        );
        Ok(accepted)
    }

    /// Close the active session and stop accepting samples.
    pub async fn shutdown(&mut self) {
        if self.state == SyncState::Closed {
            return;
        }
        self.state = SyncState::Closed;
        if let Some(handle) = self.stream.take() {
            self.control.close_stream(handle.session.id).await;
        }
        info!(client = %self.client, "Controller closed");
    }

    fn discard_mismatch(&mut self, got: &pricewatch_core::Symbol) {
        self.mismatch_discards += 1;
        metrics::SYMBOL_MISMATCH_TOTAL.inc();
        debug!(
            got = %got,
            want = %self.config.symbol,
            "Discarded sample for non-active symbol"
        );
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn configuration(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn displayed_price(&self) -> &DisplayedPrice {
        &self.displayed
    }

    pub fn mismatch_discards(&self) -> u64 {
        self.mismatch_discards
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client
    }
}
