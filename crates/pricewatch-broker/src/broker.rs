//! Session registry and sample fan-out.

use dashmap::DashMap;
use pricewatch_core::{
    ClientId, PriceSample, PriceUpdate, SessionId, SessionState, StreamSession, Symbol,
};
use pricewatch_store::ThresholdStore;
use pricewatch_telemetry::metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-session delivery buffer.
///
/// A session that falls this far behind starts losing updates; the
/// client's periodic snapshot fetch is the correctness backstop, not
/// the stream.
pub const SESSION_BUFFER: usize = 32;

struct SessionEntry {
    session: StreamSession,
    tx: mpsc::Sender<PriceUpdate>,
}

/// Routes price samples to watching sessions and evaluates breaches.
pub struct StreamBroker {
    sessions: DashMap<SessionId, SessionEntry>,
    store: Arc<ThresholdStore>,
    /// Latest sample seen per symbol, pushed to new sessions on open.
    last_samples: DashMap<Symbol, PriceSample>,
}

impl StreamBroker {
    pub fn new(store: Arc<ThresholdStore>) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            last_samples: DashMap::new(),
        }
    }

    /// The threshold store backing breach evaluation.
    pub fn store(&self) -> &Arc<ThresholdStore> {
        &self.store
    }

    /// Register a session watching one symbol.
    ///
    /// Returns the broker-side session record and the receiving end of
    /// its delivery channel. If a sample for the symbol has already
    /// been seen, it is pushed immediately so a new subscriber is not
    /// left waiting for the next poll.
    pub fn open(
        &self,
        client_id: ClientId,
        symbol: Symbol,
    ) -> (StreamSession, mpsc::Receiver<PriceUpdate>) {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);

        let mut session = StreamSession::open(client_id, symbol);
        session.state = SessionState::Connected;

        if let Some(sample) = self.last_samples.get(&session.symbol) {
            let config = self.store.get(&session.client_id);
            let breached = config.applies_to(&sample.symbol) && config.is_breach(sample.price);
            let _ = tx.try_send(PriceUpdate::new(&sample, breached));
        }

        info!(
            session_id = %session.id,
            client = %session.client_id,
            symbol = %session.symbol,
            "Stream session opened"
        );

        self.sessions.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                tx,
            },
        );
        metrics::OPEN_SESSIONS.set(self.sessions.len() as i64);

        (session, rx)
    }

    /// Close a session. Idempotent.
    ///
    /// The registry entry is removed before returning, so no delivery
    /// can happen after close even for samples already in flight
    /// through `publish`.
    pub fn close(&self, id: &SessionId) {
        if let Some((_, entry)) = self.sessions.remove(id) {
            debug!(
                session_id = %id,
                symbol = %entry.session.symbol,
                "Stream session closed"
            );
            metrics::OPEN_SESSIONS.set(self.sessions.len() as i64);
        }
    }

    /// Fan a sample out to every session watching its symbol.
    ///
    /// For each delivery the owning client's configuration is read
    /// fresh, so a committed `set` is visible to the very next
    /// evaluation. Breach evaluation never waits on delivery: updates
    /// go out via `try_send` and a full buffer drops the update for
    /// that session only.
    pub fn publish(&self, sample: &PriceSample) {
        metrics::SAMPLES_PUBLISHED_TOTAL.inc();
        self.last_samples
            .insert(sample.symbol.clone(), sample.clone());

        let mut disconnected = Vec::new();

        for entry in self.sessions.iter() {
            if entry.session.symbol != sample.symbol {
                continue;
            }

            let config = self.store.get(&entry.session.client_id);
            // A configuration pointing at a different symbol means this
            // session is mid-transition; its bounds do not apply.
            let breached = config.applies_to(&sample.symbol) && config.is_breach(sample.price);
            if breached {
                metrics::BREACHES_TOTAL
                    .with_label_values(&[sample.symbol.as_str()])
                    .inc();
                info!(
                    client = %entry.session.client_id,
                    symbol = %sample.symbol,
                    price = %sample.price,
                    lower = %config.lower_bound,
                    upper = %config.upper_bound,
                    "Threshold breach"
                );
            }

            match entry.tx.try_send(PriceUpdate::new(sample, breached)) {
                Ok(()) => {
                    metrics::UPDATES_DELIVERED_TOTAL.inc();
                }
                Err(TrySendError::Full(_)) => {
                    metrics::UPDATES_DROPPED_TOTAL
                        .with_label_values(&["slow_consumer"])
                        .inc();
                    debug!(
                        session_id = %entry.session.id,
                        symbol = %sample.symbol,
                        "Session buffer full, update dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    metrics::UPDATES_DROPPED_TOTAL
                        .with_label_values(&["disconnected"])
                        .inc();
                    disconnected.push(entry.session.id);
                }
            }
        }

        // Removals happen outside the iteration to avoid re-entering
        // the map shards while holding iterator guards.
        for id in disconnected {
            self.close(&id);
        }
    }

    /// Distinct symbols watched by currently open sessions.
    pub fn watched_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .sessions
            .iter()
            .map(|entry| entry.session.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Drain the sample channel into the broker until cancelled.
///
/// A single pump task is the only publisher, which preserves the
/// upstream feed's emission order for every session.
pub async fn run_pump(
    broker: Arc<StreamBroker>,
    mut rx: mpsc::Receiver<PriceSample>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            sample = rx.recv() => {
                match sample {
                    Some(sample) => broker.publish(&sample),
                    None => {
                        info!("Sample channel closed, pump stopping");
                        return;
                    }
                }
            }
            () = shutdown.cancelled() => {
                info!("Broker pump shutting down");
                return;
            }
        }
    }
}
