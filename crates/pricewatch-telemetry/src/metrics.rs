//! Prometheus metrics for pricewatch.
//!
//! Covers the diagnostics the subsystem is required to count internally:
//! sample fan-out, best-effort delivery drops, silently discarded
//! mismatched samples, breach events, and session/reconnect churn.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, which should crash at startup
//! rather than fail silently. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, IntCounter,
    IntGauge,
};

/// Total price samples published to the broker.
pub static SAMPLES_PUBLISHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pricewatch_samples_published_total",
        "Total price samples published to the stream broker"
    )
    .unwrap()
});

/// Total updates delivered to stream sessions.
pub static UPDATES_DELIVERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pricewatch_updates_delivered_total",
        "Total price updates delivered to stream sessions"
    )
    .unwrap()
});

/// Updates dropped instead of delivered, by reason (best-effort delivery).
pub static UPDATES_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricewatch_updates_dropped_total",
        "Price updates dropped instead of delivered",
        &["reason"]
    )
    .unwrap()
});

/// Samples discarded by the client-side symbol filter.
///
/// Not an error: these indicate a session not yet torn down after a
/// symbol change. Counted for diagnostics only.
pub static SYMBOL_MISMATCH_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pricewatch_symbol_mismatch_total",
        "Samples silently discarded because their symbol did not match the active configuration"
    )
    .unwrap()
});

/// Threshold breach events, by symbol.
pub static BREACHES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricewatch_breaches_total",
        "Price samples strictly outside the configured band",
        &["symbol"]
    )
    .unwrap()
});

/// Failed upstream polls (transient; retried next interval).
pub static POLL_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pricewatch_poll_failures_total",
        "Failed upstream price polls"
    )
    .unwrap()
});

/// Client-side stream reconnect attempts.
pub static RECONNECTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pricewatch_reconnects_total",
        "Client stream reconnect attempts"
    )
    .unwrap()
});

/// Currently open broker sessions.
pub static OPEN_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pricewatch_open_sessions",
        "Stream sessions currently registered with the broker"
    )
    .unwrap()
});

/// Gather all registered metrics in Prometheus text format.
pub fn gather_text() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buf = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buf).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}
