//! Structured logging and Prometheus metrics for pricewatch.
//!
//! - Structured JSON logging with tracing (pretty output in development)
//! - Counters and gauges for sample fan-out, breaches, and session churn

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
