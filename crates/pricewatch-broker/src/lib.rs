//! Stream broker for live price fan-out.
//!
//! Holds live subscriber sessions keyed by id, routes each incoming
//! price sample to the sessions watching that symbol, and evaluates
//! threshold breaches against the owning client's configuration.
//! Delivery is best-effort: a slow or disconnected session drops
//! updates rather than blocking the rest of the fan-out.
//!
//! Also hosts the HTTP/WS server exposing the control-plane operations
//! and the price stream.

pub mod broker;
pub mod server;

pub use broker::{run_pump, StreamBroker, SESSION_BUFFER};
pub use server::{create_router, run_server, AppState, ServerConfig};
