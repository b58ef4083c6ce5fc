//! Control-plane abstraction consumed by the synchronization controller.
//!
//! The trait is dyn-compatible via boxed futures so the controller can
//! run against the in-process wiring or the remote HTTP/WS transport
//! without caring which.

use crate::error::ControlError;
use pricewatch_core::{
    ClientId, Price, PriceSample, PriceUpdate, SessionId, StreamSession, Symbol, ThresholdConfig,
};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Client-side end of one stream session.
///
/// Dropping the handle abandons any updates still buffered in it,
/// which is exactly what a symbol change wants: nothing delivered for
/// the old session can be observed once the handle is gone.
pub struct StreamHandle {
    pub session: StreamSession,
    pub updates: mpsc::Receiver<PriceUpdate>,
}

/// Control-plane operations exposed by the core to the client side.
pub trait ControlPlane: Send + Sync {
    /// Read the stored threshold configuration for a client.
    fn get_configuration(
        &self,
        client: ClientId,
    ) -> BoxFuture<'_, Result<ThresholdConfig, ControlError>>;

    /// Replace a client's configuration; rejected in full on invalid input.
    fn update_configuration(
        &self,
        client: ClientId,
        symbol: String,
        lower: Price,
        upper: Price,
    ) -> BoxFuture<'_, Result<ThresholdConfig, ControlError>>;

    /// One-shot snapshot price for a symbol.
    fn snapshot_price(&self, symbol: Symbol)
        -> BoxFuture<'_, Result<PriceSample, ControlError>>;

    /// Open a stream session bound to one symbol.
    fn open_stream(
        &self,
        client: ClientId,
        symbol: Symbol,
    ) -> BoxFuture<'_, Result<StreamHandle, ControlError>>;

    /// Close a stream session. Idempotent.
    fn close_stream(&self, session: SessionId) -> BoxFuture<'_, ()>;
}
