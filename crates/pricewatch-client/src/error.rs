//! Client error types.

use crate::controller::SyncState;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by control-plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Invalid bounds: lower {lower} exceeds upper {upper}")]
    InvalidBounds { lower: Decimal, upper: Decimal },

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Transport dropped: {0}")]
    Transport(String),
}

/// Errors surfaced by the synchronization controller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("Controller is not streaming (state: {0})")]
    NotStreaming(SyncState),
}

pub type ClientResult<T> = Result<T, ClientError>;
