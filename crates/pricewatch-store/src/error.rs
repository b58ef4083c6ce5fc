//! Store error types.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid bounds: lower {lower} exceeds upper {upper}")]
    InvalidBounds { lower: Decimal, upper: Decimal },

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
