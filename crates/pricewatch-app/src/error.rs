//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] pricewatch_store::StoreError),

    #[error("Feed error: {0}")]
    Feed(#[from] pricewatch_feed::FeedError),

    #[error("Client error: {0}")]
    Client(#[from] pricewatch_client::ClientError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pricewatch_telemetry::TelemetryError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
