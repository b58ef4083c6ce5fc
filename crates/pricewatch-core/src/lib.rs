//! Core domain types for the pricewatch synchronization subsystem.
//!
//! This crate provides the fundamental types used throughout the system:
//! - `Symbol`: canonical asset identifier (lower-case, non-empty)
//! - `Price`: precision-safe decimal price
//! - `ThresholdConfig`: per-client watch configuration with bounds
//! - `PriceSample`, `PriceUpdate`: feed samples and delivered messages
//! - `SessionId`, `SessionState`: stream session identity and lifecycle

pub mod error;
pub mod price;
pub mod sample;
pub mod session;
pub mod symbol;
pub mod threshold;

pub use error::{CoreError, Result};
pub use price::Price;
pub use sample::{PriceSample, PriceUpdate};
pub use session::{SessionId, SessionState, StreamSession};
pub use symbol::Symbol;
pub use threshold::{ClientId, ThresholdConfig};
