//! Upstream price feed adapter.
//!
//! Pulls raw price samples for a symbol from an upstream source,
//! either on demand (`fetch_once`, used for the initial snapshot) or
//! on a fixed cadence (`run_poller`), independent of subscribers.

pub mod adapter;
pub mod error;
pub mod poller;

pub use adapter::PriceFeed;
pub use error::{FeedError, FeedResult};
pub use poller::{run_poller, WatchList};
