//! Client-side price synchronization.
//!
//! The `ClientSyncController` reconciles three views of one asset's
//! price into a single authoritative value: the stored threshold
//! configuration, a one-shot snapshot, and an indefinite stream of
//! push updates. It owns its stream session handle outright; there is
//! no process-wide connection state.

pub mod backoff;
pub mod control;
pub mod controller;
pub mod error;
pub mod remote;

pub use backoff::{Backoff, BackoffConfig};
pub use control::{BoxFuture, ControlPlane, StreamHandle};
pub use controller::{ClientSyncController, DisplayedPrice, SyncState};
pub use error::{ClientError, ClientResult, ControlError};
pub use remote::RemoteControlPlane;
