//! Stream session identity and lifecycle.
//!
//! A session is one subscriber's live, symbol-scoped connection to the
//! broker. A session watches exactly one symbol for its whole lifetime;
//! changing the watched symbol means closing the session and opening a
//! new one, never re-targeting in place.

use crate::symbol::Symbol;
use crate::threshold::ClientId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique stream session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A live, symbol-scoped subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSession {
    pub id: SessionId,
    pub client_id: ClientId,
    pub symbol: Symbol,
    pub state: SessionState,
}

impl StreamSession {
    /// Create a session in `Connecting` state with a fresh id.
    pub fn open(client_id: ClientId, symbol: Symbol) -> Self {
        Self {
            id: SessionId::generate(),
            client_id,
            symbol,
            state: SessionState::Connecting,
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }
}
