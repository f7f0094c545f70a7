//! Session types: the server's record of one player's connection.

use std::time::Instant;

use seatkeeper_protocol::PlayerId;

/// Default reconnection grace period, in seconds.
pub const DEFAULT_RECONNECT_GRACE_SECS: u64 = 30;

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected player may take to come back with their
    /// reconnect token. `0` disables reconnection.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: DEFAULT_RECONNECT_GRACE_SECS,
        }
    }
}

/// Lifecycle of a session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    Connected,

    /// Disconnected at `since`; reconnecting is possible until the grace
    /// period runs out.
    Disconnected { since: Instant },

    /// Waiting for [`cleanup_expired`](crate::SessionManager::cleanup_expired).
    Expired,
}

/// One player's session.
///
/// The identity fields outlive the player's participant object, so a
/// reconnecting player can be rebuilt when their seat is gone.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub screen_name: String,
    pub avatar: String,
    pub state: SessionState,
    /// 32 hex characters, handed to the client on connect.
    pub reconnect_token: String,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}
