//! Session bookkeeping: who is connected, who may come back, and with
//! which token.
//!
//! `SessionManager` is a plain single-owner structure. The registry owns
//! it and runs on the control side, the same as the rooms.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use seatkeeper_protocol::PlayerId;

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Tracks every player session, keyed by player id, with a reverse index
/// from reconnect token to player.
#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
    tokens: HashMap<String, PlayerId>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            config,
        }
    }

    /// Opens a session with a fresh reconnect token.
    ///
    /// A disconnected or expired session for the same player is replaced
    /// and its old token stops working.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the player is connected.
    pub fn create(
        &mut self,
        player_id: PlayerId,
        screen_name: &str,
        avatar: &str,
    ) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if existing.is_connected() {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            self.tokens.remove(&existing.reconnect_token);
        }

        let token = generate_token();
        self.tokens.insert(token.clone(), player_id);
        let session = Session {
            player_id,
            screen_name: screen_name.to_owned(),
            avatar: avatar.to_owned(),
            state: SessionState::Connected,
            reconnect_token: token,
        };

        tracing::info!(%player_id, "session created");
        Ok(&*self.sessions.entry(player_id).insert_entry(session).into_mut())
    }

    /// Starts the grace period of a connected player.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] for unknown players,
    /// [`SessionError::NotConnected`] if already disconnected or expired.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        if !session.is_connected() {
            return Err(SessionError::NotConnected(player_id));
        }

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };
        tracing::info!(%player_id, "player disconnected, grace period started");
        Ok(())
    }

    /// Brings a disconnected session back with its token.
    ///
    /// A session found past its grace period is expired on the spot.
    pub fn reconnect(&mut self, token: &str) -> Result<&Session, SessionError> {
        let grace = self.grace();
        let player_id = *self.tokens.get(token).ok_or(SessionError::InvalidToken)?;
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;

        match session.state {
            SessionState::Connected => Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(player_id)),
            SessionState::Disconnected { since } if since.elapsed() > grace => {
                session.state = SessionState::Expired;
                Err(SessionError::SessionExpired(player_id))
            }
            SessionState::Disconnected { .. } => {
                session.state = SessionState::Connected;
                tracing::info!(%player_id, "session resumed");
                Ok(&*session)
            }
        }
    }

    /// Expires every disconnected session past its grace period and
    /// returns their ids.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = self.grace();
        let mut expired = Vec::new();
        for session in self.sessions.values_mut() {
            let SessionState::Disconnected { since } = session.state else {
                continue;
            };
            if since.elapsed() > grace {
                session.state = SessionState::Expired;
                expired.push(session.player_id);
                tracing::info!(player_id = %session.player_id, "session expired");
            }
        }
        expired
    }

    /// Forgets expired sessions and their tokens. Returns the ids removed.
    pub fn cleanup_expired(&mut self) -> Vec<PlayerId> {
        let mut removed = Vec::new();
        let tokens = &mut self.tokens;
        self.sessions.retain(|player_id, session| {
            if matches!(session.state, SessionState::Expired) {
                tokens.remove(&session.reconnect_token);
                removed.push(*player_id);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Session> {
        self.sessions.get(&player_id)
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.get(player_id).is_some_and(Session::is_connected)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn grace(&self) -> Duration {
        Duration::from_secs(self.config.reconnect_grace_secs)
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
