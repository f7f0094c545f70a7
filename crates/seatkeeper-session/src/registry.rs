//! The registry: the lobby, every game room, and every connected player.
//!
//! Rooms report what happens to them as [`RoomEvent`]s. The registry
//! collects them on a channel and applies them in
//! [`process_events`](Registry::process_events): players seated in a room
//! leave the lobby, players leaving a room come back to it, abandoned and
//! finished rooms are closed. Every operation below drains the channel
//! before returning, so callers only need `process_events` for events
//! raised by worker threads (finished games).
//!
//! ```text
//!  connect ──→ lobby ──(create/join/observe)──→ room ──(leave)──→ lobby
//!                ↑                                │
//!                └──────(game over / abandoned)───┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use seatkeeper_protocol::{PlayerId, RoomId};
use seatkeeper_room::{
    ConnectionState, LifecycleSink, NoticeSender, Participant, ParticipantRef, Room, RoomConfig,
    RoomEvent, RoomInfo, RuleEngine,
};
use tokio::sync::mpsc;

use crate::{Session, SessionConfig, SessionError, SessionManager};

/// Process-wide owner of rooms and sessions. Lives on the control side;
/// not shared between threads.
pub struct Registry<E: RuleEngine> {
    sessions: SessionManager,
    /// The handle each connected player is currently known by. After a
    /// player leaves a running game this is the stand-in.
    participants: HashMap<PlayerId, ParticipantRef>,
    lobby: Room<E>,
    rooms: BTreeMap<RoomId, Room<E>>,
    next_room_id: u64,
    sink: Arc<dyn LifecycleSink>,
    events: mpsc::UnboundedReceiver<RoomEvent>,
}

impl<E: RuleEngine> Registry<E> {
    pub fn new(config: SessionConfig) -> Self {
        let (tx, events) = mpsc::unbounded_channel::<RoomEvent>();
        let sink: Arc<dyn LifecycleSink> = Arc::new(tx);
        Self {
            sessions: SessionManager::new(config),
            participants: HashMap::new(),
            lobby: Room::lobby(Arc::clone(&sink)),
            rooms: BTreeMap::new(),
            next_room_id: 1,
            sink,
            events,
        }
    }

    // -----------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------

    /// Registers a freshly connected player and returns their reconnect
    /// token.
    ///
    /// The player lands in the lobby, unless a game they ran away from
    /// is still running: then they get their seat back.
    pub fn connect(
        &mut self,
        player_id: PlayerId,
        screen_name: &str,
        avatar: &str,
        channel: NoticeSender,
    ) -> Result<String, SessionError> {
        if player_id.0 <= 0 {
            return Err(SessionError::InvalidPlayerId(player_id));
        }
        let token = self
            .sessions
            .create(player_id, screen_name, avatar)?
            .reconnect_token
            .clone();
        self.attach(player_id, screen_name, avatar, channel)?;
        Ok(token)
    }

    /// Handles a dropped connection.
    ///
    /// The player leaves whatever room they were in (leaving a stand-in
    /// behind in a running game) and the lobby. Their session stays
    /// reconnectable for the grace period.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.sessions.disconnect(player_id)?;

        if let Err(e) = self.leave_room(player_id) {
            tracing::debug!(%player_id, error = %e, "leave on disconnect failed");
        }
        if let Some(participant) = self.participants.remove(&player_id) {
            if participant.room() == Some(RoomId::LOBBY) {
                if let Err(e) = self.lobby.remove_player(&participant) {
                    tracing::debug!(%player_id, error = %e, "lobby leave on disconnect failed");
                }
            }
        }
        self.process_events();
        Ok(())
    }

    /// Resumes a disconnected session with its token. Returns the player.
    pub fn reconnect(
        &mut self,
        token: &str,
        channel: NoticeSender,
    ) -> Result<PlayerId, SessionError> {
        let session = self.sessions.reconnect(token)?;
        let player_id = session.player_id;
        let screen_name = session.screen_name.clone();
        let avatar = session.avatar.clone();

        self.attach(player_id, &screen_name, &avatar, channel)?;
        Ok(player_id)
    }

    /// Expires sessions past their grace period. Returns their ids.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        self.sessions.expire_stale()
    }

    /// Forgets expired sessions. Returns their ids.
    pub fn cleanup_expired(&mut self) -> Vec<PlayerId> {
        self.sessions.cleanup_expired()
    }

    // -----------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------

    /// Opens a room with `owner` in its first seat.
    pub fn create_room(
        &mut self,
        owner: PlayerId,
        config: RoomConfig,
    ) -> Result<RoomId, SessionError> {
        let participant = self.lobby_participant(owner)?;
        let room_id = RoomId(self.next_room_id);
        self.next_room_id += 1;

        let mut room = Room::new(room_id, config, Arc::clone(&self.sink));
        let joined = room.add_player(participant);
        if let Err(e) = joined {
            self.process_events();
            return Err(e.into());
        }

        tracing::info!(%room_id, %owner, name = room.name(), "room created");
        self.rooms.insert(room_id, room);
        self.process_events();
        Ok(room_id)
    }

    pub fn join_room(&mut self, player_id: PlayerId, room_id: RoomId) -> Result<(), SessionError> {
        let participant = self.lobby_participant(player_id)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(SessionError::RoomNotFound(room_id))?;
        let joined = room.add_player(participant);
        self.process_events();
        Ok(joined?)
    }

    pub fn observe_room(
        &mut self,
        player_id: PlayerId,
        room_id: RoomId,
    ) -> Result<(), SessionError> {
        let participant = self.lobby_participant(player_id)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(SessionError::RoomNotFound(room_id))?;
        let observing = room.add_observer(participant);
        self.process_events();
        Ok(observing?)
    }

    /// Fills a seat of the player's room with a robot. Owner only.
    pub fn add_robot(&mut self, player_id: PlayerId) -> Result<PlayerId, SessionError> {
        let (participant, room_id) = self.seated_participant(player_id)?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(SessionError::RoomNotFound(room_id))?;
        let robot = room.add_robot(&participant);
        self.process_events();
        Ok(robot?)
    }

    /// Sends the player back to the lobby. Leaving a running game leaves
    /// a stand-in in the seat. Does nothing for players already in the
    /// lobby.
    pub fn leave_room(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        let participant = self.participant_or_err(player_id)?;
        let Some(room_id) = participant.room().filter(|id| !id.is_lobby()) else {
            return Ok(());
        };
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or(SessionError::RoomNotFound(room_id))?;
        let left = room.remove_player(&participant);
        self.process_events();
        Ok(left?)
    }

    /// Relays chat to the player's room, or to the lobby.
    pub fn chat(&mut self, player_id: PlayerId, payload: &str) -> Result<(), SessionError> {
        let participant = self.participant_or_err(player_id)?;
        let room = match participant.room() {
            Some(room_id) if !room_id.is_lobby() => self
                .rooms
                .get(&room_id)
                .ok_or(SessionError::RoomNotFound(room_id))?,
            _ => &self.lobby,
        };
        Ok(room.chat(&participant, payload)?)
    }

    /// Queues a player action for the rule engine of the player's room,
    /// as `"<id>,<action>"`.
    pub fn push_request(&mut self, player_id: PlayerId, action: &str) -> Result<(), SessionError> {
        let (_, room_id) = self.seated_participant(player_id)?;
        let room = self
            .rooms
            .get(&room_id)
            .ok_or(SessionError::RoomNotFound(room_id))?;
        Ok(room.push_request(format!("{},{action}", player_id.0))?)
    }

    // -----------------------------------------------------------------
    // Lifecycle events
    // -----------------------------------------------------------------

    /// Applies every pending room event. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::PlayerAdded { room, participant } => {
                if room.is_lobby() || self.lobby.find_player(participant.id()).is_none() {
                    return;
                }
                if let Err(e) = self.lobby.remove_player(&participant) {
                    tracing::warn!(player_id = %participant.id(), error = %e, "lobby removal failed");
                }
            }
            RoomEvent::PlayerRemoved { room, participant } => {
                let player_id = participant.id();
                if room.is_lobby()
                    || participant.is_robot()
                    || !participant.is_online()
                    || !self.sessions.is_connected(player_id)
                {
                    return;
                }
                self.participants.insert(player_id, Arc::clone(&participant));
                if let Err(e) = self.lobby.add_player(participant) {
                    tracing::warn!(%player_id, error = %e, "return to lobby failed");
                }
            }
            RoomEvent::StandInCreated { room, participant } => {
                tracing::debug!(room_id = %room, player_id = %participant.id(), "tracking stand-in");
                self.participants.insert(participant.id(), participant);
            }
            RoomEvent::RoomAbandoned { room } => {
                self.close_room(room);
            }
            RoomEvent::ParticipantRetired { participant, .. } => {
                let player_id = participant.id();
                let tracked = self
                    .participants
                    .get(&player_id)
                    .is_some_and(|p| Arc::ptr_eq(p, &participant));
                if tracked {
                    self.participants.remove(&player_id);
                }
            }
            RoomEvent::SessionFinished { room, session } => {
                let current = self
                    .rooms
                    .get(&room)
                    .is_some_and(|r| r.is_started() && r.session() == session);
                if current {
                    self.close_room(room);
                } else {
                    tracing::debug!(room_id = %room, session, "stale session finish ignored");
                }
            }
        }
    }

    /// Ends the room's game, sends everyone still online to the lobby,
    /// and drops the room.
    fn close_room(&mut self, room_id: RoomId) {
        let Some(mut room) = self.rooms.remove(&room_id) else {
            return;
        };

        let released = room.game_over();
        let observers = room.observers().to_vec();
        for observer in &observers {
            if let Err(e) = room.remove_observer(observer) {
                tracing::debug!(%room_id, observer = %observer.id(), error = %e, "observer removal failed");
            }
        }
        for participant in released {
            if !self.sessions.is_connected(participant.id()) {
                continue;
            }
            if let Err(e) = self.lobby.add_player(participant) {
                tracing::warn!(%room_id, error = %e, "return to lobby failed");
            }
        }
        tracing::info!(%room_id, "room closed");
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn lobby(&self) -> &Room<E> {
        &self.lobby
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room<E>> {
        self.rooms.get(&room_id)
    }

    /// All game rooms, by id.
    pub fn list_rooms(&self) -> Vec<RoomInfo> {
        self.rooms.values().map(Room::info).collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participant(&self, player_id: PlayerId) -> Option<ParticipantRef> {
        self.participants.get(&player_id).cloned()
    }

    pub fn session(&self, player_id: PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Binds a (re)connected player to their running seat if one is
    /// waiting, otherwise to a new participant in the lobby.
    fn attach(
        &mut self,
        player_id: PlayerId,
        screen_name: &str,
        avatar: &str,
        channel: NoticeSender,
    ) -> Result<ParticipantRef, SessionError> {
        let waiting_seat = self.rooms.values_mut().find(|room| {
            room.find_player(player_id)
                .is_some_and(|p| p.state() == ConnectionState::DisconnectedRunning)
        });
        if let Some(room) = waiting_seat {
            let seat = room.reconnect_player(player_id, channel)?;
            self.participants.insert(player_id, Arc::clone(&seat));
            self.process_events();
            return Ok(seat);
        }

        let participant = Arc::new(Participant::new(player_id, screen_name, avatar, channel));
        self.participants.insert(player_id, Arc::clone(&participant));
        let joined = self.lobby.add_player(Arc::clone(&participant));
        self.process_events();
        joined?;
        Ok(participant)
    }

    fn participant_or_err(&self, player_id: PlayerId) -> Result<ParticipantRef, SessionError> {
        self.participant(player_id)
            .ok_or(SessionError::NotFound(player_id))
    }

    fn lobby_participant(&self, player_id: PlayerId) -> Result<ParticipantRef, SessionError> {
        let participant = self.participant_or_err(player_id)?;
        if participant.room() != Some(RoomId::LOBBY) {
            return Err(SessionError::NotInLobby(player_id));
        }
        Ok(participant)
    }

    fn seated_participant(
        &self,
        player_id: PlayerId,
    ) -> Result<(ParticipantRef, RoomId), SessionError> {
        let participant = self.participant_or_err(player_id)?;
        match participant.room() {
            Some(room_id) if !room_id.is_lobby() => Ok((participant, room_id)),
            _ => Err(SessionError::NotInRoom(player_id)),
        }
    }
}

impl<E: RuleEngine> std::fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sessions", &self.sessions.len())
            .field("participants", &self.participants.len())
            .field("rooms", &self.rooms.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
