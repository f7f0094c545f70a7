//! The room: seats, observers, ownership, and the game session boundary.
//!
//! A room is owned and mutated by the control side only (whatever task
//! handles the network). While a game runs, a dedicated worker thread
//! drives the rule engine; the two sides meet exclusively in the
//! [`RequestQueue`].
//!
//! Seats are stored by id (`players`, in join order) with a separate
//! table from id to the participant currently sitting there (`seats`).
//! When a player leaves a running game the seat and its participant stay
//! put and the player's connection moves to a fresh stand-in, so the
//! rule engine's view of who sits where never changes mid-game.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::JoinHandle;

use seatkeeper_protocol::{Notice, PlayerId, Request, RoomId};
use serde_json::{Map, Value};

use crate::engine::{SeatInfo, SessionSetup, spawn_worker};
use crate::{
    LifecycleSink, NoticeSender, Participant, ParticipantRef, RequestQueue, RoomConfig, RoomError,
    RoomEvent, RuleEngine,
};

/// Shown to anyone trying to sit in a full or running room.
pub const ROOM_UNAVAILABLE: &str = "Room is full or already started!";

/// Extra notice for a player trying to get back into the game they ran
/// away from.
pub const RUNNING_AWAY: &str = "Running away is shameful.";

/// Shown to anyone trying to observe a room whose game has not started.
pub const OBSERVE_NOT_RUNNING: &str = "Can only observe running room.";

/// Chat `type` that only players get to see, tagged with the sender's
/// name.
pub const PUBLIC_PLAYER_CHAT: i64 = 1;

/// Avatar given to robots.
pub const ROBOT_AVATAR: &str = "guanyu";

/// First robot id. `-1` means "no player" to clients.
const FIRST_ROBOT_ID: i64 = -2;

/// A snapshot of room metadata, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub name: String,
    pub player_count: usize,
    pub capacity: usize,
    pub started: bool,
}

/// One game room, or the lobby when its id is [`RoomId::LOBBY`].
pub struct Room<E: RuleEngine> {
    id: RoomId,
    config: RoomConfig,
    /// Seat ids in join order.
    players: Vec<PlayerId>,
    /// Seat id → participant sitting there.
    seats: HashMap<PlayerId, ParticipantRef>,
    observers: Vec<ParticipantRef>,
    owner: Option<PlayerId>,
    game_started: bool,
    abandoned: bool,
    runned_players: HashSet<PlayerId>,
    next_robot_id: i64,
    /// Incremented by every `run`.
    session: u64,
    requests: RequestQueue,
    events: Arc<dyn LifecycleSink>,
    worker: Option<JoinHandle<()>>,
    _engine: PhantomData<fn() -> E>,
}

impl<E: RuleEngine> Room<E> {
    /// Creates an empty room. Id allocation is the caller's job.
    pub fn new(id: RoomId, config: RoomConfig, events: Arc<dyn LifecycleSink>) -> Self {
        let requests = RequestQueue::new(id, config.request_queue_bound);
        Self {
            id,
            config,
            players: Vec::new(),
            seats: HashMap::new(),
            observers: Vec::new(),
            owner: None,
            game_started: false,
            abandoned: false,
            runned_players: HashSet::new(),
            next_robot_id: FIRST_ROBOT_ID,
            session: 0,
            requests,
            events,
            worker: None,
            _engine: PhantomData,
        }
    }

    /// Creates the lobby.
    pub fn lobby(events: Arc<dyn LifecycleSink>) -> Self {
        Self::new(RoomId::LOBBY, RoomConfig::lobby(), events)
    }

    // -----------------------------------------------------------------
    // Seats
    // -----------------------------------------------------------------

    /// Seats a participant.
    ///
    /// A full or running room turns the participant away with an
    /// `ErrorMsg` (two, if they ran away from this very game). Otherwise
    /// the current players learn about the newcomer, the newcomer gets a
    /// full snapshot of the room, and a room that just filled up starts
    /// its game.
    pub fn add_player(&mut self, participant: ParticipantRef) -> Result<(), RoomError> {
        let player_id = participant.id();

        if self.is_full() || self.game_started {
            participant.notify(Notice::error(ROOM_UNAVAILABLE));
            if self.runned_players.contains(&player_id) {
                participant.notify(Notice::error(RUNNING_AWAY));
            }
            tracing::debug!(room_id = %self.id, %player_id, "room unavailable, join rejected");
            return Err(if self.game_started {
                RoomError::AlreadyStarted(self.id)
            } else {
                RoomError::RoomFull(self.id)
            });
        }
        if self.seats.contains_key(&player_id) || self.is_observer(player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.id));
        }

        if !self.is_lobby() {
            self.broadcast(&participant.add_player_notice());
        }

        self.players.push(player_id);
        self.seats.insert(player_id, Arc::clone(&participant));
        participant.set_room(Some(self.id));

        if self.is_lobby() {
            participant.notify(Notice::EnterLobby);
        } else {
            if self.owner.is_none() {
                self.owner = Some(player_id);
            }
            self.send_snapshot(&participant);
        }

        tracing::info!(
            room_id = %self.id,
            %player_id,
            players = self.players.len(),
            "player joined"
        );

        if !self.is_lobby() && self.is_full() && !self.game_started {
            if let Err(e) = self.run() {
                tracing::error!(room_id = %self.id, error = %e, "auto-start failed");
            }
        }

        self.events.emit(RoomEvent::PlayerAdded {
            room: self.id,
            participant,
        });
        Ok(())
    }

    /// Seats a new robot on behalf of the owner. Returns the robot's id.
    ///
    /// # Errors
    /// [`RoomError::NotOwner`] unless `requester` owns the room,
    /// [`RoomError::RoomFull`] when no seat is free, plus anything
    /// [`add_player`](Self::add_player) rejects.
    pub fn add_robot(&mut self, requester: &Participant) -> Result<PlayerId, RoomError> {
        if self.owner != Some(requester.id()) {
            return Err(RoomError::NotOwner(requester.id(), self.id));
        }
        if self.is_full() {
            return Err(RoomError::RoomFull(self.id));
        }

        let robot_id = PlayerId(self.next_robot_id);
        self.next_robot_id -= 1;
        let robot = Participant::robot(robot_id, format!("COMP{}", robot_id.0), ROBOT_AVATAR);
        self.add_player(Arc::new(robot))?;
        Ok(robot_id)
    }

    /// Takes a participant out of the room.
    ///
    /// Observers go through [`remove_observer`](Self::remove_observer).
    /// Before the game starts the seat is simply freed. Once it runs the
    /// seat stays: the participant sitting there turns
    /// `DisconnectedRunning` and gives its connection to a stand-in, which
    /// is what the registry gets back.
    pub fn remove_player(&mut self, participant: &ParticipantRef) -> Result<(), RoomError> {
        let player_id = participant.id();
        if self.is_observer(player_id) {
            return self.remove_observer(participant);
        }
        let Some(seat) = self.seats.get(&player_id).cloned() else {
            return Err(RoomError::NotInRoom(player_id, self.id));
        };

        if !self.game_started {
            self.players.retain(|id| *id != player_id);
            self.seats.remove(&player_id);
            seat.leave_room(self.id);
            tracing::info!(room_id = %self.id, %player_id, "player left");
            self.events.emit(RoomEvent::PlayerRemoved {
                room: self.id,
                participant: seat,
            });

            if self.is_lobby() {
                return Ok(());
            }
            self.broadcast(&Notice::RemovePlayer { id: player_id });
        } else {
            let Some(channel) = seat.start_running() else {
                return Err(RoomError::InvalidState(format!(
                    "player {player_id} in room {} is not online",
                    self.id
                )));
            };
            self.runned_players.insert(player_id);

            let stand_in = Arc::new(seat.stand_in(channel));
            tracing::info!(room_id = %self.id, %player_id, "player ran away, seat kept");
            self.events.emit(RoomEvent::StandInCreated {
                room: self.id,
                participant: Arc::clone(&stand_in),
            });
            self.events.emit(RoomEvent::PlayerRemoved {
                room: self.id,
                participant: stand_in,
            });
        }

        // A running-away owner keeps the seat, and with it the room.
        if self.owner == Some(player_id) && !self.seats.contains_key(&player_id) {
            match self.players.first() {
                Some(&first) => self.set_owner(first),
                None => self.owner = None,
            }
        }
        if self.is_abandoned() && !self.abandoned {
            self.abandoned = true;
            tracing::info!(room_id = %self.id, "room abandoned");
            self.events.emit(RoomEvent::RoomAbandoned { room: self.id });
        }
        Ok(())
    }

    /// Gives a running-away player their seat back.
    ///
    /// The seat goes `Online` with `channel`, the player receives the
    /// room snapshot again, and the rule engine gets `"<id>,reconnect"`.
    pub fn reconnect_player(
        &mut self,
        player_id: PlayerId,
        channel: NoticeSender,
    ) -> Result<ParticipantRef, RoomError> {
        let Some(seat) = self.seats.get(&player_id).cloned() else {
            return Err(RoomError::NotInRoom(player_id, self.id));
        };
        if !seat.come_back(channel) {
            return Err(RoomError::NotRunning(player_id, self.id));
        }

        tracing::info!(room_id = %self.id, %player_id, "player reconnected to seat");
        self.send_snapshot(&seat);
        self.push_internal(Request::Reconnect(player_id));
        Ok(seat)
    }

    // -----------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------

    /// Attaches an observer to the running game.
    pub fn add_observer(&mut self, participant: ParticipantRef) -> Result<(), RoomError> {
        let player_id = participant.id();
        if !self.game_started {
            participant.notify(Notice::error(OBSERVE_NOT_RUNNING));
            return Err(RoomError::NotStarted(self.id));
        }
        if self.seats.contains_key(&player_id) || self.is_observer(player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.id));
        }

        self.observers.push(Arc::clone(&participant));
        participant.set_room(Some(self.id));
        tracing::info!(room_id = %self.id, %player_id, "observer joined");
        self.events.emit(RoomEvent::PlayerAdded {
            room: self.id,
            participant,
        });
        self.push_internal(Request::Observe(player_id));
        Ok(())
    }

    /// Detaches an observer. An observer that is still online gets a
    /// `Setup` notice so its client can rebuild itself elsewhere.
    pub fn remove_observer(&mut self, participant: &ParticipantRef) -> Result<(), RoomError> {
        let player_id = participant.id();
        let Some(index) = self.observers.iter().position(|o| o.id() == player_id) else {
            return Err(RoomError::NotInRoom(player_id, self.id));
        };

        let observer = self.observers.remove(index);
        observer.leave_room(self.id);
        tracing::info!(room_id = %self.id, %player_id, "observer left");
        self.events.emit(RoomEvent::PlayerRemoved {
            room: self.id,
            participant: Arc::clone(&observer),
        });

        if observer.is_online() {
            observer.notify(observer.setup_notice());
        }
        self.push_internal(Request::Leave(player_id));
        Ok(())
    }

    // -----------------------------------------------------------------
    // Ownership and chat
    // -----------------------------------------------------------------

    /// Makes `owner` the owner and tells every player.
    pub fn set_owner(&mut self, owner: PlayerId) {
        self.owner = Some(owner);
        tracing::debug!(room_id = %self.id, %owner, "owner set");
        self.broadcast(&Notice::RoomOwner { id: owner });
    }

    /// Relays a chat message.
    ///
    /// `payload` must be a JSON object. The room stamps it with the
    /// sender's id; public player chat (`type` 1) also gets the sender's
    /// name and stays among players, everything else reaches observers
    /// too.
    pub fn chat(&self, sender: &Participant, payload: &str) -> Result<(), RoomError> {
        let mut body: Map<String, Value> =
            serde_json::from_str(payload).map_err(RoomError::MalformedChat)?;
        let kind = body
            .get("type")
            .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)));
        body.insert("sender".to_string(), Value::from(sender.id().0));

        if kind == Some(PUBLIC_PLAYER_CHAT) {
            body.insert(
                "userName".to_string(),
                Value::from(sender.screen_name()),
            );
            self.broadcast(&Notice::Chat(body));
        } else {
            let notice = Notice::Chat(body);
            self.broadcast(&notice);
            for observer in &self.observers {
                observer.notify(notice.clone());
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Game session
    // -----------------------------------------------------------------

    /// Starts the game: opens a fresh request queue and spawns the worker
    /// thread running `E`.
    pub fn run(&mut self) -> Result<(), RoomError> {
        if self.is_lobby() {
            return Err(RoomError::InvalidState("the lobby never starts".into()));
        }
        if self.game_started {
            return Err(RoomError::AlreadyStarted(self.id));
        }
        self.join_worker();

        self.game_started = true;
        self.session += 1;
        self.requests.open();
        self.requests.clear();

        let setup = self.session_setup();
        match spawn_worker::<E>(setup, self.requests.clone(), Arc::clone(&self.events), self.session) {
            Ok(handle) => {
                self.worker = Some(handle);
                tracing::info!(room_id = %self.id, session = self.session, "game started");
                Ok(())
            }
            Err(e) => {
                self.game_started = false;
                self.requests.close();
                Err(e)
            }
        }
    }

    /// Ends the game and resets the room for reuse.
    ///
    /// Robots and running-away seats are retired (the registry drops
    /// them). The online players are released and returned; where they go
    /// next is up to the caller. Observers stay; they leave through
    /// [`remove_observer`](Self::remove_observer).
    pub fn game_over(&mut self) -> Vec<ParticipantRef> {
        self.game_started = false;
        self.requests.close();
        self.runned_players.clear();

        let mut released = Vec::new();
        for player_id in self.players.drain(..) {
            let Some(seat) = self.seats.remove(&player_id) else {
                continue;
            };
            seat.leave_room(self.id);
            if seat.is_online() {
                released.push(seat);
            } else {
                self.events.emit(RoomEvent::ParticipantRetired {
                    room: self.id,
                    participant: seat,
                });
            }
        }

        self.requests.clear();
        self.owner = None;
        self.abandoned = false;
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.join_worker();
        }
        tracing::info!(room_id = %self.id, session = self.session, "game over");
        released
    }

    // -----------------------------------------------------------------
    // Request queue
    // -----------------------------------------------------------------

    /// Queues a player action for the rule engine.
    pub fn push_request(&self, request: impl Into<String>) -> Result<(), RoomError> {
        self.requests.push(request)
    }

    /// Takes the oldest pending request; `None` if there is none or the
    /// game is not running.
    pub fn fetch_request(&self) -> Option<String> {
        self.requests.fetch()
    }

    pub fn clear_request(&self) {
        self.requests.clear();
    }

    pub fn has_request(&self) -> bool {
        self.requests.has_request()
    }

    pub fn requests(&self) -> &RequestQueue {
        &self.requests
    }

    // -----------------------------------------------------------------
    // Queries and metadata
    // -----------------------------------------------------------------

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn is_lobby(&self) -> bool {
        self.id.is_lobby()
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.config.name = name.into();
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Changes the number of seats. Not allowed once the game runs or
    /// below the number of seated players.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), RoomError> {
        if self.game_started {
            return Err(RoomError::AlreadyStarted(self.id));
        }
        if capacity < self.players.len() {
            return Err(RoomError::InvalidState(format!(
                "capacity {capacity} is below the {} seated players",
                self.players.len()
            )));
        }
        self.config.capacity = capacity;
        Ok(())
    }

    pub fn timeout_secs(&self) -> u32 {
        self.config.timeout_secs
    }

    pub fn set_timeout_secs(&mut self, timeout_secs: u32) -> Result<(), RoomError> {
        if self.game_started {
            return Err(RoomError::AlreadyStarted(self.id));
        }
        self.config.timeout_secs = timeout_secs;
        Ok(())
    }

    pub fn settings(&self) -> &Value {
        &self.config.settings
    }

    pub fn set_settings(&mut self, settings: Value) -> Result<(), RoomError> {
        if self.game_started {
            return Err(RoomError::AlreadyStarted(self.id));
        }
        self.config.settings = settings;
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.capacity
    }

    pub fn is_started(&self) -> bool {
        self.game_started
    }

    /// Returns `true` if this is not the lobby and no player is online.
    /// An empty room counts as abandoned.
    pub fn is_abandoned(&self) -> bool {
        if self.is_lobby() {
            return false;
        }
        self.seats.values().all(|p| !p.is_online())
    }

    /// Whether the abandonment of the current game was already reported.
    pub fn abandonment_reported(&self) -> bool {
        self.abandoned
    }

    /// Session counter; matches [`RoomEvent::SessionFinished::session`]
    /// for the game currently running.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Seated participants in join order.
    pub fn players(&self) -> Vec<ParticipantRef> {
        self.players
            .iter()
            .filter_map(|id| self.seats.get(id).cloned())
            .collect()
    }

    pub fn player_ids(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Seated participants except `except`, in join order.
    pub fn other_players(&self, except: PlayerId) -> Vec<ParticipantRef> {
        self.players
            .iter()
            .filter(|id| **id != except)
            .filter_map(|id| self.seats.get(id).cloned())
            .collect()
    }

    pub fn find_player(&self, player_id: PlayerId) -> Option<ParticipantRef> {
        self.seats.get(&player_id).cloned()
    }

    pub fn observers(&self) -> &[ParticipantRef] {
        &self.observers
    }

    pub fn is_observer(&self, player_id: PlayerId) -> bool {
        self.observers.iter().any(|o| o.id() == player_id)
    }

    pub fn owner(&self) -> Option<ParticipantRef> {
        self.owner.and_then(|id| self.find_player(id))
    }

    pub fn owner_id(&self) -> Option<PlayerId> {
        self.owner
    }

    /// Ids that ran away from the current game.
    pub fn runned_players(&self) -> &HashSet<PlayerId> {
        &self.runned_players
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id,
            name: self.config.name.clone(),
            player_count: self.players.len(),
            capacity: self.config.capacity,
            started: self.game_started,
        }
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Sends `notice` to every seat. Running-away seats and robots have no
    /// channel and miss it.
    fn broadcast(&self, notice: &Notice) {
        for player_id in &self.players {
            if let Some(seat) = self.seats.get(player_id) {
                seat.notify(notice.clone());
            }
        }
    }

    /// `EnterRoom`, one `AddPlayer` per other seat, then `RoomOwner`.
    fn send_snapshot(&self, participant: &Participant) {
        participant.notify(Notice::EnterRoom {
            capacity: self.config.capacity,
            timeout: self.config.timeout_secs,
            settings: self.config.settings.clone(),
        });
        for other in self.other_players(participant.id()) {
            participant.notify(other.add_player_notice());
        }
        if let Some(owner) = self.owner {
            participant.notify(Notice::RoomOwner { id: owner });
        }
    }

    /// Queues a request the room generates itself. A closed queue means no
    /// engine is listening, so dropping it is fine.
    fn push_internal(&self, request: Request) {
        if let Err(e) = self.requests.push(request) {
            tracing::debug!(room_id = %self.id, error = %e, "internal request dropped");
        }
    }

    fn session_setup(&self) -> SessionSetup {
        SessionSetup {
            room_id: self.id,
            seats: self
                .players()
                .iter()
                .map(|p| SeatInfo {
                    id: p.id(),
                    name: p.screen_name().to_string(),
                    avatar: p.avatar().to_string(),
                    robot: p.is_robot(),
                })
                .collect(),
            owner: self.owner,
            timeout_secs: self.config.timeout_secs,
            settings: self.config.settings.clone(),
        }
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!(room_id = %self.id, "room worker panicked");
            }
        }
    }
}

impl<E: RuleEngine> Drop for Room<E> {
    fn drop(&mut self) {
        self.requests.close();
        self.join_worker();
    }
}

impl<E: RuleEngine> std::fmt::Debug for Room<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("players", &self.players)
            .field("observers", &self.observers.len())
            .field("owner", &self.owner)
            .field("game_started", &self.game_started)
            .field("abandoned", &self.abandoned)
            .finish_non_exhaustive()
    }
}
