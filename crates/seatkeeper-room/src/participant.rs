//! Participants: the people (and robots) that sit in rooms.
//!
//! A participant's identity (id, name, avatar) never changes. What does
//! change lives behind one lock: its connection state, the channel its
//! notices go out on, and the room it currently belongs to.
//!
//! ```text
//!   Online ──(leaves/drops during a game)──→ DisconnectedRunning
//!     ↑                                              │
//!     └──────────────(reconnects)────────────────────┘
//!
//!   Robot   (created as such, never changes)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use seatkeeper_protocol::{Notice, PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Outbound channel of one connection. The transport task on the other
/// end encodes and writes whatever arrives.
pub type NoticeSender = mpsc::UnboundedSender<Notice>;

/// Shared handle to a participant. Rooms and the registry hold clones.
pub type ParticipantRef = Arc<Participant>;

/// How a participant is currently connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// A human with a live connection.
    Online,
    /// A human who left a running game. The seat is played by the rule
    /// engine's AI until they reconnect or the game ends.
    DisconnectedRunning,
    /// A synthetic player with no connection.
    Robot,
}

#[derive(Debug)]
struct Link {
    state: ConnectionState,
    channel: Option<NoticeSender>,
    room: Option<RoomId>,
}

/// A connected player, a running-away player's seat, or a robot.
#[derive(Debug)]
pub struct Participant {
    id: PlayerId,
    screen_name: String,
    avatar: String,
    link: Mutex<Link>,
}

impl Participant {
    /// Creates an `Online` participant that receives notices on `channel`.
    pub fn new(
        id: PlayerId,
        screen_name: impl Into<String>,
        avatar: impl Into<String>,
        channel: NoticeSender,
    ) -> Self {
        Self::with_link(id, screen_name.into(), avatar.into(), ConnectionState::Online, Some(channel))
    }

    /// Creates a `Robot`. Robots have no channel, so notices to them are
    /// silently discarded.
    pub fn robot(id: PlayerId, screen_name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self::with_link(id, screen_name.into(), avatar.into(), ConnectionState::Robot, None)
    }

    /// Builds the stand-in for a participant whose seat stays in a running
    /// game: same identity, `Online`, owning the connection the seat just
    /// gave up. The registry tracks the stand-in from then on.
    pub fn stand_in(&self, channel: Option<NoticeSender>) -> Self {
        Self::with_link(
            self.id,
            self.screen_name.clone(),
            self.avatar.clone(),
            ConnectionState::Online,
            channel,
        )
    }

    fn with_link(
        id: PlayerId,
        screen_name: String,
        avatar: String,
        state: ConnectionState,
        channel: Option<NoticeSender>,
    ) -> Self {
        Self {
            id,
            screen_name,
            avatar,
            link: Mutex::new(Link {
                state,
                channel,
                room: None,
            }),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn screen_name(&self) -> &str {
        &self.screen_name
    }

    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    pub fn state(&self) -> ConnectionState {
        self.link().state
    }

    pub fn is_online(&self) -> bool {
        self.state() == ConnectionState::Online
    }

    pub fn is_robot(&self) -> bool {
        self.state() == ConnectionState::Robot
    }

    /// The room this participant currently sits in or observes.
    pub fn room(&self) -> Option<RoomId> {
        self.link().room
    }

    pub(crate) fn set_room(&self, room: Option<RoomId>) {
        self.link().room = room;
    }

    /// Detaches `room`, unless the participant already moved on to
    /// another one.
    pub(crate) fn leave_room(&self, room: RoomId) {
        let mut link = self.link();
        if link.room == Some(room) {
            link.room = None;
        }
    }

    pub fn has_channel(&self) -> bool {
        self.link().channel.is_some()
    }

    /// `Online` → `DisconnectedRunning`, handing back the connection.
    ///
    /// Returns `None` without changing anything when the participant is
    /// not `Online`. The inner `Option` is the channel, which may already
    /// be gone.
    pub(crate) fn start_running(&self) -> Option<Option<NoticeSender>> {
        let mut link = self.link();
        if link.state != ConnectionState::Online {
            return None;
        }
        link.state = ConnectionState::DisconnectedRunning;
        Some(link.channel.take())
    }

    /// `DisconnectedRunning` → `Online` with a fresh connection.
    ///
    /// Returns `false` (and drops `channel`) in any other state.
    pub(crate) fn come_back(&self, channel: NoticeSender) -> bool {
        let mut link = self.link();
        if link.state != ConnectionState::DisconnectedRunning {
            return false;
        }
        link.state = ConnectionState::Online;
        link.channel = Some(channel);
        true
    }

    /// Sends a notice. Returns `false` if there is no live connection.
    pub fn notify(&self, notice: Notice) -> bool {
        let link = self.link();
        let Some(channel) = &link.channel else {
            tracing::trace!(player_id = %self.id, command = notice.command(), "no channel, notice dropped");
            return false;
        };
        if channel.send(notice).is_err() {
            tracing::trace!(player_id = %self.id, "channel closed, notice dropped");
            return false;
        }
        true
    }

    /// The `AddPlayer` notice describing this participant to others.
    pub fn add_player_notice(&self) -> Notice {
        Notice::AddPlayer {
            id: self.id,
            name: self.screen_name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    /// The `Setup` notice describing this participant to itself.
    pub fn setup_notice(&self) -> Notice {
        Notice::Setup {
            id: self.id,
            name: self.screen_name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        // The guarded data is plain values; a panic elsewhere cannot leave
        // it half-written.
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online(id: i64) -> (Participant, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Participant::new(PlayerId(id), format!("p{id}"), "liubei", tx), rx)
    }

    #[test]
    fn test_new_participant_is_online_without_room() {
        let (p, _rx) = online(1);
        assert_eq!(p.state(), ConnectionState::Online);
        assert!(p.has_channel());
        assert_eq!(p.room(), None);
    }

    #[test]
    fn test_notify_delivers_to_channel() {
        let (p, mut rx) = online(1);
        assert!(p.notify(Notice::EnterLobby));
        assert_eq!(rx.try_recv().unwrap(), Notice::EnterLobby);
    }

    #[test]
    fn test_notify_closed_channel_returns_false() {
        let (p, rx) = online(1);
        drop(rx);
        assert!(!p.notify(Notice::EnterLobby));
    }

    #[test]
    fn test_robot_has_no_channel() {
        let robot = Participant::robot(PlayerId(-2), "COMP-2", "guanyu");
        assert!(robot.is_robot());
        assert!(!robot.has_channel());
        assert!(!robot.notify(Notice::EnterLobby));
    }

    #[test]
    fn test_start_running_detaches_channel_once() {
        let (p, _rx) = online(1);

        let channel = p.start_running().expect("online participant can run");
        assert!(channel.is_some());
        assert_eq!(p.state(), ConnectionState::DisconnectedRunning);
        assert!(!p.has_channel());

        assert!(p.start_running().is_none(), "second run is a no-op");
    }

    #[test]
    fn test_robot_never_starts_running() {
        let robot = Participant::robot(PlayerId(-2), "COMP-2", "guanyu");
        assert!(robot.start_running().is_none());
        assert_eq!(robot.state(), ConnectionState::Robot);
    }

    #[test]
    fn test_stand_in_keeps_identity_and_takes_channel() {
        let (p, mut rx) = online(9);
        let channel = p.start_running().unwrap();

        let stand_in = p.stand_in(channel);

        assert_eq!(stand_in.id(), p.id());
        assert_eq!(stand_in.screen_name(), "p9");
        assert_eq!(stand_in.avatar(), "liubei");
        assert!(stand_in.is_online());
        assert!(stand_in.notify(Notice::EnterLobby));
        assert_eq!(rx.try_recv().unwrap(), Notice::EnterLobby);
    }

    #[test]
    fn test_leave_room_ignores_other_rooms() {
        let (p, _rx) = online(1);
        p.set_room(Some(RoomId(3)));

        p.leave_room(RoomId::LOBBY);
        assert_eq!(p.room(), Some(RoomId(3)));

        p.leave_room(RoomId(3));
        assert_eq!(p.room(), None);
    }

    #[test]
    fn test_come_back_only_from_running() {
        let (p, _rx) = online(1);
        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(!p.come_back(tx.clone()), "online player cannot come back");

        p.start_running();
        assert!(p.come_back(tx));
        assert!(p.is_online());
        assert!(p.has_channel());
    }
}
