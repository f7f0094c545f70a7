//! Identity types and participant notices.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A participant's identifier.
///
/// Real players get positive ids from the registry. Robots use negative
/// ids handed out by the room they sit in; `-1` is never used because
/// clients treat it as "no player".
///
/// `#[serde(transparent)]` keeps the wire form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i64);

impl PlayerId {
    /// Returns `true` for the negative ids reserved for robots.
    pub fn is_robot(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A room's identifier. `RoomId(0)` is the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl RoomId {
    /// The lobby: the room every connected, unseated participant sits in.
    pub const LOBBY: RoomId = RoomId(0);

    /// Returns `true` if this is the lobby's id.
    pub fn is_lobby(self) -> bool {
        self == Self::LOBBY
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Notice: room → participant
// ---------------------------------------------------------------------------

/// A one-way message from a room to a single participant.
///
/// Every notice is a named command plus a structured payload. The
/// adjacently tagged representation keeps that split on the wire:
///
/// ```text
/// { "command": "AddPlayer", "data": { "id": 4, "name": "alice", "avatar": "liubei" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data")]
pub enum Notice {
    /// The participant is now in the lobby.
    EnterLobby,

    /// The participant entered a room. `settings` is the room's opaque
    /// configuration, passed through untouched.
    EnterRoom {
        capacity: usize,
        timeout: u32,
        settings: Value,
    },

    /// Another player sits down in the room.
    AddPlayer {
        id: PlayerId,
        name: String,
        avatar: String,
    },

    /// A player left the room before the game started.
    RemovePlayer { id: PlayerId },

    /// The room's owner changed (or is being announced).
    RoomOwner { id: PlayerId },

    /// A relayed chat message. The room adds `sender` (and `userName`
    /// for public player chat); everything else is the sender's payload.
    Chat(Map<String, Value>),

    /// Sent to an observer leaving a room so the client can rebuild its
    /// own identity before landing somewhere else.
    Setup {
        id: PlayerId,
        name: String,
        avatar: String,
    },

    /// A user-facing error. The operation that caused it was dropped.
    ErrorMsg { text: String },
}

impl Notice {
    /// The command name as it appears on the wire.
    pub fn command(&self) -> &'static str {
        match self {
            Self::EnterLobby => "EnterLobby",
            Self::EnterRoom { .. } => "EnterRoom",
            Self::AddPlayer { .. } => "AddPlayer",
            Self::RemovePlayer { .. } => "RemovePlayer",
            Self::RoomOwner { .. } => "RoomOwner",
            Self::Chat(_) => "Chat",
            Self::Setup { .. } => "Setup",
            Self::ErrorMsg { .. } => "ErrorMsg",
        }
    }

    /// Shorthand for [`Notice::ErrorMsg`].
    pub fn error(text: impl Into<String>) -> Self {
        Self::ErrorMsg { text: text.into() }
    }
}
