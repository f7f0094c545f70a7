//! Request descriptors handed from a room to its rule engine.
//!
//! The request queue carries plain strings. A handful of shapes are
//! produced by the room itself (`"<id>,observe"`, `"<id>,leave"`,
//! `"<id>,reconnect"`); everything else is a player action the room
//! never looks inside. All of them travel in the same queue, in the
//! order they were pushed.

use std::fmt;

use crate::PlayerId;

/// A parsed request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// An observer attached to the running game.
    Observe(PlayerId),
    /// An observer detached from the running game.
    Leave(PlayerId),
    /// A running-away player got their connection back.
    Reconnect(PlayerId),
    /// Anything else: an opaque player action for the rules.
    Action(String),
}

impl Request {
    /// Parses a raw queue entry. Never fails: unknown shapes are
    /// [`Request::Action`].
    pub fn parse(raw: &str) -> Self {
        let Some((id, verb)) = raw.split_once(',') else {
            return Self::Action(raw.to_owned());
        };
        let Ok(id) = id.trim().parse::<i64>() else {
            return Self::Action(raw.to_owned());
        };
        let id = PlayerId(id);
        match verb {
            "observe" => Self::Observe(id),
            "leave" => Self::Leave(id),
            "reconnect" => Self::Reconnect(id),
            _ => Self::Action(raw.to_owned()),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observe(id) => write!(f, "{},observe", id.0),
            Self::Leave(id) => write!(f, "{},leave", id.0),
            Self::Reconnect(id) => write!(f, "{},reconnect", id.0),
            Self::Action(raw) => f.write_str(raw),
        }
    }
}

impl From<Request> for String {
    fn from(request: Request) -> Self {
        request.to_string()
    }
}
