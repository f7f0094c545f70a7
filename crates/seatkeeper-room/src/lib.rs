//! Room lifecycle management for Seatkeeper.
//!
//! A [`Room`] holds a roster of seated players, a roster of observers,
//! an owner, and the metadata of one game. When its seats fill up it
//! starts the game on a dedicated worker thread running a
//! [`RuleEngine`]; players who drop out mid-game keep their seat while
//! their connection moves to a stand-in, so the game goes on.
//!
//! # Key types
//!
//! - [`Room`]: rosters, ownership, chat relay, game start/stop
//! - [`Participant`]: identity plus connection state and channel
//! - [`RequestQueue`]: the only state shared with the worker thread
//! - [`RuleEngine`]: the trait game rules implement
//! - [`LifecycleSink`] / [`RoomEvent`]: how rooms report to the registry
//! - [`RoomConfig`]: capacity, timeout, opaque settings

mod config;
mod engine;
mod error;
mod events;
mod participant;
mod queue;
mod room;

pub use config::{
    DEFAULT_CAPACITY, DEFAULT_REQUEST_QUEUE_BOUND, DEFAULT_TIMEOUT_SECS, RoomConfig,
};
pub use engine::{Epoch, RuleEngine, SeatInfo, SessionSetup};
pub use error::RoomError;
pub use events::{LifecycleSink, NullSink, RoomEvent};
pub use participant::{ConnectionState, NoticeSender, Participant, ParticipantRef};
pub use queue::RequestQueue;
pub use room::{
    OBSERVE_NOT_RUNNING, PUBLIC_PLAYER_CHAT, ROBOT_AVATAR, ROOM_UNAVAILABLE, RUNNING_AWAY, Room,
    RoomInfo,
};
