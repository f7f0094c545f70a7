//! Error types for the room layer.
//!
//! Room errors are advisory. Whenever a participant caused one, the room
//! has already sent that participant an `ErrorMsg` notice and left all
//! of its own state untouched; the `Err` only tells the caller why.

use seatkeeper_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The game is running, so seats and metadata are frozen.
    #[error("room {0} has already started")]
    AlreadyStarted(RoomId),

    /// The operation needs a running game (observing, queueing requests).
    #[error("room {0} has not started")]
    NotStarted(RoomId),

    /// Only the owner may do this (adding robots).
    #[error("player {0} does not own room {1}")]
    NotOwner(PlayerId, RoomId),

    /// The participant already has a seat or is already observing.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The participant is neither seated nor observing here.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// Reconnection needs a seat whose owner ran away.
    #[error("player {0} is not running away from room {1}")]
    NotRunning(PlayerId, RoomId),

    /// The request queue reached its bound; the request was dropped.
    #[error("request queue of room {0} is full")]
    QueueFull(RoomId),

    /// A chat payload that is not a JSON object.
    #[error("malformed chat payload: {0}")]
    MalformedChat(#[source] serde_json::Error),

    /// The room's worker thread could not be spawned.
    #[error("failed to start worker for room {0}: {1}")]
    Worker(RoomId, #[source] std::io::Error),

    /// The room is in a state that doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),
}
