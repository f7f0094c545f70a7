//! Error types for the session layer.

use seatkeeper_protocol::{PlayerId, RoomId};
use seatkeeper_room::RoomError;

/// Errors that can occur while managing sessions and routing players
/// between rooms.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    /// The session exists but is not connected.
    #[error("player {0} is not connected")]
    NotConnected(PlayerId),

    /// The reconnection token doesn't match any session.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The reconnection grace period has elapsed.
    #[error("session expired for player {0}")]
    SessionExpired(PlayerId),

    /// The player already has a connected session.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),

    /// Real players need positive ids; the rest are robots or sentinels.
    #[error("{0} is not a valid player id")]
    InvalidPlayerId(PlayerId),

    /// No room with this id.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// Creating, joining, or observing a room needs a player in the
    /// lobby.
    #[error("player {0} is not in the lobby")]
    NotInLobby(PlayerId),

    /// The player sits in no game room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The room rejected the operation.
    #[error(transparent)]
    Room(#[from] RoomError),
}
