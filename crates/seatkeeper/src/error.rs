//! Unified error type for Seatkeeper.

use seatkeeper_protocol::ProtocolError;
use seatkeeper_room::RoomError;
use seatkeeper_session::SessionError;

/// Top-level error wrapping the errors of every Seatkeeper crate, so `?`
/// works across layers.
#[derive(Debug, thiserror::Error)]
pub enum SeatkeeperError {
    /// Encoding or decoding a notice or request failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session or registry operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room rejected an operation.
    #[error(transparent)]
    Room(#[from] RoomError),
}
