//! Lifecycle events a room reports to whoever manages it.
//!
//! A room never calls into the registry directly. It emits
//! [`RoomEvent`]s into a [`LifecycleSink`], and the registry reacts:
//! moving players between the lobby and rooms, tracking stand-ins,
//! tearing down abandoned rooms, ending finished games.

use seatkeeper_protocol::RoomId;
use tokio::sync::mpsc;

use crate::ParticipantRef;

/// Something that happened in a room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A participant took a seat or started observing.
    PlayerAdded {
        room: RoomId,
        participant: ParticipantRef,
    },

    /// A participant left a seat or stopped observing. For a player
    /// leaving a running game this carries the stand-in, not the seat.
    PlayerRemoved {
        room: RoomId,
        participant: ParticipantRef,
    },

    /// A running-away player's connection now lives in this new
    /// participant. The registry should track it in place of the old one.
    StandInCreated {
        room: RoomId,
        participant: ParticipantRef,
    },

    /// No player in the room is online any more. Emitted once per game.
    RoomAbandoned { room: RoomId },

    /// A robot or running-away seat released by game over. The registry
    /// drops its last handle.
    ParticipantRetired {
        room: RoomId,
        participant: ParticipantRef,
    },

    /// The rule engine ended session number `session` on its own.
    /// Emitted from the worker thread.
    SessionFinished { room: RoomId, session: u64 },
}

impl RoomEvent {
    /// The room that emitted this event.
    pub fn room(&self) -> RoomId {
        match self {
            Self::PlayerAdded { room, .. }
            | Self::PlayerRemoved { room, .. }
            | Self::StandInCreated { room, .. }
            | Self::RoomAbandoned { room }
            | Self::ParticipantRetired { room, .. }
            | Self::SessionFinished { room, .. } => *room,
        }
    }
}

/// Receives room lifecycle events.
///
/// `Send + Sync` because the worker thread emits
/// [`RoomEvent::SessionFinished`] while the control side emits the rest.
pub trait LifecycleSink: Send + Sync + 'static {
    fn emit(&self, event: RoomEvent);
}

impl LifecycleSink for mpsc::UnboundedSender<RoomEvent> {
    fn emit(&self, event: RoomEvent) {
        let room = event.room();
        if self.send(event).is_err() {
            tracing::debug!(room_id = %room, "lifecycle receiver gone, event dropped");
        }
    }
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LifecycleSink for NullSink {
    fn emit(&self, _event: RoomEvent) {}
}
