//! The `RuleEngine` trait and the worker thread that drives it.
//!
//! Game rules are not this crate's business. A room only knows two entry
//! points: "start a session" and "run one epoch". Each started room runs
//! them on its own OS thread, and the only thing that thread can reach
//! besides the immutable [`SessionSetup`] is the room's
//! [`RequestQueue`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use seatkeeper_protocol::{PlayerId, RoomId};
use serde_json::Value;

use crate::{LifecycleSink, RequestQueue, RoomError, RoomEvent};

/// One seat as the rule engine sees it at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatInfo {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub robot: bool,
}

/// Everything a rule engine learns about its room when a game starts.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub room_id: RoomId,
    /// Seats in join order.
    pub seats: Vec<SeatInfo>,
    pub owner: Option<PlayerId>,
    /// Per-move timeout. Enforcing it is up to the engine.
    pub timeout_secs: u32,
    /// The room's opaque settings, verbatim.
    pub settings: Value,
}

/// Outcome of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    /// Call `run_epoch` again.
    Continue,
    /// The game is over.
    Finished,
}

/// The extension point for game rules.
///
/// - `start_session` builds the engine's state once per game.
/// - `run_epoch` advances the game. It pulls player input with
///   [`RequestQueue::fetch`], which never blocks, so an epoch that needs
///   input must do its own waiting. It should return within a bounded
///   time: between epochs the worker checks whether the room closed its
///   queue, and that is the only way a game ends early.
pub trait RuleEngine: Send + Sync + 'static {
    /// Engine state for one game.
    type Session: Send + 'static;

    fn start_session(setup: &SessionSetup) -> Self::Session;

    fn run_epoch(session: &mut Self::Session, requests: &RequestQueue) -> Epoch;
}

/// Spawns the worker thread for session number `session` of a room.
pub(crate) fn spawn_worker<E: RuleEngine>(
    setup: SessionSetup,
    requests: RequestQueue,
    events: Arc<dyn LifecycleSink>,
    session: u64,
) -> Result<JoinHandle<()>, RoomError> {
    let room_id = setup.room_id;
    thread::Builder::new()
        .name(format!("room-{}", room_id.0))
        .spawn(move || run_worker::<E>(setup, requests, events, session))
        .map_err(|e| RoomError::Worker(room_id, e))
}

fn run_worker<E: RuleEngine>(
    setup: SessionSetup,
    requests: RequestQueue,
    events: Arc<dyn LifecycleSink>,
    session: u64,
) {
    let room_id = setup.room_id;
    tracing::info!(%room_id, session, seats = setup.seats.len(), "session started");

    let mut state = E::start_session(&setup);
    loop {
        match E::run_epoch(&mut state, &requests) {
            Epoch::Finished => break,
            Epoch::Continue if requests.is_open() => {}
            Epoch::Continue => {
                tracing::info!(%room_id, session, "room closed, session stopped");
                return;
            }
        }
    }

    tracing::info!(%room_id, session, "session finished");
    events.emit(RoomEvent::SessionFinished {
        room: room_id,
        session,
    });
}
