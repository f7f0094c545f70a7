//! # Seatkeeper
//!
//! Lobby, rooms, and stand-in seats for turn-based multiplayer game
//! servers.
//!
//! Seatkeeper keeps track of who sits where. Players connect into a
//! lobby, gather in rooms, and once a room is full its game runs on a
//! dedicated thread that you drive by implementing [`RuleEngine`]. A
//! player who drops out mid-game keeps their seat (the engine plays it)
//! and can reconnect to it with their token.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seatkeeper::prelude::*;
//!
//! struct Quiet;
//!
//! impl RuleEngine for Quiet {
//!     type Session = ();
//!     fn start_session(_setup: &SessionSetup) {}
//!     fn run_epoch(_session: &mut (), _requests: &RequestQueue) -> Epoch {
//!         Epoch::Finished
//!     }
//! }
//!
//! let mut registry: Registry<Quiet> = Registry::new(SessionConfig::default());
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let token = registry.connect(PlayerId(1), "alice", "liubei", tx)?;
//! let room = registry.create_room(PlayerId(1), RoomConfig::with_capacity("duel", 2))?;
//! registry.add_robot(PlayerId(1))?;
//! # let _ = (token, room);
//! # Ok::<(), seatkeeper::SeatkeeperError>(())
//! ```

mod error;
mod logging;

pub use error::SeatkeeperError;
pub use logging::init_tracing;

pub use seatkeeper_protocol as protocol;
pub use seatkeeper_room as room;
pub use seatkeeper_session as session;

pub use seatkeeper_protocol::{Codec, JsonCodec, Notice, PlayerId, Request, RoomId};
pub use seatkeeper_room::{
    Epoch, LifecycleSink, Participant, ParticipantRef, RequestQueue, Room, RoomConfig, RoomEvent,
    RuleEngine, SessionSetup,
};
pub use seatkeeper_session::{Registry, SessionConfig};

pub mod prelude {
    //! The types most servers need.

    pub use crate::SeatkeeperError;
    pub use seatkeeper_protocol::{Codec, JsonCodec, Notice, PlayerId, RoomId};
    pub use seatkeeper_room::{
        Epoch, NoticeSender, Participant, ParticipantRef, RequestQueue, Room, RoomConfig,
        RoomEvent, RuleEngine, SeatInfo, SessionSetup,
    };
    pub use seatkeeper_session::{Registry, SessionConfig};
}
