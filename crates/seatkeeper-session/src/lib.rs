//! Player sessions and the room registry for Seatkeeper.
//!
//! This crate handles everything above a single room:
//!
//! 1. **Session tracking**: who is connected, who may come back
//!    ([`SessionManager`], token-based with a grace period)
//! 2. **Registry**: the lobby, room ids, and routing players between
//!    the lobby and rooms ([`Registry`])
//! 3. **Lifecycle reactions**: applying the events rooms emit
//!    ([`Registry::process_events`])
//!
//! # How it fits in the stack
//!
//! ```text
//! transport (external)  ← owns connections, calls the registry
//!     ↕
//! Session layer (this crate)  ← sessions, lobby, room registry
//!     ↕
//! Room layer  ← rosters, ownership, stand-ins, rule engine thread
//! ```

mod error;
mod manager;
mod registry;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use registry::Registry;
pub use session::{DEFAULT_RECONNECT_GRACE_SECS, Session, SessionConfig, SessionState};
