//! Shared vocabulary for Seatkeeper.
//!
//! This crate defines what flows between the room manager and the
//! outside world:
//!
//! - **Identity** ([`PlayerId`], [`RoomId`]): who and where.
//! - **Notices** ([`Notice`]): one-way messages a room sends to a
//!   participant's connection (`EnterRoom`, `AddPlayer`, `ErrorMsg`, ...).
//! - **Requests** ([`Request`]): the textual descriptors a room hands
//!   to its rule engine through the request queue.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how notices become
//!   bytes for a transport.
//!
//! # Architecture
//!
//! ```text
//! Registry (session) → Room → Notice → Codec → transport (external)
//!                        ↓
//!                     Request → rule engine thread (external)
//! ```

mod codec;
mod error;
mod request;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use request::Request;
pub use types::{Notice, PlayerId, RoomId};
