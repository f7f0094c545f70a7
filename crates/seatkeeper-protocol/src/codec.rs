//! Codec trait and the JSON implementation.
//!
//! The room layer produces [`Notice`](crate::Notice) values; whatever
//! carries them to a client needs bytes. A [`Codec`] is that boundary.
//! The room manager itself never encodes anything, it only hands typed
//! notices to a participant's channel.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` so a single codec can be shared by every
/// connection task of a server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be
    /// represented in this format.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use seatkeeper_protocol::{Codec, JsonCodec, Notice, PlayerId};
///
/// let codec = JsonCodec;
/// let notice = Notice::RoomOwner { id: PlayerId(7) };
///
/// let bytes = codec.encode(&notice).unwrap();
/// let decoded: Notice = codec.decode(&bytes).unwrap();
/// assert_eq!(notice, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
