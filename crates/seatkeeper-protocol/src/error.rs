//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding protocol values.
///
/// Each crate in Seatkeeper defines its own error enum, so a
/// `ProtocolError` always means the problem is in serialization, never
/// in room or session bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed JSON, missing fields, wrong
    /// shape).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value decoded, but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
