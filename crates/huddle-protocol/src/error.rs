//! Error types for the protocol layer.
//!
//! Each crate in Huddle defines its own error enum. A `ProtocolError`
//! always means a payload could not be turned into text (or back), never
//! that a peer or a session misbehaved.

/// Errors that can occur while encoding or decoding a payload.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload bytes are not valid UTF-8.
    ///
    /// Inbound chat payloads that fail this way are dropped by the
    /// message channel without being shown to the user.
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Serialization failed (turning text into a JSON payload).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (the payload is not a JSON string).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
