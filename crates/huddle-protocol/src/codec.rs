//! Payload codecs: chat text ⇄ transport bytes.
//!
//! The transport moves opaque bytes; the message channel deals in text.
//! A [`Codec`] sits between the two. Swapping codecs changes the wire
//! format without touching anything above or below.

use crate::ProtocolError;

/// Converts chat text to payload bytes and back.
///
/// `Send + Sync + 'static` because the codec lives inside the coordinator
/// task for the whole process lifetime.
pub trait Codec: Send + Sync + 'static {
    /// Encodes `text` into a payload.
    fn encode(&self, text: &str) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes a payload back into text.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a payload this codec produced.
    fn decode(&self, data: &[u8]) -> Result<String, ProtocolError>;
}

// ---------------------------------------------------------------------------
// Utf8Codec
// ---------------------------------------------------------------------------

/// Sends the text's raw UTF-8 bytes. This is the default wire format.
///
/// ```rust
/// use huddle_protocol::{Codec, Utf8Codec};
///
/// let bytes = Utf8Codec.encode("olá").unwrap();
/// assert_eq!(Utf8Codec.decode(&bytes).unwrap(), "olá");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl Codec for Utf8Codec {
    fn encode(&self, text: &str) -> Result<Vec<u8>, ProtocolError> {
        Ok(text.as_bytes().to_vec())
    }

    fn decode(&self, data: &[u8]) -> Result<String, ProtocolError> {
        let text = std::str::from_utf8(data)?;
        Ok(text.to_owned())
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// Wraps the text in a JSON string (`"hello"`), for peers that exchange
/// JSON payloads.
///
/// Behind the `json` feature flag (enabled by default).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode(&self, text: &str) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(text).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<String, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
