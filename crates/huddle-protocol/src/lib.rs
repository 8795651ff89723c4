//! Data model and payload codecs for Huddle.
//!
//! This crate defines what the rest of the stack talks about:
//!
//! - **Types** ([`Identity`], [`Invite`], [`ChatMessage`],
//!   [`ConnectionEvent`], [`Channel`], etc.) — the values that flow between
//!   the identity provider, the session coordinator and the event log.
//! - **Codec** ([`Codec`] trait, [`Utf8Codec`], [`JsonCodec`]) — how chat
//!   text is turned into transport payloads and back.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding a payload.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sessions, flows or providers.
//! It sits underneath everything else:
//!
//! ```text
//! Protocol (types, bytes) → Transport (links) → Identity / Session → huddle
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, Utf8Codec};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Channel, ChatMessage, ConnectionEvent, ConnectionState, Direction,
    Identity, Invite, InviteId, PeerId,
};
