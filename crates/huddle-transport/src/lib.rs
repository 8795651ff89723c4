//! Transport boundary for Huddle sessions.
//!
//! Huddle does not move bytes itself. When matchmaking finds a session the
//! provider hands over a [`PeerMatch`]: the participant list, a
//! [`MatchLink`] for outbound payloads, and a stream of inbound
//! [`LinkEvent`]s (data and per-participant connection changes).
//!
//! # Feature Flags
//!
//! - `loopback` (default) — an in-memory [`loopback`] link for tests and
//!   demos.

mod error;
#[cfg(feature = "loopback")]
pub mod loopback;

pub use error::TransportError;

use std::fmt;
use std::sync::Arc;

use huddle_protocol::{Channel, ConnectionState, Identity, PeerId};
use tokio::sync::mpsc;

/// Opaque identifier for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a new `LinkId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// Outbound half of an established session.
///
/// `send` is synchronous and fire-and-forget: it hands the payload to the
/// transport and reports an immediate refusal, but never waits for the
/// peers to acknowledge.
pub trait MatchLink: Send + Sync + 'static {
    /// Sends `payload` to every peer in `to`.
    fn send(
        &self,
        payload: &[u8],
        to: &[PeerId],
        channel: Channel,
    ) -> Result<(), TransportError>;

    /// Leaves the session. Further sends fail with
    /// [`TransportError::LinkClosed`] and the inbound stream ends.
    fn disconnect(&self);

    /// Returns the unique identifier for this link.
    fn id(&self) -> LinkId;
}

/// Something the transport observed on an established session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A payload arrived from a participant.
    Data { from: PeerId, payload: Vec<u8> },

    /// A participant's connection state changed.
    ConnectionChanged { peer: PeerId, state: ConnectionState },
}

/// Everything a successful matchmaking or invite flow hands over.
///
/// When the `events` stream ends the provider has fully disconnected the
/// session.
pub struct PeerMatch {
    /// Remote participants as reported by the provider.
    pub participants: Vec<Identity>,
    /// Outbound half.
    pub link: Arc<dyn MatchLink>,
    /// Inbound half.
    pub events: mpsc::UnboundedReceiver<LinkEvent>,
}

impl fmt::Debug for PeerMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerMatch")
            .field("link", &self.link.id())
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}
