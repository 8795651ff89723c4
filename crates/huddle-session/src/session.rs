//! Session types: the records the coordinator keeps about the active
//! multi-party channel and the flows that create it.

use std::fmt;

use huddle_protocol::{Identity, PeerId};
use rand::Rng;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Random identifier for one opened session.
///
/// Only used to tell successive sessions apart in logs and snapshots;
/// it never leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a random 32-character hex id (128 bits).
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one presented matchmaking/invite flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId(pub u64);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

/// What started a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    /// The user pressed "start" — open matchmaking.
    Matchmaking,
    /// An accepted invite into someone else's session.
    Invite,
    /// A pushed request to play with specific recipients.
    MatchRequest,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matchmaking => write!(f, "matchmaking"),
            Self::Invite => write!(f, "invite"),
            Self::MatchRequest => write!(f, "match request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Whether a session can still carry messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The local participant left.
    Left,
    /// Every participant reported `Disconnected` (only with
    /// `close_when_all_disconnected`).
    AllDisconnected,
    /// The provider ended the link.
    LinkClosed,
    /// The application is shutting down.
    Teardown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::AllDisconnected => write!(f, "all participants disconnected"),
            Self::LinkClosed => write!(f, "link closed by provider"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

/// The active multi-party channel.
///
/// `participants` are the remote peers as the provider reported them when
/// the flow succeeded. Membership never changes afterwards; connection
/// changes are recorded separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub participants: Vec<Identity>,
    pub state: SessionState,
    /// The kind of flow that opened it.
    pub origin: FlowKind,
}

impl Session {
    /// `true` while the session can carry messages.
    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open)
    }

    /// Looks up a participant by handle.
    pub fn participant(&self, peer: PeerId) -> Option<&Identity> {
        self.participants.iter().find(|p| p.id == peer)
    }

    /// Handles of every remote participant, in provider order.
    pub fn recipients(&self) -> Vec<PeerId> {
        self.participants
            .iter()
            .filter(|p| !p.is_local)
            .map(|p| p.id)
            .collect()
    }
}
