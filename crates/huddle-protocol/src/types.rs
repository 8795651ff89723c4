//! Core data model shared by every Huddle crate.
//!
//! These are plain values: identities handed out by the provider, invites
//! pushed by it, chat messages and connection events recorded in the event
//! log. None of them carry behavior beyond formatting for presentation.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque, provider-assigned handle for a participant.
///
/// Newtype over `u64` so a `PeerId` can never be confused with an
/// `InviteId` (or any other number) at a call site.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// A participant as reported by the identity provider.
///
/// Immutable once obtained: the provider is the source of truth for both
/// the handle and the display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Provider handle.
    pub id: PeerId,
    /// Human-readable name shown in the event log.
    pub display_name: String,
    /// `true` for the participant running this process.
    pub is_local: bool,
}

impl Identity {
    /// The participant running this process.
    pub fn local(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: PeerId(id),
            display_name: display_name.into(),
            is_local: true,
        }
    }

    /// Any other participant.
    pub fn remote(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: PeerId(id),
            display_name: display_name.into(),
            is_local: false,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

/// Provider-assigned handle for an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteId(pub u64);

impl fmt::Display for InviteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invite-{}", self.0)
    }
}

/// An invitation into someone else's session, accepted by the user
/// outside the normal matchmaking flow (e.g. from an OS notification).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    /// Provider handle, passed back when presenting the invite flow.
    pub id: InviteId,
    /// Who sent the invite.
    pub sender: Identity,
}

// ---------------------------------------------------------------------------
// Channel — delivery guarantees
// ---------------------------------------------------------------------------

/// Delivery guarantee requested from the transport for a payload.
///
/// Chat is always reliable; whether ordering matters is up to the
/// embedding app.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "PascalCase")]
pub enum Channel {
    /// Delivered in order, no loss.
    #[default]
    ReliableOrdered,

    /// Delivered (no loss), but may arrive out of order.
    ReliableUnordered,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Which way a chat message travelled, from the local view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Composed locally and sent to every participant.
    Outgoing,
    /// Received from a remote participant.
    Incoming,
}

/// One line of chat. Ordering is arrival order, not a global clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Identity,
    pub text: String,
    pub direction: Direction,
}

impl ChatMessage {
    /// A message composed by the local participant.
    pub fn outgoing(sender: Identity, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            direction: Direction::Outgoing,
        }
    }

    /// A message received from `sender`.
    pub fn incoming(sender: Identity, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            direction: Direction::Incoming,
        }
    }

    /// Renders the message the way the chat view shows it.
    pub fn render(&self) -> String {
        match self.direction {
            Direction::Outgoing => format!("You: {}", self.text),
            Direction::Incoming => {
                format!("{}: {}", self.sender.display_name, self.text)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection events
// ---------------------------------------------------------------------------

/// Per-participant connection state as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    /// The transport reported a state this crate does not know about.
    Unknown,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A participant's connection changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub identity: Identity,
    pub state: ConnectionState,
}

impl ConnectionEvent {
    /// Renders the event the way the chat view shows it.
    pub fn render(&self) -> String {
        let name = &self.identity.display_name;
        match self.state {
            ConnectionState::Connected => format!("{name} connected"),
            ConnectionState::Disconnected => format!("{name} disconnected"),
            ConnectionState::Unknown => {
                format!("{name} is in an unknown state")
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
