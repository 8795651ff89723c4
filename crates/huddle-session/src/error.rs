//! Error types for the session layer.

use huddle_protocol::{PeerId, ProtocolError};
use huddle_transport::TransportError;

use crate::{FlowId, SessionId};

/// Errors that can occur while driving the session lifecycle.
///
/// None of these are fatal: each one means "this operation did nothing"
/// and is logged where it happens.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Matchmaking and invite flows require an authenticated participant.
    #[error("local participant is not authenticated")]
    NotAuthenticated,

    /// A session is already open. It must be closed before a new flow
    /// can start.
    #[error("session {0} is already active")]
    SessionAlreadyActive(SessionId),

    /// Only one matchmaking or invite flow can be presented at a time.
    #[error("{0} is already in progress")]
    FlowAlreadyInProgress(FlowId),

    /// The operation needs an open session and there is none.
    #[error("no active session")]
    NoActiveSession,

    /// The transport refused a payload. Reported once, never retried.
    #[error("delivery failed: {0}")]
    DeliveryFailure(#[source] TransportError),

    /// The payload could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] ProtocolError),

    /// Match request bounds or recipients are invalid.
    #[error("invalid match request: {0}")]
    InvalidRequest(String),

    /// An outcome arrived for a flow that is no longer being presented
    /// (it was cancelled, or it never existed).
    #[error("{0} is not the active flow")]
    UnknownFlow(FlowId),

    /// A transport event named someone who is not in the session.
    #[error("{0} is not a session participant")]
    UnknownParticipant(PeerId),
}
