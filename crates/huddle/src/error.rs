//! Unified error type for Huddle.

use huddle_identity::IdentityError;
use huddle_protocol::ProtocolError;
use huddle_session::SessionError;
use huddle_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `huddle` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A transport-level error (link closed, send refused).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An identity-level error (authentication failed).
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A session-level error (not authenticated, session already active,
    /// flow in progress, no active session, delivery failure).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A presented flow ended with a provider error.
    #[error("provider error: {0}")]
    Provider(String),

    /// The coordinator task has stopped.
    #[error("coordinator is not running")]
    Unavailable,
}
