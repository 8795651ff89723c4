//! Error types for the identity layer.

/// Errors that can occur while authenticating or delivering pushed events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The provider reported that authentication failed. Not fatal: the
    /// caller may retry.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The single push slot is still occupied by an undelivered event.
    #[error("invite listener slot is busy")]
    SlotBusy,

    /// The coordinator that registered the listener is gone.
    #[error("invite listener is closed")]
    ListenerClosed,
}
