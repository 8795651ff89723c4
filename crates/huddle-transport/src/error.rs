use crate::LinkId;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The link was disconnected; nothing can be sent on it anymore.
    #[error("link {0} is closed")]
    LinkClosed(LinkId),

    /// The transport refused or failed to deliver the payload.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// There was nobody to deliver to.
    #[error("no recipients for payload")]
    NoRecipients,
}
