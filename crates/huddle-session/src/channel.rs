//! Chat over the open session's link.

use std::sync::Arc;

use huddle_protocol::{Channel, ChatMessage, Codec, Identity, PeerId, Utf8Codec};
use huddle_transport::MatchLink;

use crate::{EventLog, Session, SessionError};

/// Sends and receives chat text for the open session.
///
/// The channel holds the session's outbound link while one is attached.
/// Every message it sends or accepts is appended to the [`EventLog`] it
/// is given.
pub struct MessageChannel<C: Codec = Utf8Codec> {
    codec: C,
    channel: Channel,
    link: Option<Arc<dyn MatchLink>>,
}

impl<C: Codec> MessageChannel<C> {
    pub fn new(codec: C, channel: Channel) -> Self {
        Self {
            codec,
            channel,
            link: None,
        }
    }

    /// Routes future sends through `link`.
    pub fn attach(&mut self, link: Arc<dyn MatchLink>) {
        tracing::debug!(link = %link.id(), "link attached");
        self.link = Some(link);
    }

    /// Drops the link, returning it so the caller can disconnect it.
    pub fn detach(&mut self) -> Option<Arc<dyn MatchLink>> {
        self.link.take()
    }

    pub fn is_attached(&self) -> bool {
        self.link.is_some()
    }

    /// Sends `text` to every remote participant of `session`.
    ///
    /// The message is appended as `Outgoing` once the link has accepted
    /// the payload for delivery. Nothing is appended when there is no open
    /// session.
    ///
    /// # Errors
    /// - [`SessionError::NoActiveSession`]: no open session or no link
    /// - [`SessionError::Encode`]: the codec refused the text
    /// - [`SessionError::DeliveryFailure`]: the link refused the payload.
    ///   The message is still appended, since the user did send it.
    pub fn send(
        &self,
        session: Option<&Session>,
        local: &Identity,
        text: &str,
        log: &mut EventLog,
    ) -> Result<(), SessionError> {
        let session = session
            .filter(|s| s.is_open())
            .ok_or(SessionError::NoActiveSession)?;
        let link = self.link.as_ref().ok_or(SessionError::NoActiveSession)?;

        let payload = self.codec.encode(text).map_err(SessionError::Encode)?;
        let recipients = session.recipients();
        let result = link.send(&payload, &recipients, self.channel);

        log.append(ChatMessage::outgoing(local.clone(), text));

        match result {
            Ok(()) => {
                tracing::debug!(
                    session_id = %session.id,
                    recipients = recipients.len(),
                    bytes = payload.len(),
                    "message sent"
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "message delivery failed");
                Err(SessionError::DeliveryFailure(e))
            }
        }
    }

    /// Accepts a payload from `from`.
    ///
    /// Returns the appended message, or `None` if the payload was dropped:
    /// no open session, a sender outside the session, or bytes the codec
    /// can't decode.
    pub fn receive(
        &self,
        session: Option<&Session>,
        from: PeerId,
        payload: &[u8],
        log: &mut EventLog,
    ) -> Option<ChatMessage> {
        let Some(session) = session.filter(|s| s.is_open()) else {
            tracing::debug!(%from, "data without open session, dropping");
            return None;
        };
        let Some(sender) = session.participant(from) else {
            tracing::debug!(%from, "data from non-participant, dropping");
            return None;
        };

        let text = match self.codec.decode(payload) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(%from, error = %e, "undecodable payload, dropping");
                return None;
            }
        };

        let message = ChatMessage::incoming(sender.clone(), text);
        log.append(message.clone());
        Some(message)
    }
}

impl Default for MessageChannel<Utf8Codec> {
    fn default() -> Self {
        Self::new(Utf8Codec, Channel::default())
    }
}

impl<C: Codec> std::fmt::Debug for MessageChannel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("channel", &self.channel)
            .field("link", &self.link.as_ref().map(|l| l.id()))
            .finish()
    }
}
