//! Pushed invites and match requests.
//!
//! The provider delivers these outside of any matchmaking call, usually
//! because the user accepted something from an OS notification. They share
//! the provider queue with auth callbacks but hold a single slot: the
//! provider waits until the coordinator has taken the previous event, so
//! races between two quick pushes resolve in a deterministic order.

use std::sync::Arc;

use huddle_protocol::{Identity, Invite};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::IdentityError;
use crate::input::{InputSender, ProviderInput, Queued};

/// An event the provider pushes to the authenticated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The user accepted an invite into someone else's session.
    InviteAccepted(Invite),
    /// The user asked to start a session with exactly these recipients.
    MatchRequested(Vec<Identity>),
}

/// Handle the provider uses to push events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InviteListener {
    tx: InputSender,
    slots: Arc<Semaphore>,
}

impl InviteListener {
    pub(crate) fn new(tx: InputSender, slots: Arc<Semaphore>) -> Self {
        Self { tx, slots }
    }

    /// Pushes an accepted invite, waiting for the slot to free up.
    pub async fn invite_accepted(
        &self,
        invite: Invite,
    ) -> Result<(), IdentityError> {
        self.push(PushEvent::InviteAccepted(invite)).await
    }

    /// Pushes a match request, waiting for the slot to free up.
    pub async fn match_requested(
        &self,
        recipients: Vec<Identity>,
    ) -> Result<(), IdentityError> {
        self.push(PushEvent::MatchRequested(recipients)).await
    }

    /// Pushes any event, waiting for the slot to free up.
    pub async fn push(&self, event: PushEvent) -> Result<(), IdentityError> {
        if self.tx.is_closed() {
            return Err(IdentityError::ListenerClosed);
        }
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| IdentityError::ListenerClosed)?;
        self.enqueue(event, slot)
    }

    /// Pushes without waiting, for providers that call back from
    /// synchronous code.
    ///
    /// # Errors
    /// - [`IdentityError::SlotBusy`] — the previous event wasn't taken yet
    /// - [`IdentityError::ListenerClosed`] — the coordinator is gone
    pub fn try_push(&self, event: PushEvent) -> Result<(), IdentityError> {
        if self.tx.is_closed() {
            return Err(IdentityError::ListenerClosed);
        }
        let slot = Arc::clone(&self.slots).try_acquire_owned().map_err(|e| match e {
            TryAcquireError::NoPermits => IdentityError::SlotBusy,
            TryAcquireError::Closed => IdentityError::ListenerClosed,
        })?;
        self.enqueue(event, slot)
    }

    fn enqueue(
        &self,
        event: PushEvent,
        slot: OwnedSemaphorePermit,
    ) -> Result<(), IdentityError> {
        self.tx
            .send(Queued {
                input: ProviderInput::Push(event),
                slot: Some(slot),
            })
            .map_err(|_| IdentityError::ListenerClosed)
    }
}
