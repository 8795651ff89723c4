//! The provider's single input queue.
//!
//! Auth callbacks and pushed events share one channel, so the coordinator
//! sees them in exactly the order the provider produced them: an invite
//! pushed before a re-authentication is applied before it, and is then
//! discarded with the rest of the pending state.
//!
//! Pushes still occupy a single slot. A pushed event carries a semaphore
//! permit that is released when the coordinator takes the event off the
//! queue; auth callbacks are never held back.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};

use crate::{AuthCallback, AuthCallbacks, InviteListener, PushEvent};

/// Number of pushed events that may wait for the coordinator at once.
const PUSH_SLOTS: usize = 1;

/// One item of provider input, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderInput {
    Auth(AuthCallback),
    Push(PushEvent),
}

/// A queued input plus the push slot it occupies, if any.
#[derive(Debug)]
pub(crate) struct Queued {
    pub(crate) input: ProviderInput,
    pub(crate) slot: Option<OwnedSemaphorePermit>,
}

pub(crate) type InputSender = mpsc::UnboundedSender<Queued>;

/// Receiving end of the provider queue, drained by the coordinator task.
#[derive(Debug)]
pub struct ProviderInputs {
    rx: mpsc::UnboundedReceiver<Queued>,
}

impl ProviderInputs {
    /// Takes the next input, freeing its push slot.
    pub async fn recv(&mut self) -> Option<ProviderInput> {
        let Queued { input, slot } = self.rx.recv().await?;
        drop(slot);
        Some(input)
    }
}

/// Creates the callback sink and listener for one coordinator, both
/// feeding the returned queue.
pub fn provider_channel() -> (AuthCallbacks, InviteListener, ProviderInputs) {
    let (tx, rx) = mpsc::unbounded_channel();
    let slots = Arc::new(Semaphore::new(PUSH_SLOTS));
    (
        AuthCallbacks::new(tx.clone()),
        InviteListener::new(tx, slots),
        ProviderInputs { rx },
    )
}
