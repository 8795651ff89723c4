//! In-memory link for tests and demos.
//!
//! [`pair`] builds a [`PeerMatch`] whose link records every outbound frame
//! instead of sending it anywhere, plus a [`LoopbackRemote`] that plays the
//! part of the other participants: it injects inbound data, reports
//! connection changes, can make sends fail, and can echo outbound payloads
//! straight back as if a peer had sent them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use huddle_protocol::{Channel, ConnectionState, Identity, PeerId};
use tokio::sync::mpsc;

use crate::{LinkEvent, LinkId, MatchLink, PeerMatch, TransportError};

/// Counter for generating unique link IDs.
static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// An outbound payload captured by the loopback link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub payload: Vec<u8>,
    pub to: Vec<PeerId>,
    pub channel: Channel,
}

struct Shared {
    id: LinkId,
    /// `None` once either side closed the link; dropping the sender ends
    /// the inbound stream.
    events: Mutex<Option<mpsc::UnboundedSender<LinkEvent>>>,
    sent: Mutex<Vec<SentFrame>>,
    failing: AtomicBool,
    echo_from: Mutex<Option<PeerId>>,
}

impl Shared {
    fn push(&self, event: LinkEvent) -> bool {
        match lock(&self.events).as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    fn close(&self) -> bool {
        lock(&self.events).take().is_some()
    }

    fn is_closed(&self) -> bool {
        lock(&self.events).is_none()
    }
}

/// Outbound half of a loopback pair.
pub struct LoopbackLink {
    shared: Arc<Shared>,
}

impl MatchLink for LoopbackLink {
    fn send(
        &self,
        payload: &[u8],
        to: &[PeerId],
        channel: Channel,
    ) -> Result<(), TransportError> {
        if self.shared.is_closed() {
            return Err(TransportError::LinkClosed(self.shared.id));
        }
        if to.is_empty() {
            return Err(TransportError::NoRecipients);
        }
        if self.shared.failing.load(Ordering::Acquire) {
            return Err(TransportError::SendFailed(
                "loopback link refused the payload".into(),
            ));
        }

        lock(&self.shared.sent).push(SentFrame {
            payload: payload.to_vec(),
            to: to.to_vec(),
            channel,
        });

        let echo = *lock(&self.shared.echo_from);
        if let Some(from) = echo {
            self.shared.push(LinkEvent::Data {
                from,
                payload: payload.to_vec(),
            });
        }
        Ok(())
    }

    fn disconnect(&self) {
        if self.shared.close() {
            tracing::debug!(link = %self.shared.id, "loopback link disconnected");
        }
    }

    fn id(&self) -> LinkId {
        self.shared.id
    }
}

/// The far side of a loopback pair. Cheap to clone.
#[derive(Clone)]
pub struct LoopbackRemote {
    shared: Arc<Shared>,
}

impl LoopbackRemote {
    /// Delivers `payload` as if `from` had sent it.
    ///
    /// Returns `false` if the link is already closed.
    pub fn deliver(&self, from: PeerId, payload: impl Into<Vec<u8>>) -> bool {
        self.shared.push(LinkEvent::Data {
            from,
            payload: payload.into(),
        })
    }

    /// Reports a connection change for `peer`.
    pub fn set_connection(&self, peer: PeerId, state: ConnectionState) -> bool {
        self.shared.push(LinkEvent::ConnectionChanged { peer, state })
    }

    /// Makes every following send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.shared.failing.store(failing, Ordering::Release);
    }

    /// Echoes every successful send back as inbound data from `peer`.
    /// `None` turns echoing off.
    pub fn echo_from(&self, peer: Option<PeerId>) {
        *lock(&self.shared.echo_from) = peer;
    }

    /// Every frame sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentFrame> {
        lock(&self.shared.sent).clone()
    }

    /// Ends the inbound stream, as a provider-side full disconnect would.
    pub fn close(&self) {
        self.shared.close();
    }

    /// `true` once either side closed the link.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// The link's identifier.
    pub fn link_id(&self) -> LinkId {
        self.shared.id
    }
}

/// Builds a connected loopback pair for the given remote participants.
pub fn pair(participants: Vec<Identity>) -> (PeerMatch, LoopbackRemote) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        id: LinkId::new(NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed)),
        events: Mutex::new(Some(tx)),
        sent: Mutex::new(Vec::new()),
        failing: AtomicBool::new(false),
        echo_from: Mutex::new(None),
    });

    let peer_match = PeerMatch {
        participants,
        link: Arc::new(LoopbackLink {
            shared: Arc::clone(&shared),
        }),
        events: rx,
    };
    (peer_match, LoopbackRemote { shared })
}

/// A poisoned lock only means another test thread panicked mid-push;
/// the recorded data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
