//! Invite arbitration: join now, or park it for the user?
//!
//! Invites and match requests pushed by the provider are treated the same
//! way. If the app is in the foreground the user is busy with something,
//! so the event is parked in a single pending slot until a UI action asks
//! for it. If the app is not in the foreground it was opened (or resumed)
//! because of this very event, so it is joined right away.

use huddle_identity::PushEvent;
use huddle_protocol::{Identity, Invite};
use serde::{Deserialize, Serialize};

/// Whether the app is visible to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppVisibility {
    /// Running and visible; the user may be in the middle of something.
    #[default]
    Foreground,
    /// Launched or resumed by the event being arbitrated.
    Background,
}

/// What to do with a new event when the slot is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PendingPolicy {
    /// The newest event replaces the pending one (last invite wins).
    #[default]
    ReplaceExisting,
    /// The pending event stays; the newcomer is dropped.
    KeepExisting,
}

/// A deferred join waiting for the user.
///
/// One variant per event shape, so an invite and a match request can never
/// both be pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Invite(Invite),
    MatchRequest(Vec<Identity>),
}

impl From<PushEvent> for PendingAction {
    fn from(event: PushEvent) -> Self {
        match event {
            PushEvent::InviteAccepted(invite) => Self::Invite(invite),
            PushEvent::MatchRequested(recipients) => {
                Self::MatchRequest(recipients)
            }
        }
    }
}

/// The arbitrator's decision for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arbitration {
    /// Join now.
    ProcessNow(PendingAction),
    /// Parked in the slot. `replaced` is what was pending before, if
    /// anything.
    Deferred { replaced: Option<PendingAction> },
    /// The slot was taken and the policy keeps the existing event.
    Ignored(PendingAction),
}

/// Holds at most one pending action and applies the deferral policy.
#[derive(Debug, Default)]
pub struct InviteArbitrator {
    slot: Option<PendingAction>,
    policy: PendingPolicy,
}

impl InviteArbitrator {
    /// Creates an empty arbitrator.
    pub fn new(policy: PendingPolicy) -> Self {
        Self { slot: None, policy }
    }

    /// Decides what to do with a pushed event.
    pub fn arbitrate(
        &mut self,
        action: PendingAction,
        visibility: AppVisibility,
    ) -> Arbitration {
        match visibility {
            AppVisibility::Background => {
                tracing::info!(?action, "app opened by invite, processing now");
                Arbitration::ProcessNow(action)
            }
            AppVisibility::Foreground => self.defer(action),
        }
    }

    /// Parks `action` in the slot, honoring the policy.
    pub fn defer(&mut self, action: PendingAction) -> Arbitration {
        match (&self.slot, self.policy) {
            (Some(_), PendingPolicy::KeepExisting) => {
                tracing::info!(?action, "pending slot taken, keeping existing");
                Arbitration::Ignored(action)
            }
            _ => {
                let replaced = self.slot.replace(action);
                if let Some(old) = &replaced {
                    tracing::info!(?old, "pending action replaced");
                }
                tracing::info!("action pending, waiting for the user");
                Arbitration::Deferred { replaced }
            }
        }
    }

    /// Takes the pending action, leaving the slot empty.
    pub fn take(&mut self) -> Option<PendingAction> {
        self.slot.take()
    }

    /// Discards the pending action without processing it.
    pub fn clear(&mut self) -> Option<PendingAction> {
        let discarded = self.slot.take();
        if let Some(action) = &discarded {
            tracing::info!(?action, "pending action discarded");
        }
        discarded
    }

    /// The pending action, if any.
    pub fn pending(&self) -> Option<&PendingAction> {
        self.slot.as_ref()
    }

    /// The configured policy.
    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }
}
