//! Authentication state for the local participant.
//!
//! `IdentityClient` is a plain state machine. It doesn't talk to the
//! provider; the coordinator task does that and feeds every terminal
//! callback in here, so `AuthState` only ever changes on that one task.

use std::fmt;

use huddle_protocol::Identity;

use crate::IdentityError;

/// Where the local participant stands with the provider.
///
/// ```text
///   Unauthenticated ──(begin)──→ Authenticating ──(success)──→ Authenticated
///          ↑                           │                            │
///          └─────────(failure)─────────┘                            │
///          └──────────────────(later failure)───────────────────────┘
/// ```
///
/// `Authenticated → Authenticating` happens on an explicit
/// re-authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthState {
    /// Returns `true` only for [`AuthState::Authenticated`].
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "Unauthenticated"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
        }
    }
}

/// Tracks the local participant's authentication.
#[derive(Debug, Default)]
pub struct IdentityClient {
    state: AuthState,
    local: Option<Identity>,
}

impl IdentityClient {
    /// Creates a client in the `Unauthenticated` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an attempt as started.
    ///
    /// Returns `false` if an attempt is already in flight; the caller
    /// should wait for that one instead of asking the provider again.
    pub fn begin(&mut self) -> bool {
        if matches!(self.state, AuthState::Authenticating) {
            return false;
        }
        self.state = AuthState::Authenticating;
        tracing::debug!("authentication started");
        true
    }

    /// Records a successful authentication.
    ///
    /// Accepted in any state: providers may re-report success on their
    /// own (e.g. after the app returns to the foreground).
    pub fn on_authenticated(&mut self, identity: Identity) -> &Identity {
        tracing::info!(
            peer = %identity.id,
            name = %identity.display_name,
            "local participant authenticated"
        );
        self.state = AuthState::Authenticated;
        self.local.insert(identity)
    }

    /// Records a failed authentication and returns the error to surface.
    pub fn on_failed(&mut self, reason: &str) -> IdentityError {
        tracing::warn!(%reason, "authentication failed");
        self.state = AuthState::Unauthenticated;
        self.local = None;
        IdentityError::AuthFailed(reason.to_string())
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Shorthand for `state().is_authenticated()`.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// The authenticated local participant, if any.
    pub fn local(&self) -> Option<&Identity> {
        self.local.as_ref()
    }
}
