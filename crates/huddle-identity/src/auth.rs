//! The identity provider boundary.
//!
//! Huddle doesn't authenticate anyone itself; a platform service does
//! (a game-center style provider, a custom backend, a test double).
//! Huddle defines the [`IdentityProvider`] trait and reacts to whatever the
//! provider reports through [`AuthCallbacks`].
//!
//! # Callback model
//!
//! Providers report asynchronously and possibly more than once: first
//! "the user needs to log in, show this", later "authenticated as X" or
//! "failed". Some providers also re-report success later on their own.
//! So instead of returning a value, [`IdentityProvider::authenticate`]
//! receives a callback sink it may keep and call from any thread. Every
//! call is queued for the coordinator task, behind any invite pushed
//! earlier, and the task is the only place where `AuthState` changes.

use huddle_protocol::Identity;

use crate::InviteListener;
use crate::input::{InputSender, ProviderInput, Queued};

/// The login surface a provider wants shown before it can finish.
///
/// Opaque to Huddle: it is handed to the embedding application's
/// presenter unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPrompt {
    /// Provider-side handle for the surface.
    pub id: u64,
    /// Short description, e.g. the provider's name.
    pub title: String,
}

/// One report from the provider about an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCallback {
    /// The provider needs its login UI shown. Not terminal.
    PresentLogin(LoginPrompt),
    /// Terminal: the local participant is authenticated.
    Authenticated(Identity),
    /// Terminal: authentication failed.
    Failed(String),
}

/// Callback sink handed to the provider.
///
/// Cheap to clone; every method is synchronous and safe to call from any
/// thread. Each returns `false` if the coordinator is gone.
#[derive(Debug, Clone)]
pub struct AuthCallbacks {
    tx: InputSender,
}

impl AuthCallbacks {
    pub(crate) fn new(tx: InputSender) -> Self {
        Self { tx }
    }

    /// Asks the embedding application to show the provider's login UI.
    pub fn present_login(&self, prompt: LoginPrompt) -> bool {
        self.report(AuthCallback::PresentLogin(prompt))
    }

    /// Reports a successful authentication.
    pub fn succeeded(&self, identity: Identity) -> bool {
        self.report(AuthCallback::Authenticated(identity))
    }

    /// Reports a failed authentication.
    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.report(AuthCallback::Failed(reason.into()))
    }

    /// Sends a raw callback.
    pub fn report(&self, callback: AuthCallback) -> bool {
        self.tx
            .send(Queued {
                input: ProviderInput::Auth(callback),
                slot: None,
            })
            .is_ok()
    }
}

/// Authenticates the local participant and pushes invites to it.
///
/// # Trait bounds
///
/// - `Send + Sync` → the coordinator task owns the provider and may be
///   scheduled on any runtime thread.
/// - `'static` → the provider lives as long as the coordinator.
///
/// # Example
///
/// ```rust
/// use huddle_identity::{AuthCallbacks, IdentityProvider, InviteListener};
/// use huddle_protocol::Identity;
///
/// /// Authenticates everyone as Ana, instantly.
/// struct FixedProvider;
///
/// impl IdentityProvider for FixedProvider {
///     fn authenticate(&self, callbacks: AuthCallbacks) {
///         callbacks.succeeded(Identity::local(1, "Ana"));
///     }
///
///     fn register_listener(&self, _listener: InviteListener) {}
/// }
/// ```
pub trait IdentityProvider: Send + Sync + 'static {
    /// Starts (or restarts) authentication.
    ///
    /// Must return promptly; results go through `callbacks`, possibly
    /// after the login UI has been shown. The provider may keep
    /// `callbacks` and report again later.
    fn authenticate(&self, callbacks: AuthCallbacks);

    /// Registers the listener that receives pushed invites and match
    /// requests for the authenticated participant.
    ///
    /// Called after every successful authentication; implementations
    /// should replace any previously registered listener.
    fn register_listener(&self, listener: InviteListener);
}
