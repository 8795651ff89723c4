//! Identity handling for Huddle.
//!
//! This crate covers everything between "who is the local participant?"
//! and the identity provider:
//!
//! 1. **Provider boundary** — the [`IdentityProvider`] trait, which starts
//!    authentication and accepts an [`InviteListener`]
//! 2. **Auth state** — [`IdentityClient`], the `AuthState` machine driven
//!    only by provider callbacks
//! 3. **Pushed events** — invites and match requests the provider delivers
//!    through the listener's single slot
//! 4. **Provider queue** — [`provider_channel`] orders callbacks and pushes
//!    into one [`ProviderInputs`] stream for the coordinator
//!
//! # How it fits in the stack
//!
//! ```text
//! huddle (above)  ← gates matchmaking on AuthState, arbitrates pushed invites
//!     ↕
//! Identity Layer (this crate)  ← provider callbacks, local identity
//!     ↕
//! Protocol Layer (below)  ← Identity, Invite
//! ```

mod auth;
mod client;
mod error;
mod input;
mod listener;

pub use auth::{AuthCallback, AuthCallbacks, IdentityProvider, LoginPrompt};
pub use client::{AuthState, IdentityClient};
pub use error::IdentityError;
pub use input::{ProviderInput, ProviderInputs, provider_channel};
pub use listener::{InviteListener, PushEvent};
