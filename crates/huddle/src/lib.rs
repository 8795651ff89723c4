//! # Huddle
//!
//! Peer-session coordinator for small multiplayer apps.
//!
//! Huddle authenticates the local participant against an identity
//! provider, matches peers into a single shared session (through
//! matchmaking, accepted invites or pushed match requests) and carries a
//! lightweight chat channel once the session is open. The application
//! supplies the provider, a [`Presenter`](session::Presenter) for the
//! provider's screens, and the transport link matchmaking hands back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use huddle::prelude::*;
//!
//! // Implement IdentityProvider and Presenter for your platform, then:
//! // let handle = CoordinatorHandle::builder().spawn(provider, presenter);
//! // handle.authenticate().await?;
//! // if let FlowResult::Joined(session) = handle.start_matchmaking(2, 4).await? {
//! //     handle.send("gg").await?;
//! // }
//! ```

mod builder;
mod coordinator;
mod error;

pub use builder::CoordinatorBuilder;
pub use coordinator::{CoordinatorHandle, FlowResult, Snapshot};
pub use error::HuddleError;

pub use huddle_identity as identity;
pub use huddle_protocol as protocol;
pub use huddle_session as session;
pub use huddle_transport as transport;

/// Everything needed to embed a coordinator.
pub mod prelude {
    pub use crate::{CoordinatorBuilder, CoordinatorHandle, FlowResult, HuddleError, Snapshot};
    pub use huddle_identity::{
        AuthCallbacks, AuthState, IdentityProvider, InviteListener, LoginPrompt,
    };
    pub use huddle_protocol::{
        Channel, ChatMessage, Codec, ConnectionState, Identity, Invite, InviteId, PeerId,
        Utf8Codec,
    };
    pub use huddle_session::{
        AppVisibility, CoordinatorConfig, FlowOutcome, LogUpdate, MatchBounds, MatchRequest,
        PendingAction, PendingPolicy, Presenter, Session, SessionError, SessionPhase,
    };
    pub use huddle_transport::{LinkEvent, MatchLink, PeerMatch};
}
