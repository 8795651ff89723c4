//! Session lifecycle for Huddle.
//!
//! Everything in this crate is synchronous and single-owner: the `huddle`
//! crate runs it inside one task and feeds it commands and provider
//! callbacks in order.
//!
//! # Key types
//!
//! - [`SessionCoordinator`] — the `NoSession → Searching → Open → Closed`
//!   state machine and the single-active-session invariant
//! - [`InviteArbitrator`] — decides whether a pushed invite is joined now
//!   or parked in the single pending slot
//! - [`MessageChannel`] — chat over the open session's link
//! - [`EventLog`] — the observable, append-only record shown to the user
//! - [`Presenter`] — the trait the embedding UI implements to show
//!   matchmaking, invite and login flows
//! - [`CoordinatorConfig`] — greeting, default bounds, pending policy, etc.

mod arbiter;
mod channel;
mod config;
mod coordinator;
mod error;
mod log;
mod presenter;
mod request;
mod session;

pub use arbiter::{
    AppVisibility, Arbitration, InviteArbitrator, PendingAction, PendingPolicy,
};
pub use channel::MessageChannel;
pub use config::{CoordinatorConfig, MatchBounds, SessionPhase};
pub use coordinator::{ActiveFlow, ConnectionUpdate, SessionCoordinator};
pub use error::SessionError;
pub use log::{EventLog, LogEntry, LogObservers, LogUpdate};
pub use presenter::{FlowOutcome, Presenter};
pub use request::MatchRequest;
pub use session::{CloseReason, FlowId, FlowKind, Session, SessionId, SessionState};
