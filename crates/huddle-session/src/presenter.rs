//! The `Presenter` trait — the seam to the embedding UI.
//!
//! Matchmaking, invite and login screens belong to the application and
//! the provider, not to Huddle. The coordinator hands each flow to a
//! `Presenter` the application passes in at construction, and reacts to
//! the flow's terminal outcome. There is no ambient "current screen"
//! lookup anywhere in the stack.

use std::future::Future;

use huddle_identity::LoginPrompt;
use huddle_protocol::Invite;
use huddle_transport::PeerMatch;

use crate::MatchRequest;

/// How a presented matchmaking or invite flow ended.
#[derive(Debug)]
pub enum FlowOutcome {
    /// Peers were found; the session is ready to use.
    Found(PeerMatch),
    /// The user dismissed the flow.
    Cancelled,
    /// The provider reported an error (timeouts included).
    Failed(String),
}

/// Presents provider flows on the application's UI surface.
///
/// The flow futures run on their own task, so they may take as long as the
/// user does. Dropping one (the coordinator does this when a flow is
/// cancelled from its side) must dismiss the flow.
pub trait Presenter: Send + Sync + 'static {
    /// Presents open or targeted matchmaking for `request`.
    fn present_matchmaking(
        &self,
        request: MatchRequest,
    ) -> impl Future<Output = FlowOutcome> + Send;

    /// Presents the join flow for an accepted invite.
    fn present_invite(
        &self,
        invite: Invite,
    ) -> impl Future<Output = FlowOutcome> + Send;

    /// Shows the provider's login UI. Fire-and-forget: the provider reports
    /// the result through its auth callbacks.
    fn present_login(&self, prompt: LoginPrompt);
}
