//! The session coordinator: owns the single active session.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Gating every flow on authentication
//! - Allowing one presented flow at a time
//! - Enforcing the single-open-session invariant
//! - Installing the session when a flow finds peers
//! - Recording per-participant connection changes
//! - Closing the session on leave, full disconnect or teardown
//!
//! # Concurrency note
//!
//! `SessionCoordinator` is NOT thread-safe by itself. It is owned by the
//! coordinator task in the `huddle` crate and only ever touched from there,
//! so every provider callback is applied in the order it was queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use huddle_identity::AuthState;
use huddle_protocol::{ConnectionEvent, ConnectionState, Identity, Invite, PeerId};

use crate::{
    CloseReason, FlowId, FlowKind, MatchBounds, MatchRequest, Session,
    SessionError, SessionId, SessionPhase, SessionState,
};

/// Counter for generating unique flow IDs.
static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(1);

/// The flow currently being presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveFlow {
    pub id: FlowId,
    pub kind: FlowKind,
}

/// Result of applying a connection change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUpdate {
    /// What to record in the event log.
    pub event: ConnectionEvent,
    /// The session, if this change closed it.
    pub closed: Option<Session>,
}

/// Owns the lifecycle of the single active session.
///
/// ## Lifecycle
///
/// ```text
/// start_matchmaking() / accept_invite() / accept_match_request()
///        │
///        ▼
///   [Searching] ──resolve_cancelled() / resolve_failed() / cancel_flow()──→ [NoSession]
///        │
///   resolve_found()
///        ▼
///     [Open] ──close()──→ [Closed] ──start_*()──→ [Searching] ...
/// ```
#[derive(Debug, Default)]
pub struct SessionCoordinator {
    phase: SessionPhase,
    flow: Option<ActiveFlow>,
    /// The open session, or the last one after it closed.
    session: Option<Session>,
    /// Last reported state per participant of the open session.
    connections: HashMap<PeerId, ConnectionState>,
    close_when_all_disconnected: bool,
}

impl SessionCoordinator {
    /// Creates a coordinator with no session.
    ///
    /// `close_when_all_disconnected` closes the session once every
    /// participant has reported `Disconnected`.
    pub fn new(close_when_all_disconnected: bool) -> Self {
        Self {
            close_when_all_disconnected,
            ..Self::default()
        }
    }

    // =====================================================================
    // Starting flows
    // =====================================================================

    /// Checks whether a flow could start right now.
    ///
    /// # Errors
    /// In this order:
    /// - [`SessionError::NotAuthenticated`]
    /// - [`SessionError::SessionAlreadyActive`]
    /// - [`SessionError::FlowAlreadyInProgress`]
    pub fn check_can_start(&self, auth: AuthState) -> Result<(), SessionError> {
        if !auth.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        if let Some(session) = self.open_session() {
            return Err(SessionError::SessionAlreadyActive(session.id.clone()));
        }
        if let Some(flow) = &self.flow {
            return Err(SessionError::FlowAlreadyInProgress(flow.id));
        }
        Ok(())
    }

    /// Starts open matchmaking for `request`.
    pub fn start_matchmaking(
        &mut self,
        auth: AuthState,
        request: &MatchRequest,
    ) -> Result<ActiveFlow, SessionError> {
        request.validate()?;
        self.begin_flow(auth, FlowKind::Matchmaking)
    }

    /// Starts the join flow for an accepted invite.
    pub fn accept_invite(
        &mut self,
        auth: AuthState,
        invite: &Invite,
    ) -> Result<ActiveFlow, SessionError> {
        let flow = self.begin_flow(auth, FlowKind::Invite)?;
        tracing::info!(
            flow = %flow.id,
            invite = %invite.id,
            from = %invite.sender.display_name,
            "processing invite"
        );
        Ok(flow)
    }

    /// Starts matchmaking targeting exactly `recipients`.
    ///
    /// Returns the request to present alongside the flow.
    pub fn accept_match_request(
        &mut self,
        auth: AuthState,
        recipients: Vec<Identity>,
        bounds: MatchBounds,
    ) -> Result<(ActiveFlow, MatchRequest), SessionError> {
        let request = MatchRequest::targeted(recipients, bounds)?;
        let flow = self.begin_flow(auth, FlowKind::MatchRequest)?;
        tracing::info!(
            flow = %flow.id,
            recipients = request.recipients.len(),
            "processing match request"
        );
        Ok((flow, request))
    }

    fn begin_flow(
        &mut self,
        auth: AuthState,
        kind: FlowKind,
    ) -> Result<ActiveFlow, SessionError> {
        if let Err(e) = self.check_can_start(auth) {
            tracing::warn!(%kind, error = %e, "flow refused");
            return Err(e);
        }

        let flow = ActiveFlow {
            id: FlowId(NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
        };
        self.flow = Some(flow);
        self.phase = SessionPhase::Searching;
        tracing::info!(flow = %flow.id, %kind, "flow presented");
        Ok(flow)
    }

    // =====================================================================
    // Resolving flows
    // =====================================================================

    /// The flow found peers: installs them as the new open session.
    ///
    /// # Errors
    /// [`SessionError::UnknownFlow`] if `flow` isn't the active flow
    /// (it was cancelled meanwhile). Nothing changes in that case.
    pub fn resolve_found(
        &mut self,
        flow: FlowId,
        participants: Vec<Identity>,
    ) -> Result<&Session, SessionError> {
        let active = self.take_flow(flow)?;

        self.connections.clear();
        self.phase = SessionPhase::Open;
        let session = Session {
            id: SessionId::generate(),
            participants,
            state: SessionState::Open,
            origin: active.kind,
        };
        tracing::info!(
            flow = %flow,
            session_id = %session.id,
            participants = session.participants.len(),
            "session found"
        );
        Ok(self.session.insert(session))
    }

    /// The user dismissed the flow.
    pub fn resolve_cancelled(
        &mut self,
        flow: FlowId,
    ) -> Result<ActiveFlow, SessionError> {
        let active = self.take_flow(flow)?;
        self.phase = SessionPhase::NoSession;
        tracing::info!(flow = %flow, kind = %active.kind, "flow cancelled");
        Ok(active)
    }

    /// The provider reported an error.
    pub fn resolve_failed(
        &mut self,
        flow: FlowId,
        reason: &str,
    ) -> Result<ActiveFlow, SessionError> {
        let active = self.take_flow(flow)?;
        self.phase = SessionPhase::NoSession;
        tracing::warn!(flow = %flow, kind = %active.kind, %reason, "flow failed");
        Ok(active)
    }

    /// Cancels the presented flow from the coordinator side.
    ///
    /// Returns `None` if nothing was being presented.
    pub fn cancel_flow(&mut self) -> Option<ActiveFlow> {
        let active = self.flow.take()?;
        self.phase = SessionPhase::NoSession;
        tracing::info!(flow = %active.id, kind = %active.kind, "flow cancelled by coordinator");
        Some(active)
    }

    fn take_flow(&mut self, flow: FlowId) -> Result<ActiveFlow, SessionError> {
        match self.flow {
            Some(active) if active.id == flow => {
                self.flow = None;
                Ok(active)
            }
            _ => Err(SessionError::UnknownFlow(flow)),
        }
    }

    // =====================================================================
    // Open session
    // =====================================================================

    /// Records a participant's connection change.
    ///
    /// Membership is never altered; the session only closes when the
    /// all-disconnected policy is on and every participant is now
    /// `Disconnected`.
    ///
    /// # Errors
    /// - [`SessionError::NoActiveSession`] — nothing is open
    /// - [`SessionError::UnknownParticipant`] — `peer` isn't in the session
    pub fn connection_changed(
        &mut self,
        peer: PeerId,
        state: ConnectionState,
    ) -> Result<ConnectionUpdate, SessionError> {
        let session = self.open_session().ok_or(SessionError::NoActiveSession)?;
        let identity = session
            .participant(peer)
            .cloned()
            .ok_or(SessionError::UnknownParticipant(peer))?;
        let participant_ids: Vec<PeerId> =
            session.participants.iter().map(|p| p.id).collect();

        self.connections.insert(peer, state);
        match state {
            ConnectionState::Connected => tracing::info!(%peer, "participant connected"),
            ConnectionState::Disconnected => tracing::info!(%peer, "participant disconnected"),
            ConnectionState::Unknown => tracing::warn!(%peer, "participant in unknown state"),
        }

        let all_gone = participant_ids.iter().all(|id| {
            matches!(self.connections.get(id), Some(ConnectionState::Disconnected))
        });
        let closed = if self.close_when_all_disconnected && all_gone {
            self.close(CloseReason::AllDisconnected).ok()
        } else {
            None
        };

        Ok(ConnectionUpdate {
            event: ConnectionEvent { identity, state },
            closed,
        })
    }

    /// Closes the open session and returns it (now `Closed`).
    ///
    /// # Errors
    /// [`SessionError::NoActiveSession`] if nothing is open.
    pub fn close(&mut self, reason: CloseReason) -> Result<Session, SessionError> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.is_open())
            .ok_or(SessionError::NoActiveSession)?;

        session.state = SessionState::Closed;
        self.phase = SessionPhase::Closed;
        self.connections.clear();
        tracing::info!(session_id = %session.id, %reason, "session closed");
        Ok(session.clone())
    }

    // =====================================================================
    // Accessors
    // =====================================================================

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The flow being presented, if any.
    pub fn active_flow(&self) -> Option<ActiveFlow> {
        self.flow
    }

    /// The open session, if any.
    pub fn open_session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| s.is_open())
    }

    /// The open session, or the most recently closed one.
    pub fn last_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Last reported connection state for `peer` in the open session.
    pub fn connection(&self, peer: PeerId) -> Option<ConnectionState> {
        self.connections.get(&peer).copied()
    }
}

// =========================================================================
// Tests
// =========================================================================
