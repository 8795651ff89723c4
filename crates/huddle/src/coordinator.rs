//! Coordinator actor: the single owner of all session state.
//!
//! One Tokio task owns the `IdentityClient`, the `InviteArbitrator` slot,
//! the `SessionCoordinator`, the `MessageChannel` and the `EventLog`.
//! Everything else talks to it through channels:
//!
//! ```text
//! CoordinatorHandle ──commands──┐
//! AuthCallbacks ──┐             │
//!                 ├─provider────┼──→ [coordinator task] ──→ watch / broadcast
//! InviteListener ─┘             │                             observers
//! presentation tasks ──outcomes─┤
//! PeerMatch events ───link──────┘
//! ```
//!
//! Provider callbacks may fire on any thread; they only ever enqueue onto
//! one queue, so every state change happens here, in arrival order.

use std::future::Future;
use std::sync::Arc;

use huddle_identity::{
    AuthCallback, AuthCallbacks, AuthState, IdentityClient, IdentityProvider,
    InviteListener, ProviderInput, ProviderInputs, PushEvent, provider_channel,
};
use huddle_protocol::{Codec, ConnectionState, Identity, Invite, PeerId};
use huddle_session::{
    ActiveFlow, AppVisibility, Arbitration, CloseReason, CoordinatorConfig,
    EventLog, FlowId, FlowOutcome, InviteArbitrator, LogObservers, LogUpdate,
    MatchRequest, MessageChannel, PendingAction, Presenter, Session,
    SessionCoordinator, SessionError, SessionPhase,
};
use huddle_transport::{LinkEvent, PeerMatch};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::AbortHandle;

use crate::HuddleError;

/// How an awaited flow ended, when it didn't fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    /// Peers were found and the session is open.
    Joined(Session),
    /// The flow was dismissed, by the user or by `cancel_flow()`.
    Cancelled,
}

/// Point-in-time view of the coordinator, for UI and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: SessionPhase,
    pub auth: AuthState,
    pub local: Option<Identity>,
    /// The open session, if any.
    pub session: Option<Session>,
    pub active_flow: Option<ActiveFlow>,
    pub pending: Option<PendingAction>,
    pub visibility: AppVisibility,
}

type AuthReply = oneshot::Sender<Result<Identity, HuddleError>>;
type FlowReply = oneshot::Sender<Result<FlowResult, HuddleError>>;
type FlowWaiter = oneshot::Receiver<Result<FlowResult, HuddleError>>;

/// Commands sent to the coordinator task through its channel.
pub(crate) enum Command {
    Authenticate {
        reply: AuthReply,
    },
    StartMatchmaking {
        min: usize,
        max: usize,
        reply: FlowReply,
    },
    /// Routes an action straight to its join path, skipping arbitration.
    Route {
        action: PendingAction,
        reply: FlowReply,
    },
    /// Replies with a waiter for the started flow, or `None` when
    /// nothing was pending.
    ProcessPending {
        reply: oneshot::Sender<Result<Option<FlowWaiter>, HuddleError>>,
    },
    CancelFlow {
        reply: oneshot::Sender<bool>,
    },
    LeaveSession {
        reply: oneshot::Sender<Result<Session, HuddleError>>,
    },
    Send {
        text: String,
        reply: oneshot::Sender<Result<(), HuddleError>>,
    },
    SetVisibility {
        visibility: AppVisibility,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// =========================================================================
// Handle
// =========================================================================

/// Handle to a running coordinator. Cheap to clone.
///
/// Every method fails with [`HuddleError::Unavailable`] once the
/// coordinator task has stopped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    auth_state: watch::Receiver<AuthState>,
    log: LogObservers,
}

impl CoordinatorHandle {
    /// Creates a new builder.
    pub fn builder() -> crate::CoordinatorBuilder {
        crate::CoordinatorBuilder::new()
    }

    /// Authenticates the local participant.
    ///
    /// Resolves once the provider reports a terminal outcome. Calls made
    /// while an attempt is in flight share its outcome.
    pub async fn authenticate(&self) -> Result<Identity, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Authenticate { reply }, rx).await?
    }

    /// Starts open matchmaking for `min..=max` participants and waits
    /// for the flow to end.
    pub async fn start_matchmaking(
        &self,
        min: usize,
        max: usize,
    ) -> Result<FlowResult, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::StartMatchmaking { min, max, reply }, rx)
            .await?
    }

    /// Joins through an accepted invite and waits for the flow to end.
    pub async fn accept_invite(
        &self,
        invite: Invite,
    ) -> Result<FlowResult, HuddleError> {
        self.route(PendingAction::Invite(invite)).await
    }

    /// Starts matchmaking targeting exactly `recipients` (with the
    /// configured invite bounds) and waits for the flow to end.
    pub async fn accept_match_request(
        &self,
        recipients: Vec<Identity>,
    ) -> Result<FlowResult, HuddleError> {
        self.route(PendingAction::MatchRequest(recipients)).await
    }

    async fn route(
        &self,
        action: PendingAction,
    ) -> Result<FlowResult, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Route { action, reply }, rx).await?
    }

    /// Processes the pending invite or match request, if any.
    ///
    /// Returns `Ok(None)` without side effects when nothing is pending.
    /// If a precondition refuses the join, the action stays pending.
    pub async fn process_pending_invite(
        &self,
    ) -> Result<Option<FlowResult>, HuddleError> {
        let (reply, rx) = oneshot::channel();
        let started = self.request(Command::ProcessPending { reply }, rx).await??;
        match started {
            Some(waiter) => {
                let result =
                    waiter.await.map_err(|_| HuddleError::Unavailable)??;
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    /// Cancels the presented flow. Returns `false` if there was none.
    pub async fn cancel_flow(&self) -> Result<bool, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::CancelFlow { reply }, rx).await
    }

    /// Leaves the open session and disconnects its link.
    pub async fn leave_session(&self) -> Result<Session, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::LeaveSession { reply }, rx).await?
    }

    /// Sends a chat message to every participant.
    ///
    /// An open session outlives a later authentication failure; messages
    /// keep going out as the identity last authenticated.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), HuddleError> {
        let (reply, rx) = oneshot::channel();
        let text = text.into();
        self.request(Command::Send { text, reply }, rx).await?
    }

    /// Reports whether the app is in the foreground.
    pub async fn set_visibility(
        &self,
        visibility: AppVisibility,
    ) -> Result<(), HuddleError> {
        self.commands
            .send(Command::SetVisibility { visibility })
            .await
            .map_err(|_| HuddleError::Unavailable)
    }

    /// The pending invite or match request, if any.
    pub async fn pending(&self) -> Result<Option<PendingAction>, HuddleError> {
        Ok(self.snapshot().await?.pending)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Snapshot { reply }, rx).await
    }

    /// Closes the open session (if any), dismisses the presented flow
    /// (if any) and stops the coordinator.
    pub async fn shutdown(&self) -> Result<(), HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.request(Command::Shutdown { reply }, rx).await
    }

    /// Observable authentication state.
    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.auth_state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state.borrow().is_authenticated()
    }

    /// Observable rendered event log, one line per entry.
    pub fn messages(&self) -> watch::Receiver<Vec<String>> {
        self.log.lines()
    }

    /// Stream of individual log changes.
    pub fn subscribe_log(&self) -> broadcast::Receiver<LogUpdate> {
        self.log.subscribe()
    }

    async fn request<T>(
        &self,
        command: Command,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, HuddleError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HuddleError::Unavailable)?;
        rx.await.map_err(|_| HuddleError::Unavailable)
    }
}

// =========================================================================
// Actor
// =========================================================================

/// Everything the coordinator task needs to start.
pub(crate) struct Parts<I, P, C> {
    pub(crate) config: CoordinatorConfig,
    pub(crate) visibility: AppVisibility,
    pub(crate) authenticate_on_start: bool,
    pub(crate) provider: I,
    pub(crate) presenter: P,
    pub(crate) codec: C,
}

/// Spawns the coordinator task and returns its handle.
pub(crate) fn spawn<I, P, C>(parts: Parts<I, P, C>) -> CoordinatorHandle
where
    I: IdentityProvider,
    P: Presenter,
    C: Codec,
{
    let (commands_tx, commands) = mpsc::channel(parts.config.command_buffer.max(1));
    let (auth_callbacks, listener, provider_rx) = provider_channel();
    let (flow_tx, flow_rx) = mpsc::unbounded_channel();
    let (auth_state, auth_state_rx) = watch::channel(AuthState::Unauthenticated);

    let log = EventLog::new(parts.config.log_buffer);
    let handle = CoordinatorHandle {
        commands: commands_tx,
        auth_state: auth_state_rx,
        log: log.observers(),
    };

    let mut coordinator = Coordinator {
        identity: IdentityClient::new(),
        arbiter: InviteArbitrator::new(parts.config.pending_policy),
        sessions: SessionCoordinator::new(parts.config.close_when_all_disconnected),
        channel: MessageChannel::new(parts.codec, parts.config.channel),
        log,
        visibility: parts.visibility,
        provider: parts.provider,
        presenter: Arc::new(parts.presenter),
        auth_callbacks,
        listener,
        auth_state,
        auth_waiters: Vec::new(),
        speaker: None,
        flow_task: None,
        flow_reply: None,
        flow_tx,
        link_events: None,
        config: parts.config,
    };
    let authenticate_on_start = parts.authenticate_on_start;

    tokio::spawn(async move {
        if authenticate_on_start {
            coordinator.authenticate(None);
        }
        coordinator.run(commands, provider_rx, flow_rx).await;
    });

    handle
}

struct Coordinator<I, P, C: Codec> {
    config: CoordinatorConfig,
    identity: IdentityClient,
    arbiter: InviteArbitrator,
    sessions: SessionCoordinator,
    channel: MessageChannel<C>,
    log: EventLog,
    visibility: AppVisibility,

    provider: I,
    presenter: Arc<P>,
    auth_callbacks: AuthCallbacks,
    listener: InviteListener,

    auth_state: watch::Sender<AuthState>,
    auth_waiters: Vec<AuthReply>,
    /// Last identity the provider authenticated; chat is sent as it.
    speaker: Option<Identity>,

    flow_task: Option<AbortHandle>,
    flow_reply: Option<FlowReply>,
    flow_tx: mpsc::UnboundedSender<(FlowId, FlowOutcome)>,

    /// Inbound events of the open session's link.
    link_events: Option<mpsc::UnboundedReceiver<LinkEvent>>,
}

impl<I, P, C> Coordinator<I, P, C>
where
    I: IdentityProvider,
    P: Presenter,
    C: Codec,
{
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut provider: ProviderInputs,
        mut flow_rx: mpsc::UnboundedReceiver<(FlowId, FlowOutcome)>,
    ) {
        tracing::info!("coordinator started");

        loop {
            // Provider input is drained before commands, so a caller that
            // has seen a callback delivered also sees its effect.
            tokio::select! {
                biased;

                Some(input) = provider.recv() => match input {
                    ProviderInput::Auth(callback) => self.on_auth_callback(callback),
                    ProviderInput::Push(event) => self.on_push(event),
                },
                Some((flow, outcome)) = flow_rx.recv() => self.on_flow_outcome(flow, outcome),
                event = next_link_event(&mut self.link_events) => match event {
                    Some(event) => self.on_link_event(event),
                    None => self.on_link_closed(),
                },
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.on_command(command),
                    None => {
                        tracing::debug!("all handles dropped");
                        self.teardown();
                        break;
                    }
                },
            }
        }

        tracing::info!("coordinator stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Authenticate { reply } => self.authenticate(Some(reply)),
            Command::StartMatchmaking { min, max, reply } => {
                self.start_matchmaking(min, max, reply);
            }
            Command::Route { action, reply } => match self.route(&action) {
                Ok(_) => self.flow_reply = Some(reply),
                Err(e) => {
                    tracing::warn!(error = %e, "join refused");
                    let _ = reply.send(Err(e.into()));
                }
            },
            Command::ProcessPending { reply } => {
                let _ = reply.send(self.process_pending());
            }
            Command::CancelFlow { reply } => {
                let _ = reply.send(self.cancel_flow());
            }
            Command::LeaveSession { reply } => {
                let result = self.close_session(CloseReason::Left);
                let _ = reply.send(result.map_err(HuddleError::from));
            }
            Command::Send { text, reply } => {
                let _ = reply.send(self.send_text(&text).map_err(HuddleError::from));
            }
            Command::SetVisibility { visibility } => {
                tracing::debug!(?visibility, "visibility changed");
                self.visibility = visibility;
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { .. } => {}
        }
    }

    // -- Authentication ---------------------------------------------------

    fn authenticate(&mut self, reply: Option<AuthReply>) {
        self.auth_waiters.extend(reply);
        if !self.identity.begin() {
            tracing::debug!("authentication already in flight");
            return;
        }
        self.arbiter.clear();
        self.provider.authenticate(self.auth_callbacks.clone());
        self.publish_auth();
    }

    fn on_auth_callback(&mut self, callback: AuthCallback) {
        match callback {
            AuthCallback::PresentLogin(prompt) => {
                tracing::info!(title = %prompt.title, "provider needs login UI");
                self.presenter.present_login(prompt);
                return;
            }
            AuthCallback::Authenticated(identity) => {
                let local = self.identity.on_authenticated(identity).clone();
                self.speaker = Some(local.clone());
                self.arbiter.clear();
                self.provider.register_listener(self.listener.clone());
                for waiter in self.auth_waiters.drain(..) {
                    let _ = waiter.send(Ok(local.clone()));
                }
            }
            AuthCallback::Failed(reason) => {
                let err = self.identity.on_failed(&reason);
                for waiter in self.auth_waiters.drain(..) {
                    let _ = waiter.send(Err(err.clone().into()));
                }
            }
        }
        self.publish_auth();
    }

    fn publish_auth(&self) {
        self.auth_state.send_replace(self.identity.state());
    }

    // -- Pushed invites ---------------------------------------------------

    fn on_push(&mut self, event: PushEvent) {
        let action = PendingAction::from(event);
        if let Arbitration::ProcessNow(action) =
            self.arbiter.arbitrate(action, self.visibility)
        {
            if let Err(e) = self.route(&action) {
                tracing::warn!(error = %e, "could not join, keeping it pending");
                self.arbiter.defer(action);
            }
        }
    }

    fn process_pending(&mut self) -> Result<Option<FlowWaiter>, HuddleError> {
        if self.arbiter.pending().is_none() {
            tracing::debug!("nothing pending");
            return Ok(None);
        }
        self.sessions.check_can_start(self.identity.state())?;
        let Some(action) = self.arbiter.take() else {
            return Ok(None);
        };

        match self.route(&action) {
            Ok(_) => {
                let (reply, waiter) = oneshot::channel();
                self.flow_reply = Some(reply);
                Ok(Some(waiter))
            }
            Err(e) => {
                self.arbiter.defer(action);
                Err(e.into())
            }
        }
    }

    // -- Flows ------------------------------------------------------------

    fn start_matchmaking(&mut self, min: usize, max: usize, reply: FlowReply) {
        let started = MatchRequest::open(min, max).and_then(|request| {
            let flow = self
                .sessions
                .start_matchmaking(self.identity.state(), &request)?;
            Ok((flow, request))
        });

        match started {
            Ok((flow, request)) => {
                let presenter = Arc::clone(&self.presenter);
                self.present(flow, async move {
                    presenter.present_matchmaking(request).await
                });
                self.flow_reply = Some(reply);
            }
            Err(e) => {
                tracing::warn!(error = %e, "matchmaking refused");
                let _ = reply.send(Err(e.into()));
            }
        }
    }

    /// Starts the join path matching `action`, without a waiter.
    fn route(&mut self, action: &PendingAction) -> Result<ActiveFlow, SessionError> {
        let auth = self.identity.state();
        let presenter = Arc::clone(&self.presenter);
        let flow = match action {
            PendingAction::Invite(invite) => {
                let flow = self.sessions.accept_invite(auth, invite)?;
                let invite = invite.clone();
                self.present(flow, async move {
                    presenter.present_invite(invite).await
                });
                flow
            }
            PendingAction::MatchRequest(recipients) => {
                let (flow, request) = self.sessions.accept_match_request(
                    auth,
                    recipients.clone(),
                    self.config.invite_bounds,
                )?;
                self.present(flow, async move {
                    presenter.present_matchmaking(request).await
                });
                flow
            }
        };
        Ok(flow)
    }

    /// Runs a presentation on its own task; the outcome comes back through
    /// `flow_tx`.
    fn present<F>(&mut self, flow: ActiveFlow, presentation: F)
    where
        F: Future<Output = FlowOutcome> + Send + 'static,
    {
        let outcomes = self.flow_tx.clone();
        let task = tokio::spawn(async move {
            let outcome = presentation.await;
            let _ = outcomes.send((flow.id, outcome));
        });
        self.flow_task = Some(task.abort_handle());
        self.flow_reply = None;
    }

    fn on_flow_outcome(&mut self, flow: FlowId, outcome: FlowOutcome) {
        match outcome {
            FlowOutcome::Found(found) => self.install(flow, found),
            FlowOutcome::Cancelled => {
                if self.sessions.resolve_cancelled(flow).is_ok() {
                    self.finish_flow(Ok(FlowResult::Cancelled));
                }
            }
            FlowOutcome::Failed(reason) => {
                if self.sessions.resolve_failed(flow, &reason).is_ok() {
                    self.finish_flow(Err(HuddleError::Provider(reason)));
                }
            }
        }
    }

    /// Installs a found peer set as the open session.
    fn install(&mut self, flow: FlowId, found: PeerMatch) {
        let PeerMatch {
            participants,
            link,
            events,
        } = found;

        let session = match self.sessions.resolve_found(flow, participants) {
            Ok(session) => session.clone(),
            Err(e) => {
                tracing::debug!(error = %e, link = %link.id(), "stale match, disconnecting");
                link.disconnect();
                return;
            }
        };

        self.log.clear();
        self.channel.attach(link);
        self.link_events = Some(events);

        if let Some(greeting) = self.config.greeting.clone() {
            if let Err(e) = self.send_text(&greeting) {
                tracing::warn!(error = %e, "greeting not delivered");
            }
        }
        self.finish_flow(Ok(FlowResult::Joined(session)));
    }

    fn finish_flow(&mut self, result: Result<FlowResult, HuddleError>) {
        self.flow_task = None;
        if let Some(reply) = self.flow_reply.take() {
            let _ = reply.send(result);
        }
    }

    fn cancel_flow(&mut self) -> bool {
        if self.sessions.cancel_flow().is_none() {
            return false;
        }
        if let Some(task) = self.flow_task.take() {
            task.abort();
        }
        self.finish_flow(Ok(FlowResult::Cancelled));
        true
    }

    // -- Open session -----------------------------------------------------

    fn send_text(&mut self, text: &str) -> Result<(), SessionError> {
        if self.sessions.open_session().is_none() {
            return Err(SessionError::NoActiveSession);
        }
        let Some(local) = self.speaker.as_ref() else {
            return Err(SessionError::NoActiveSession);
        };
        self.channel
            .send(self.sessions.open_session(), local, text, &mut self.log)
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Data { from, payload } => {
                self.channel.receive(
                    self.sessions.open_session(),
                    from,
                    &payload,
                    &mut self.log,
                );
            }
            LinkEvent::ConnectionChanged { peer, state } => {
                self.on_connection_changed(peer, state);
            }
        }
    }

    fn on_connection_changed(&mut self, peer: PeerId, state: ConnectionState) {
        match self.sessions.connection_changed(peer, state) {
            Ok(update) => {
                self.log.append(update.event);
                if update.closed.is_some() {
                    self.release_link();
                }
            }
            Err(e) => tracing::debug!(%peer, error = %e, "connection change ignored"),
        }
    }

    fn on_link_closed(&mut self) {
        self.link_events = None;
        if let Err(e) = self.close_session(CloseReason::LinkClosed) {
            tracing::debug!(error = %e, "link ended without open session");
        }
    }

    fn close_session(&mut self, reason: CloseReason) -> Result<Session, SessionError> {
        let session = self.sessions.close(reason)?;
        self.release_link();
        Ok(session)
    }

    fn release_link(&mut self) {
        if let Some(link) = self.channel.detach() {
            link.disconnect();
        }
        self.link_events = None;
    }

    fn teardown(&mut self) {
        self.cancel_flow();
        let _ = self.close_session(CloseReason::Teardown);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.sessions.phase(),
            auth: self.identity.state(),
            local: self.identity.local().cloned(),
            session: self.sessions.open_session().cloned(),
            active_flow: self.sessions.active_flow(),
            pending: self.arbiter.pending().cloned(),
            visibility: self.visibility,
        }
    }
}

/// Next event of the open session's link. Never resolves without one.
async fn next_link_event(
    events: &mut Option<mpsc::UnboundedReceiver<LinkEvent>>,
) -> Option<LinkEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
