//! Integration tests for the coordinator actor: authentication, flows,
//! invite arbitration and chat, over a scripted provider and presenter
//! and the loopback link.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use huddle::identity::PushEvent;
use huddle::prelude::*;
use huddle::transport::loopback::{self, LoopbackRemote};
use tokio::sync::{mpsc, oneshot};

// =========================================================================
// Test doubles
// =========================================================================

#[derive(Default)]
struct ProviderState {
    /// Reported as soon as `authenticate` is called, when set.
    auto: Option<Result<Identity, String>>,
    callbacks: Option<AuthCallbacks>,
    listener: Option<InviteListener>,
    auth_calls: usize,
    register_calls: usize,
}

/// Identity provider whose behavior each test scripts.
#[derive(Clone, Default)]
struct MockProvider {
    inner: Arc<Mutex<ProviderState>>,
}

impl MockProvider {
    fn succeeding() -> Self {
        let provider = Self::default();
        provider.set_auto(Some(Ok(ana())));
        provider
    }

    fn set_auto(&self, auto: Option<Result<Identity, String>>) {
        self.inner.lock().unwrap().auto = auto;
    }

    fn callbacks(&self) -> AuthCallbacks {
        self.inner.lock().unwrap().callbacks.clone().expect("authenticate was called")
    }

    fn listener(&self) -> InviteListener {
        self.inner.lock().unwrap().listener.clone().expect("listener registered")
    }

    fn auth_calls(&self) -> usize {
        self.inner.lock().unwrap().auth_calls
    }

    fn register_calls(&self) -> usize {
        self.inner.lock().unwrap().register_calls
    }
}

impl IdentityProvider for MockProvider {
    fn authenticate(&self, callbacks: AuthCallbacks) {
        let mut state = self.inner.lock().unwrap();
        state.auth_calls += 1;
        match state.auto.clone() {
            Some(Ok(identity)) => {
                callbacks.succeeded(identity);
            }
            Some(Err(reason)) => {
                callbacks.failed(reason);
            }
            None => {}
        }
        state.callbacks = Some(callbacks);
    }

    fn register_listener(&self, listener: InviteListener) {
        let mut state = self.inner.lock().unwrap();
        state.register_calls += 1;
        state.listener = Some(listener);
    }
}

#[derive(Debug)]
enum Presented {
    Matchmaking(MatchRequest),
    Invite(Invite),
}

/// One presented flow, waiting for the test to decide its outcome.
struct Call {
    presented: Presented,
    respond: oneshot::Sender<FlowOutcome>,
}

impl Call {
    fn found(self, participants: Vec<Identity>) -> LoopbackRemote {
        let (found, remote) = loopback::pair(participants);
        let _ = self.respond.send(FlowOutcome::Found(found));
        remote
    }

    fn resolve(self, outcome: FlowOutcome) {
        let _ = self.respond.send(outcome);
    }
}

/// Forwards every presentation to the test.
struct ScriptedPresenter {
    calls: mpsc::UnboundedSender<Call>,
    logins: mpsc::UnboundedSender<LoginPrompt>,
}

impl ScriptedPresenter {
    fn present(&self, presented: Presented) -> impl Future<Output = FlowOutcome> + Send {
        let (respond, outcome) = oneshot::channel();
        let _ = self.calls.send(Call { presented, respond });
        async move { outcome.await.unwrap_or(FlowOutcome::Cancelled) }
    }
}

impl Presenter for ScriptedPresenter {
    fn present_matchmaking(
        &self,
        request: MatchRequest,
    ) -> impl Future<Output = FlowOutcome> + Send {
        self.present(Presented::Matchmaking(request))
    }

    fn present_invite(&self, invite: Invite) -> impl Future<Output = FlowOutcome> + Send {
        self.present(Presented::Invite(invite))
    }

    fn present_login(&self, prompt: LoginPrompt) {
        let _ = self.logins.send(prompt);
    }
}

// =========================================================================
// Helpers
// =========================================================================

const WAIT: Duration = Duration::from_secs(2);

fn ana() -> Identity {
    Identity::local(1, "Ana")
}

fn bruno() -> Identity {
    Identity::remote(2, "Bruno")
}

fn carla() -> Identity {
    Identity::remote(3, "Carla")
}

fn invite() -> Invite {
    Invite {
        id: InviteId(7),
        sender: bruno(),
    }
}

struct Harness {
    handle: CoordinatorHandle,
    provider: MockProvider,
    calls: mpsc::UnboundedReceiver<Call>,
    logins: mpsc::UnboundedReceiver<LoginPrompt>,
}

impl Harness {
    fn spawn(builder: CoordinatorBuilder, provider: MockProvider) -> Self {
        let (calls_tx, calls) = mpsc::unbounded_channel();
        let (logins_tx, logins) = mpsc::unbounded_channel();
        let presenter = ScriptedPresenter {
            calls: calls_tx,
            logins: logins_tx,
        };
        let handle = builder.spawn(provider.clone(), presenter);
        Self {
            handle,
            provider,
            calls,
            logins,
        }
    }

    /// Spawns with defaults and authenticates as Ana.
    async fn authenticated(builder: CoordinatorBuilder) -> Self {
        let harness = Self::spawn(builder, MockProvider::succeeding());
        harness.handle.authenticate().await.expect("auth should succeed");
        harness
    }

    async fn next_call(&mut self) -> Call {
        tokio::time::timeout(WAIT, self.calls.recv())
            .await
            .expect("a flow should be presented")
            .expect("presenter alive")
    }

    /// Starts matchmaking in the background; the flow is presented once
    /// this returns.
    async fn begin_matchmaking(
        &mut self,
    ) -> (Call, tokio::task::JoinHandle<Result<FlowResult, HuddleError>>) {
        let handle = self.handle.clone();
        let task = tokio::spawn(async move { handle.start_matchmaking(2, 4).await });
        (self.next_call().await, task)
    }

    /// Opens a session with Bruno and Carla.
    async fn join(&mut self) -> (Session, LoopbackRemote) {
        let (call, task) = self.begin_matchmaking().await;
        let remote = call.found(vec![bruno(), carla()]);
        match task.await.unwrap().expect("matchmaking should succeed") {
            FlowResult::Joined(session) => (session, remote),
            other => panic!("expected Joined, got {other:?}"),
        }
    }

    /// Round-trips a command, so everything queued before it is applied.
    async fn settle(&self) -> Snapshot {
        self.handle.snapshot().await.expect("coordinator alive")
    }

    /// Polls snapshots until `done` holds. For outcomes that arrive
    /// through a presentation task rather than a command.
    async fn wait_until(&self, done: impl Fn(&Snapshot) -> bool) -> Snapshot {
        tokio::time::timeout(WAIT, async {
            loop {
                let snapshot = self.settle().await;
                if done(&snapshot) {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition should be reached")
    }

    fn lines(&self) -> Vec<String> {
        self.handle.messages().borrow().clone()
    }
}

// =========================================================================
// Authentication
// =========================================================================

#[tokio::test]
async fn test_authenticate_success_sets_state_and_registers_listener() {
    let harness = Harness::spawn(CoordinatorBuilder::new(), MockProvider::succeeding());
    assert!(!harness.handle.is_authenticated());

    let identity = harness.handle.authenticate().await.unwrap();

    assert_eq!(identity, ana());
    assert!(harness.handle.is_authenticated());
    assert_eq!(harness.provider.register_calls(), 1);
    let snapshot = harness.settle().await;
    assert_eq!(snapshot.auth, AuthState::Authenticated);
    assert_eq!(snapshot.local, Some(ana()));
}

#[tokio::test]
async fn test_authenticate_failure_surfaces_error_and_allows_retry() {
    let provider = MockProvider::default();
    provider.set_auto(Some(Err("no account".into())));
    let harness = Harness::spawn(CoordinatorBuilder::new(), provider.clone());

    let result = harness.handle.authenticate().await;

    assert!(matches!(result, Err(HuddleError::Identity(_))));
    assert!(!harness.handle.is_authenticated());
    assert_eq!(provider.register_calls(), 0);

    provider.set_auto(Some(Ok(ana())));
    assert!(harness.handle.authenticate().await.is_ok());
    assert_eq!(provider.auth_calls(), 2);
}

#[tokio::test]
async fn test_authenticate_concurrent_calls_share_outcome() {
    let harness = Harness::spawn(CoordinatorBuilder::new(), MockProvider::default());

    let (first, second, ()) = tokio::join!(
        harness.handle.authenticate(),
        harness.handle.authenticate(),
        async {
            // Both requests are queued ahead of this round trip.
            harness.settle().await;
            harness.provider.callbacks().succeeded(ana());
        },
    );

    assert_eq!(first.unwrap(), ana());
    assert_eq!(second.unwrap(), ana());
    assert_eq!(harness.provider.auth_calls(), 1);
}

#[tokio::test]
async fn test_authenticate_login_prompt_goes_to_presenter() {
    let mut harness = Harness::spawn(CoordinatorBuilder::new(), MockProvider::default());
    let pending = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.authenticate().await }
    });
    harness.wait_until(|s| s.auth == AuthState::Authenticating).await;

    let callbacks = harness.provider.callbacks();
    callbacks.present_login(LoginPrompt {
        id: 1,
        title: "Game Center".into(),
    });

    let prompt = tokio::time::timeout(WAIT, harness.logins.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(prompt.title, "Game Center");
    assert!(!pending.is_finished());

    callbacks.succeeded(ana());
    assert!(pending.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_authenticate_on_start_authenticates_without_a_call() {
    let harness = Harness::spawn(
        CoordinatorBuilder::new().authenticate_on_start(true),
        MockProvider::succeeding(),
    );

    let mut auth = harness.handle.auth_state();
    tokio::time::timeout(WAIT, auth.wait_for(|s| s.is_authenticated()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(harness.provider.auth_calls(), 1);
}

#[tokio::test]
async fn test_failure_after_success_drops_to_unauthenticated() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    harness.provider.callbacks().failed("token revoked");
    let snapshot = harness.settle().await;

    assert_eq!(snapshot.auth, AuthState::Unauthenticated);
    assert_eq!(snapshot.local, None);
    assert!(!harness.handle.is_authenticated());
}

// =========================================================================
// Matchmaking
// =========================================================================

#[tokio::test]
async fn test_start_matchmaking_unauthenticated_fails() {
    let harness = Harness::spawn(CoordinatorBuilder::new(), MockProvider::default());

    let result = harness.handle.start_matchmaking(2, 4).await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::NotAuthenticated))
    ));
    assert_eq!(harness.settle().await.phase, SessionPhase::NoSession);
}

#[tokio::test]
async fn test_start_matchmaking_invalid_bounds_fails() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    let result = harness.handle.start_matchmaking(1, 4).await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::InvalidRequest(_)))
    ));
}

#[tokio::test]
async fn test_start_matchmaking_presents_open_request() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    let (call, _task) = harness.begin_matchmaking().await;

    match &call.presented {
        Presented::Matchmaking(request) => {
            assert!(request.is_open_matchmaking());
            assert_eq!(request.bounds, MatchBounds { min: 2, max: 4 });
        }
        other => panic!("expected matchmaking, got {other:?}"),
    }
    assert_eq!(harness.settle().await.phase, SessionPhase::Searching);
}

#[tokio::test]
async fn test_start_matchmaking_found_opens_session_and_greets() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    let (session, remote) = harness.join().await;

    assert!(session.is_open());
    assert_eq!(session.participants, vec![bruno(), carla()]);
    assert_eq!(harness.lines(), vec!["You: Hello, everyone!"]);
    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, b"Hello, everyone!");
    assert_eq!(sent[0].to, vec![PeerId(2), PeerId(3)]);
    assert_eq!(harness.settle().await.phase, SessionPhase::Open);
}

#[tokio::test]
async fn test_new_session_clears_previous_history() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, remote) = harness.join().await;
    remote.deliver(PeerId(2), "from the old session");
    harness.settle().await;
    assert_eq!(harness.lines().len(), 2);
    harness.handle.leave_session().await.unwrap();

    let mut updates = harness.handle.subscribe_log();
    harness.join().await;

    assert_eq!(harness.lines(), vec!["You: Hello, everyone!"]);
    assert_eq!(updates.recv().await.unwrap(), LogUpdate::Cleared);
    assert!(matches!(updates.recv().await.unwrap(), LogUpdate::Appended(_)));
    assert!(updates.try_recv().is_err(), "exactly one greeting");
}

#[tokio::test]
async fn test_start_matchmaking_without_greeting_logs_nothing() {
    let config = CoordinatorConfig {
        greeting: None,
        ..CoordinatorConfig::default()
    };
    let mut harness = Harness::authenticated(CoordinatorBuilder::new().config(config)).await;

    let (_, remote) = harness.join().await;

    assert!(harness.lines().is_empty());
    assert!(remote.sent().is_empty());
}

#[tokio::test]
async fn test_start_matchmaking_while_open_fails_session_already_active() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (session, _remote) = harness.join().await;

    let result = harness.handle.start_matchmaking(2, 4).await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::SessionAlreadyActive(id))) if id == session.id
    ));
    assert_eq!(harness.settle().await.session, Some(session));
}

#[tokio::test]
async fn test_start_matchmaking_while_presenting_fails_flow_in_progress() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_call, _task) = harness.begin_matchmaking().await;

    let result = harness.handle.start_matchmaking(2, 4).await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::FlowAlreadyInProgress(_)))
    ));
}

#[tokio::test]
async fn test_start_matchmaking_cancelled_returns_to_no_session() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (call, task) = harness.begin_matchmaking().await;

    call.resolve(FlowOutcome::Cancelled);

    assert_eq!(task.await.unwrap().unwrap(), FlowResult::Cancelled);
    let snapshot = harness.settle().await;
    assert_eq!(snapshot.phase, SessionPhase::NoSession);
    assert!(snapshot.session.is_none());
}

#[tokio::test]
async fn test_start_matchmaking_provider_error_surfaces() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (call, task) = harness.begin_matchmaking().await;

    call.resolve(FlowOutcome::Failed("timed out".into()));

    let result = task.await.unwrap();
    assert!(matches!(result, Err(HuddleError::Provider(reason)) if reason == "timed out"));
    assert_eq!(harness.settle().await.phase, SessionPhase::NoSession);
}

#[tokio::test]
async fn test_cancel_flow_dismisses_presentation() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (call, task) = harness.begin_matchmaking().await;

    assert!(harness.handle.cancel_flow().await.unwrap());

    assert_eq!(task.await.unwrap().unwrap(), FlowResult::Cancelled);
    // The presentation task is aborted, so its outcome has nowhere to go.
    let mut respond = call.respond;
    tokio::time::timeout(WAIT, respond.closed())
        .await
        .expect("presentation should be dropped");
    assert_eq!(harness.settle().await.phase, SessionPhase::NoSession);
    assert!(!harness.handle.cancel_flow().await.unwrap());
}

// =========================================================================
// Invite arbitration
// =========================================================================

#[tokio::test]
async fn test_foreground_invite_is_queued_not_joined() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    let snapshot = harness.settle().await;

    assert_eq!(snapshot.phase, SessionPhase::NoSession);
    assert_eq!(snapshot.pending, Some(PendingAction::Invite(invite())));
    assert!(harness.calls.try_recv().is_err());
}

#[tokio::test]
async fn test_background_invite_is_joined_immediately() {
    let mut harness = Harness::authenticated(
        CoordinatorBuilder::new().initial_visibility(AppVisibility::Background),
    )
    .await;

    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    let call = harness.next_call().await;

    match &call.presented {
        Presented::Invite(presented) => assert_eq!(presented, &invite()),
        other => panic!("expected invite flow, got {other:?}"),
    }
    call.found(vec![bruno()]);
    let snapshot = harness.wait_until(|s| s.phase == SessionPhase::Open).await;
    assert!(snapshot.pending.is_none());
    assert_eq!(harness.lines(), vec!["You: Hello, everyone!"]);
}

#[tokio::test]
async fn test_visibility_change_affects_later_invites() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    harness.handle.set_visibility(AppVisibility::Background).await.unwrap();
    harness.settle().await;
    harness.provider.listener().match_requested(vec![carla()]).await.unwrap();

    let call = harness.next_call().await;
    assert!(matches!(call.presented, Presented::Matchmaking(_)));
}

#[tokio::test]
async fn test_background_invite_refused_is_kept_pending() {
    let mut harness = Harness::authenticated(
        CoordinatorBuilder::new().initial_visibility(AppVisibility::Background),
    )
    .await;
    let (_session, _remote) = harness.join().await;

    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    let snapshot = harness.settle().await;

    assert_eq!(snapshot.pending, Some(PendingAction::Invite(invite())));
    assert_eq!(snapshot.phase, SessionPhase::Open);
}

#[tokio::test]
async fn test_process_pending_without_pending_is_noop() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let before = harness.settle().await;

    let result = harness.handle.process_pending_invite().await.unwrap();

    assert!(result.is_none());
    assert_eq!(harness.settle().await, before);
}

#[tokio::test]
async fn test_process_pending_routes_invite_to_invite_flow() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    harness.settle().await;

    let task = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.process_pending_invite().await }
    });
    let call = harness.next_call().await;
    assert!(matches!(&call.presented, Presented::Invite(i) if *i == invite()));
    call.found(vec![bruno()]);

    let result = task.await.unwrap().unwrap();
    assert!(matches!(result, Some(FlowResult::Joined(_))));
    assert!(harness.settle().await.pending.is_none());
}

#[tokio::test]
async fn test_process_pending_routes_match_request_with_default_bounds() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    harness
        .provider
        .listener()
        .match_requested(vec![bruno(), carla()])
        .await
        .unwrap();
    harness.settle().await;

    let _task = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.process_pending_invite().await }
    });
    let call = harness.next_call().await;

    match &call.presented {
        Presented::Matchmaking(request) => {
            assert_eq!(request.recipients, vec![bruno(), carla()]);
            assert_eq!(request.bounds, MatchBounds { min: 2, max: 4 });
        }
        other => panic!("expected targeted matchmaking, got {other:?}"),
    }
}

#[tokio::test]
async fn test_process_pending_twice_second_call_sees_empty_slot() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    harness.settle().await;

    let first = tokio::spawn({
        let handle = harness.handle.clone();
        async move { handle.process_pending_invite().await }
    });
    let call = harness.next_call().await;

    let second = harness.handle.process_pending_invite().await.unwrap();

    assert!(second.is_none());
    call.resolve(FlowOutcome::Cancelled);
    assert_eq!(first.await.unwrap().unwrap(), Some(FlowResult::Cancelled));
}

#[tokio::test]
async fn test_process_pending_refused_keeps_action() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_session, _remote) = harness.join().await;
    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    harness.settle().await;

    let result = harness.handle.process_pending_invite().await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::SessionAlreadyActive(_)))
    ));
    assert_eq!(
        harness.handle.pending().await.unwrap(),
        Some(PendingAction::Invite(invite()))
    );
}

#[tokio::test]
async fn test_pending_replaced_by_newer_event_by_default() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let listener = harness.provider.listener();

    listener.invite_accepted(invite()).await.unwrap();
    listener.match_requested(vec![carla()]).await.unwrap();

    assert_eq!(
        harness.handle.pending().await.unwrap(),
        Some(PendingAction::MatchRequest(vec![carla()]))
    );
}

#[tokio::test]
async fn test_pending_kept_with_keep_existing_policy() {
    let config = CoordinatorConfig {
        pending_policy: PendingPolicy::KeepExisting,
        ..CoordinatorConfig::default()
    };
    let harness = Harness::authenticated(CoordinatorBuilder::new().config(config)).await;
    let listener = harness.provider.listener();

    listener.invite_accepted(invite()).await.unwrap();
    listener.match_requested(vec![carla()]).await.unwrap();

    assert_eq!(
        harness.handle.pending().await.unwrap(),
        Some(PendingAction::Invite(invite()))
    );
}

#[tokio::test]
async fn test_reauthentication_clears_pending_invite() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    assert!(harness.handle.pending().await.unwrap().is_some());

    harness.handle.authenticate().await.unwrap();

    assert!(harness.handle.pending().await.unwrap().is_none());
    assert_eq!(harness.provider.register_calls(), 2);
}

#[tokio::test]
async fn test_provider_reported_success_clears_pending_invite() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    harness.provider.listener().invite_accepted(invite()).await.unwrap();
    harness.settle().await;

    // The provider re-reports success on its own.
    harness.provider.callbacks().succeeded(ana());

    assert!(harness.handle.pending().await.unwrap().is_none());
}

#[tokio::test]
async fn test_invite_pushed_before_reported_success_is_discarded() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    harness
        .provider
        .listener()
        .try_push(PushEvent::InviteAccepted(invite()))
        .unwrap();
    harness.provider.callbacks().succeeded(ana());

    assert!(harness.handle.pending().await.unwrap().is_none());
}

#[tokio::test]
async fn test_invite_pushed_after_reported_success_is_kept() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    harness.provider.callbacks().succeeded(ana());
    harness
        .provider
        .listener()
        .try_push(PushEvent::InviteAccepted(invite()))
        .unwrap();

    assert_eq!(
        harness.handle.pending().await.unwrap(),
        Some(PendingAction::Invite(invite()))
    );
}

// =========================================================================
// Chat
// =========================================================================

#[tokio::test]
async fn test_send_without_session_fails_and_logs_nothing() {
    let harness = Harness::authenticated(CoordinatorBuilder::new()).await;

    let result = harness.handle.send("hi").await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::NoActiveSession))
    ));
    assert!(harness.lines().is_empty());
}

#[tokio::test]
async fn test_send_round_trip_preserves_utf8() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, remote) = harness.join().await;
    remote.echo_from(Some(PeerId(2)));
    let text = "Olá, galera! 👋 日本語";

    harness.handle.send(text).await.unwrap();
    harness.settle().await;

    assert_eq!(
        harness.lines(),
        vec![
            "You: Hello, everyone!".to_string(),
            format!("You: {text}"),
            format!("Bruno: {text}"),
        ]
    );
}

#[tokio::test]
async fn test_send_after_auth_lost_keeps_last_identity() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, _remote) = harness.join().await;
    harness.provider.callbacks().failed("token revoked");

    let result = harness.handle.send("still here").await;

    assert!(result.is_ok());
    assert!(!harness.handle.is_authenticated());
    assert_eq!(harness.settle().await.phase, SessionPhase::Open);
    assert_eq!(harness.lines().last().map(String::as_str), Some("You: still here"));
}

#[tokio::test]
async fn test_send_delivery_failure_surfaces_but_still_logs() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, remote) = harness.join().await;
    remote.set_failing(true);

    let result = harness.handle.send("anyone?").await;

    assert!(matches!(
        result,
        Err(HuddleError::Session(SessionError::DeliveryFailure(_)))
    ));
    assert_eq!(harness.lines().last().map(String::as_str), Some("You: anyone?"));
}

#[tokio::test]
async fn test_malformed_payload_produces_no_entry() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, remote) = harness.join().await;

    remote.deliver(PeerId(2), vec![0xff, 0xfe, 0xfd]);
    remote.deliver(PeerId(99), "not in the session");
    remote.deliver(PeerId(3), "ok");
    harness.settle().await;

    assert_eq!(harness.lines(), vec!["You: Hello, everyone!", "Carla: ok"]);
}

#[tokio::test]
async fn test_connection_changes_are_logged_without_closing() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (session, remote) = harness.join().await;

    remote.set_connection(PeerId(2), ConnectionState::Disconnected);
    remote.set_connection(PeerId(3), ConnectionState::Disconnected);
    remote.set_connection(PeerId(3), ConnectionState::Unknown);
    let snapshot = harness.settle().await;

    assert_eq!(
        harness.lines(),
        vec![
            "You: Hello, everyone!",
            "Bruno disconnected",
            "Carla disconnected",
            "Carla is in an unknown state",
        ]
    );
    assert_eq!(snapshot.session.map(|s| s.participants), Some(session.participants));
}

#[tokio::test]
async fn test_all_disconnected_closes_when_configured() {
    let config = CoordinatorConfig {
        close_when_all_disconnected: true,
        ..CoordinatorConfig::default()
    };
    let mut harness = Harness::authenticated(CoordinatorBuilder::new().config(config)).await;
    let (_, remote) = harness.join().await;

    remote.set_connection(PeerId(2), ConnectionState::Disconnected);
    remote.set_connection(PeerId(3), ConnectionState::Disconnected);
    let snapshot = harness.settle().await;

    assert_eq!(snapshot.phase, SessionPhase::Closed);
    assert!(snapshot.session.is_none());
    assert!(remote.is_closed());
}

// =========================================================================
// Closing
// =========================================================================

#[tokio::test]
async fn test_leave_session_disconnects_link() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (session, remote) = harness.join().await;

    let closed = harness.handle.leave_session().await.unwrap();

    assert_eq!(closed.id, session.id);
    assert!(!closed.is_open());
    assert!(remote.is_closed());
    assert!(matches!(
        harness.handle.send("still there?").await,
        Err(HuddleError::Session(SessionError::NoActiveSession))
    ));
    assert!(matches!(
        harness.handle.leave_session().await,
        Err(HuddleError::Session(SessionError::NoActiveSession))
    ));
}

#[tokio::test]
async fn test_link_closed_by_provider_closes_session() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, remote) = harness.join().await;

    remote.close();
    let snapshot = harness.settle().await;

    assert_eq!(snapshot.phase, SessionPhase::Closed);
    // A new flow may start right away.
    let (call, _task) = harness.begin_matchmaking().await;
    assert!(matches!(call.presented, Presented::Matchmaking(_)));
}

#[tokio::test]
async fn test_shutdown_closes_session_and_stops() {
    let mut harness = Harness::authenticated(CoordinatorBuilder::new()).await;
    let (_, remote) = harness.join().await;

    harness.handle.shutdown().await.unwrap();

    assert!(remote.is_closed());
    assert!(matches!(
        harness.handle.snapshot().await,
        Err(HuddleError::Unavailable)
    ));
}

#[tokio::test]
async fn test_config_loaded_from_json() {
    let config: CoordinatorConfig =
        serde_json::from_str(r#"{ "greeting": "oi!", "channel": "ReliableUnordered" }"#)
            .unwrap();
    let mut harness = Harness::authenticated(CoordinatorBuilder::new().config(config)).await;

    let (_, remote) = harness.join().await;

    assert_eq!(harness.lines(), vec!["You: oi!"]);
    assert_eq!(remote.sent()[0].channel, Channel::ReliableUnordered);
}
