use std::sync::{Arc, Mutex, PoisonError};

use huddle::prelude::*;
use huddle::transport::loopback::{self, LoopbackRemote};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Provider: everyone is Ana, instantly
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct DemoProvider {
    listener: Arc<Mutex<Option<InviteListener>>>,
}

impl DemoProvider {
    fn listener(&self) -> Option<InviteListener> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl IdentityProvider for DemoProvider {
    fn authenticate(&self, callbacks: AuthCallbacks) {
        callbacks.succeeded(Identity::local(1, "Ana"));
    }

    fn register_listener(&self, listener: InviteListener) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }
}

// ---------------------------------------------------------------------------
// Presenter: every flow finds Bruno and Carla over a loopback link
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct LoopbackPresenter {
    remote: Arc<Mutex<Option<LoopbackRemote>>>,
}

impl LoopbackPresenter {
    fn remote(&self) -> Option<LoopbackRemote> {
        self.remote.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn found(&self) -> FlowOutcome {
        let (found, remote) = loopback::pair(vec![
            Identity::remote(2, "Bruno"),
            Identity::remote(3, "Carla"),
        ]);
        // Bruno repeats whatever is said.
        remote.echo_from(Some(PeerId(2)));
        *self.remote.lock().unwrap_or_else(PoisonError::into_inner) = Some(remote);
        FlowOutcome::Found(found)
    }
}

impl Presenter for LoopbackPresenter {
    fn present_matchmaking(
        &self,
        request: MatchRequest,
    ) -> impl Future<Output = FlowOutcome> + Send {
        tracing::info!(min = request.bounds.min, max = request.bounds.max, "matchmaking shown");
        let outcome = self.found();
        async move { outcome }
    }

    fn present_invite(&self, invite: Invite) -> impl Future<Output = FlowOutcome> + Send {
        tracing::info!(from = %invite.sender, "invite shown");
        let outcome = self.found();
        async move { outcome }
    }

    fn present_login(&self, prompt: LoginPrompt) {
        tracing::info!(title = %prompt.title, "login shown");
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// Reads an optional JSON config from `HUDDLE_CONFIG`.
fn load_config() -> Result<CoordinatorConfig, serde_json::Error> {
    match std::env::var("HUDDLE_CONFIG") {
        Ok(json) => serde_json::from_str(&json),
        Err(_) => Ok(CoordinatorConfig::default()),
    }
}

/// Runs one scripted session and returns the chat log as the user sees it.
async fn run(config: CoordinatorConfig) -> Result<Vec<String>, HuddleError> {
    let provider = DemoProvider::default();
    let presenter = LoopbackPresenter::default();
    let handle = CoordinatorBuilder::new()
        .config(config)
        .authenticate_on_start(true)
        .spawn(provider.clone(), presenter.clone());

    let me = handle.authenticate().await?;
    tracing::info!(name = %me, "signed in");

    if let FlowResult::Joined(session) = handle.start_matchmaking(2, 4).await? {
        tracing::info!(session_id = %session.id, "joined");
    }
    handle.send("Olá! 👋").await?;

    if let Some(remote) = presenter.remote() {
        remote.deliver(PeerId(3), "hi Ana");
        remote.set_connection(PeerId(3), ConnectionState::Disconnected);
    }

    // An invite accepted while the app is in use waits for the user.
    if let Some(listener) = provider.listener() {
        let invite = Invite {
            id: InviteId(1),
            sender: Identity::remote(4, "Dani"),
        };
        listener.invite_accepted(invite).await?;
    }
    let snapshot = handle.snapshot().await?;
    tracing::info!(pending = ?snapshot.pending, "before leaving");
    let mut lines = handle.messages().borrow().clone();

    handle.leave_session().await?;
    if let Some(FlowResult::Joined(session)) = handle.process_pending_invite().await? {
        tracing::info!(session_id = %session.id, "joined through invite");
    }
    // Let Bruno's echo of the greeting land.
    handle.snapshot().await?;
    lines.extend(handle.messages().borrow().iter().cloned());

    handle.shutdown().await?;
    Ok(lines)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    for line in run(load_config()?).await? {
        println!("{line}");
    }
    Ok(())
}
