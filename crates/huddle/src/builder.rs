//! `CoordinatorBuilder`: configures and spawns a coordinator.
//!
//! This is the entry point for embedding Huddle. It ties together all the
//! layers: identity provider → session core → transport, with the
//! application's presenter on top.

use huddle_identity::IdentityProvider;
use huddle_protocol::{Codec, Utf8Codec};
use huddle_session::{AppVisibility, CoordinatorConfig, Presenter};

use crate::coordinator::{self, CoordinatorHandle, Parts};

/// Builder for configuring and starting a coordinator.
///
/// # Example
///
/// ```rust,ignore
/// use huddle::prelude::*;
///
/// let handle = CoordinatorHandle::builder()
///     .initial_visibility(AppVisibility::Background)
///     .authenticate_on_start(true)
///     .spawn(my_provider, my_presenter);
/// handle.process_pending_invite().await?;
/// ```
#[derive(Debug, Clone)]
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    visibility: AppVisibility,
    authenticate_on_start: bool,
}

impl CoordinatorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            visibility: AppVisibility::Foreground,
            authenticate_on_start: false,
        }
    }

    /// Sets the coordinator configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the visibility the app starts with. An app launched from an
    /// OS notification starts in `Background`, so the invite that launched
    /// it is joined right away.
    pub fn initial_visibility(mut self, visibility: AppVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Starts authenticating as soon as the coordinator is spawned.
    pub fn authenticate_on_start(mut self, enabled: bool) -> Self {
        self.authenticate_on_start = enabled;
        self
    }

    /// Spawns the coordinator with the default `Utf8Codec`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<I, P>(self, provider: I, presenter: P) -> CoordinatorHandle
    where
        I: IdentityProvider,
        P: Presenter,
    {
        self.spawn_with_codec(provider, presenter, Utf8Codec)
    }

    /// Spawns the coordinator with a custom payload codec.
    pub fn spawn_with_codec<I, P, C>(
        self,
        provider: I,
        presenter: P,
        codec: C,
    ) -> CoordinatorHandle
    where
        I: IdentityProvider,
        P: Presenter,
        C: Codec,
    {
        tracing::debug!(
            visibility = ?self.visibility,
            authenticate_on_start = self.authenticate_on_start,
            "spawning coordinator"
        );
        coordinator::spawn(Parts {
            config: self.config,
            visibility: self.visibility,
            authenticate_on_start: self.authenticate_on_start,
            provider,
            presenter,
            codec,
        })
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
