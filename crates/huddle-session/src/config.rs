//! Coordinator configuration and the session lifecycle state machine.

use huddle_protocol::Channel;
use serde::{Deserialize, Serialize};

use crate::{PendingPolicy, SessionError};

/// Greeting sent automatically whenever a session opens.
const DEFAULT_GREETING: &str = "Hello, everyone!";

// ---------------------------------------------------------------------------
// MatchBounds
// ---------------------------------------------------------------------------

/// Participant count bounds for a match request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchBounds {
    /// Minimum participants, local one included. At least 2.
    pub min: usize,
    /// Maximum participants. At least `min`.
    pub max: usize,
}

impl MatchBounds {
    /// Creates validated bounds.
    pub fn new(min: usize, max: usize) -> Result<Self, SessionError> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Checks `min >= 2` and `max >= min`.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.min < 2 {
            return Err(SessionError::InvalidRequest(format!(
                "min participants must be at least 2, got {}",
                self.min
            )));
        }
        if self.max < self.min {
            return Err(SessionError::InvalidRequest(format!(
                "max participants ({}) is below min ({})",
                self.max, self.min
            )));
        }
        Ok(())
    }
}

impl Default for MatchBounds {
    fn default() -> Self {
        Self { min: 2, max: 4 }
    }
}

// ---------------------------------------------------------------------------
// CoordinatorConfig
// ---------------------------------------------------------------------------

/// Configuration for a coordinator instance.
///
/// Every field has a default, and `#[serde(default)]` lets an embedding app
/// load a partial config from any serde format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Chat line sent when a session opens. `None` sends nothing.
    pub greeting: Option<String>,

    /// Bounds used when accepting a pushed match request.
    pub invite_bounds: MatchBounds,

    /// What happens when an invite arrives while one is already pending.
    pub pending_policy: PendingPolicy,

    /// Close the session when every participant reports `Disconnected`.
    /// Off by default: the provider decides when a session ends.
    pub close_when_all_disconnected: bool,

    /// Delivery guarantee for chat payloads.
    pub channel: Channel,

    /// Capacity of the coordinator's command channel.
    pub command_buffer: usize,

    /// How many log updates a slow observer may lag behind before it
    /// starts missing them.
    pub log_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            greeting: Some(DEFAULT_GREETING.to_string()),
            invite_bounds: MatchBounds::default(),
            pending_policy: PendingPolicy::default(),
            close_when_all_disconnected: false,
            channel: Channel::default(),
            command_buffer: 64,
            log_buffer: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The coordinator's lifecycle state.
///
/// ```text
/// NoSession ──→ Searching ──→ Open ──→ Closed
///     ↑             │                    │
///     └─(cancel/error)                   └──→ Searching ...
/// ```
///
/// - **NoSession**: nothing open, nothing presented.
/// - **Searching**: a matchmaking or invite flow is being presented.
/// - **Open**: exactly one session is open.
/// - **Closed**: the last session ended; a new flow may start.
///
/// `Open → Searching` is never valid: the open session must be closed
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    NoSession,
    Searching,
    Open,
    Closed,
}

impl SessionPhase {
    /// Returns `true` if a new flow may start from here.
    pub fn can_start_flow(&self) -> bool {
        matches!(self, Self::NoSession | Self::Closed)
    }

    /// Returns `true` while a session is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if moving to `target` is a valid transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::NoSession | Self::Closed, Self::Searching)
                | (Self::Searching, Self::Open | Self::NoSession)
                | (Self::Open, Self::Closed)
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => write!(f, "NoSession"),
            Self::Searching => write!(f, "Searching"),
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
