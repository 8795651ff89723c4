//! Match requests: what a matchmaking attempt asks the provider for.

use huddle_protocol::Identity;

use crate::{MatchBounds, SessionError};

/// Parameters for one matchmaking attempt.
///
/// Created per attempt and handed to the presenter; it is not kept once
/// the flow resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub bounds: MatchBounds,
    /// Exact recipients. Empty means open matchmaking.
    pub recipients: Vec<Identity>,
}

impl MatchRequest {
    /// Open matchmaking with no fixed recipients.
    pub fn open(min: usize, max: usize) -> Result<Self, SessionError> {
        Ok(Self {
            bounds: MatchBounds::new(min, max)?,
            recipients: Vec::new(),
        })
    }

    /// Matchmaking targeting exactly `recipients`. Duplicate handles are
    /// collapsed, keeping the first occurrence.
    pub fn targeted(
        recipients: Vec<Identity>,
        bounds: MatchBounds,
    ) -> Result<Self, SessionError> {
        bounds.validate()?;
        let mut unique: Vec<Identity> = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            if !unique.iter().any(|r| r.id == recipient.id) {
                unique.push(recipient);
            }
        }
        Ok(Self {
            bounds,
            recipients: unique,
        })
    }

    /// `true` when no recipients are fixed.
    pub fn is_open_matchmaking(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Re-checks the bounds (fields are public and may have been edited).
    pub fn validate(&self) -> Result<(), SessionError> {
        self.bounds.validate()
    }
}
