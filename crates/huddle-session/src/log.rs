//! The event log: the ordered record of chat and connection events.
//!
//! Observers get two views of it:
//! - a `broadcast` stream of [`LogUpdate`]s, one per change
//! - a `watch` of the rendered lines, which always holds the latest state
//!   and never lags
//!
//! Appending is infallible. Observers that went away are simply skipped.

use huddle_protocol::{ChatMessage, ConnectionEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

/// One entry in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum LogEntry {
    Chat(ChatMessage),
    Connection(ConnectionEvent),
}

impl LogEntry {
    /// The line the chat view shows for this entry.
    pub fn render(&self) -> String {
        match self {
            Self::Chat(message) => message.render(),
            Self::Connection(event) => event.render(),
        }
    }
}

impl From<ChatMessage> for LogEntry {
    fn from(message: ChatMessage) -> Self {
        Self::Chat(message)
    }
}

impl From<ConnectionEvent> for LogEntry {
    fn from(event: ConnectionEvent) -> Self {
        Self::Connection(event)
    }
}

/// A change to the log, as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogUpdate {
    Appended(LogEntry),
    /// A new session opened and the log was reset.
    Cleared,
}

/// Cloneable observer endpoints, detached from the log itself.
///
/// The coordinator task owns the [`EventLog`]; handles keep one of these.
#[derive(Debug, Clone)]
pub struct LogObservers {
    updates: broadcast::Sender<LogUpdate>,
    lines: watch::Receiver<Vec<String>>,
}

impl LogObservers {
    /// A new stream of updates, starting after the current state.
    pub fn subscribe(&self) -> broadcast::Receiver<LogUpdate> {
        self.updates.subscribe()
    }

    /// The rendered lines, updated on every change.
    pub fn lines(&self) -> watch::Receiver<Vec<String>> {
        self.lines.clone()
    }
}

/// Append-only (until cleared) record of what happened in the session.
#[derive(Debug)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    updates: broadcast::Sender<LogUpdate>,
    lines: watch::Sender<Vec<String>>,
}

impl EventLog {
    /// Creates an empty log. `capacity` is how many updates a slow
    /// subscriber may fall behind before it starts missing them.
    pub fn new(capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        let (lines, _) = watch::channel(Vec::new());
        Self {
            entries: Vec::new(),
            updates,
            lines,
        }
    }

    /// Appends an entry and notifies observers.
    pub fn append(&mut self, entry: impl Into<LogEntry>) {
        let entry = entry.into();
        let line = entry.render();
        tracing::debug!(%line, "log entry appended");

        self.entries.push(entry.clone());
        self.lines.send_modify(|lines| lines.push(line));
        // No subscribers is fine.
        let _ = self.updates.send(LogUpdate::Appended(entry));
    }

    /// Empties the log.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lines.send_replace(Vec::new());
        let _ = self.updates.send(LogUpdate::Cleared);
    }

    /// Entries in append order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Rendered lines in append order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A new stream of updates.
    pub fn subscribe(&self) -> broadcast::Receiver<LogUpdate> {
        self.updates.subscribe()
    }

    /// Observer endpoints that outlive borrows of the log.
    pub fn observers(&self) -> LogObservers {
        LogObservers {
            updates: self.updates.clone(),
            lines: self.lines.subscribe(),
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(256)
    }
}
