//! Dispatch events emitted by emergency sessions.
//!
//! Delivery to volunteers is owned by an external push/dispatch service. The
//! core only hands events to an [`EventSink`]; a failed hand-off is logged and
//! never fails the domain operation that produced the event.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::emergency::{Location, SessionId, VolunteerResponse};

/// An event for the dispatch collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// A new emergency session went live; respondents should be alerted.
    SessionActivated {
        /// The new session.
        session_id: SessionId,
        /// Where the user is, if shared.
        location: Option<Location>,
        /// Volunteers to alert, in notify order.
        respondents: Vec<VolunteerResponse>,
    },
    /// The user cancelled; respondents should stand down.
    SessionCancelled {
        /// The cancelled session.
        session_id: SessionId,
    },
}

impl DispatchEvent {
    /// The session this event concerns.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::SessionActivated { session_id, .. } | Self::SessionCancelled { session_id } => {
                *session_id
            }
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionActivated {
                session_id,
                respondents,
                ..
            } => write!(
                f,
                "session {session_id} activated ({} respondents)",
                respondents.len()
            ),
            Self::SessionCancelled { session_id } => write!(f, "session {session_id} cancelled"),
        }
    }
}

/// Receiver of dispatch events.
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Hand an event to the collaborator.
    fn emit(&self, event: DispatchEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DispatchEvent) {}
}

/// Writes every event to the log at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: DispatchEvent) {
        info!(session_id = event.session_id(), "Dispatch: {event}");
    }
}

/// Forwards events over a tokio channel to an async dispatcher task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half for the dispatcher.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: DispatchEvent) {
        if let Err(err) = self.tx.send(event) {
            warn!(
                session_id = err.0.session_id(),
                "Dispatch channel closed, dropping event"
            );
        }
    }
}
