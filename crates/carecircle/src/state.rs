//! The single state container for one user.
//!
//! [`CareState`] owns the volunteer directory, emergency sessions, the
//! notification inbox and health records. The presentation layer reads through
//! borrowed views and changes state only through the command methods here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::Clock;
use crate::config::Config;
use crate::directory::{VolunteerDirectory, VolunteerId};
use crate::dispatch::EventSink;
use crate::emergency::{
    Location, RespondentSelector, RespondentStatus, SessionId, SessionManager,
};
use crate::error::Result;
use crate::health::{DocumentId, DocumentKind, HealthRecords};
use crate::inbox::{Notification, NotificationId, NotificationInbox, NotificationKind};

/// All domain state for one user.
#[derive(Debug)]
pub struct CareState {
    directory: VolunteerDirectory,
    sessions: SessionManager,
    inbox: NotificationInbox,
    health: HealthRecords,
    clock: Arc<dyn Clock>,
}

impl CareState {
    /// Create an empty state over the given directory.
    #[must_use]
    pub fn new(
        directory: VolunteerDirectory,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        selector: Box<dyn RespondentSelector>,
    ) -> Self {
        let sessions = SessionManager::new(Arc::clone(&clock), sink, selector);
        Self::from_parts(
            directory,
            sessions,
            NotificationInbox::new(),
            HealthRecords::new(),
        )
    }

    /// Assemble a state from already-built parts. The session manager's
    /// clock becomes the state's clock.
    #[must_use]
    pub fn from_parts(
        directory: VolunteerDirectory,
        sessions: SessionManager,
        inbox: NotificationInbox,
        health: HealthRecords,
    ) -> Self {
        let clock = Arc::clone(sessions.clock());
        Self {
            directory,
            sessions,
            inbox,
            health,
            clock,
        }
    }

    /// Load the directory named by `config` (or the built-in roster).
    ///
    /// # Errors
    ///
    /// Returns an error if the configured roster file cannot be loaded.
    pub fn load_directory(config: &Config) -> Result<VolunteerDirectory> {
        match &config.directory.roster_path {
            Some(path) => VolunteerDirectory::from_file(path),
            None => {
                debug!("No roster configured, using built-in roster");
                Ok(VolunteerDirectory::seeded())
            }
        }
    }

    /// Build an empty state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured roster file cannot be loaded.
    pub fn from_config(
        config: &Config,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let directory = Self::load_directory(config)?;
        Ok(Self::new(
            directory,
            clock,
            sink,
            Box::new(config.respondent_selector()),
        ))
    }

    // === Commands ===

    /// Raise an emergency and alert nearby volunteers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if an emergency is already active.
    pub fn activate_emergency(&mut self, location: Option<Location>) -> Result<SessionId> {
        self.sessions.activate(&self.directory, location)
    }

    /// Cancel an active emergency.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] or [`crate::Error::InvalidState`].
    pub fn cancel_emergency(&mut self, session_id: SessionId) -> Result<()> {
        self.sessions.cancel(session_id)
    }

    /// Record a respondent's new answer.
    ///
    /// # Errors
    ///
    /// See [`SessionManager::respondent_status_changed`].
    pub fn respondent_status_changed(
        &mut self,
        session_id: SessionId,
        volunteer_id: VolunteerId,
        status: RespondentStatus,
    ) -> Result<()> {
        self.sessions
            .respondent_status_changed(session_id, volunteer_id, status)
    }

    /// Add a fully formed notification.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateId`] if the id is taken.
    pub fn add_notification(&mut self, notification: Notification) -> Result<()> {
        self.inbox.add(notification)
    }

    /// Add a notification with the next free id, stamped with the current
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if no notification ids are left.
    pub fn notify(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<NotificationId> {
        let id = self.inbox.next_id()?;
        self.inbox
            .add(Notification::new(id, kind, title, message, self.clock.now()))?;
        Ok(id)
    }

    /// Mark one notification read.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the id is absent.
    pub fn mark_read(&mut self, id: NotificationId) -> Result<()> {
        self.inbox.mark_read(id)
    }

    /// Mark every notification read.
    pub fn mark_all_read(&mut self) -> usize {
        self.inbox.mark_all_read()
    }

    /// Record an uploaded health document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Conflict`] if no document ids are left.
    pub fn record_document(
        &mut self,
        kind: DocumentKind,
        size_bytes: u64,
        name: Option<String>,
    ) -> Result<DocumentId> {
        self.health.record(kind, size_bytes, name, self.clock.now())
    }

    // === Reads ===

    /// The volunteer directory.
    #[must_use]
    pub fn directory(&self) -> &VolunteerDirectory {
        &self.directory
    }

    /// Emergency sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The notification inbox.
    #[must_use]
    pub fn inbox(&self) -> &NotificationInbox {
        &self.inbox
    }

    /// Health document ledger.
    #[must_use]
    pub fn health(&self) -> &HealthRecords {
        &self.health
    }

    /// Seconds elapsed in a session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] for an unknown id.
    pub fn elapsed(&self, session_id: SessionId) -> Result<u64> {
        self.sessions.elapsed(session_id)
    }

    /// The current time according to the state's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
