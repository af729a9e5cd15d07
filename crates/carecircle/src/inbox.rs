//! Notification inbox.
//!
//! Entries are kept newest-first by insertion. Read state only moves from
//! unread to read; there is no deletion.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Identifier of a notification.
pub type NotificationId = u64;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A volunteer answered a request.
    VolunteerResponse,
    /// Emergency status update.
    EmergencyAlert,
    /// Medication or health reminder.
    HealthReminder,
    /// A volunteer became available nearby.
    VolunteerNearby,
    /// Wellness check-in prompt.
    CheckIn,
    /// Upcoming appointment.
    Appointment,
}

impl NotificationKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 6] = [
        Self::VolunteerResponse,
        Self::EmergencyAlert,
        Self::HealthReminder,
        Self::VolunteerNearby,
        Self::CheckIn,
        Self::Appointment,
    ];

    /// Stable snake_case name used in storage and on the command line.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VolunteerResponse => "volunteer_response",
            Self::EmergencyAlert => "emergency_alert",
            Self::HealthReminder => "health_reminder",
            Self::VolunteerNearby => "volunteer_nearby",
            Self::CheckIn => "check_in",
            Self::Appointment => "appointment",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown notification kind '{s}'"))
    }
}

/// A single alert shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique within the inbox.
    pub id: NotificationId,
    /// What it is about.
    pub kind: NotificationKind,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// Whether the user has seen it.
    pub read: bool,
}

impl Notification {
    /// Create an unread notification.
    #[must_use]
    pub fn new(
        id: NotificationId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            created_at,
            read: false,
        }
    }
}

/// Ordered collection of notifications for one user, newest first.
#[derive(Debug, Clone, Default)]
pub struct NotificationInbox {
    entries: Vec<Notification>,
}

impl NotificationInbox {
    /// Create an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an inbox from entries already in newest-first order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if two entries share an id.
    pub fn from_entries(entries: Vec<Notification>) -> Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(Error::duplicate_id("notification", entry.id));
            }
        }
        Ok(Self { entries })
    }

    /// Insert a notification at the head.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if the id is already present.
    pub fn add(&mut self, notification: Notification) -> Result<()> {
        if self.contains(notification.id) {
            return Err(Error::duplicate_id("notification", notification.id));
        }
        debug!(id = notification.id, kind = %notification.kind, "Notification added");
        self.entries.insert(0, notification);
        Ok(())
    }

    /// Mark one notification as read. Marking an already-read entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn mark_read(&mut self, id: NotificationId) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::not_found("notification", id))?;
        entry.read = true;
        Ok(())
    }

    /// Mark every notification as read, returning how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for entry in self.entries.iter_mut().filter(|n| !n.read) {
            entry.read = true;
            changed += 1;
        }
        if changed > 0 {
            debug!(changed, "Marked all notifications read");
        }
        changed
    }

    /// Number of unread notifications.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|n| !n.read).count()
    }

    /// Notifications of one kind, newest first.
    #[must_use]
    pub fn list_by_kind(&self, kind: NotificationKind) -> Vec<&Notification> {
        self.entries.iter().filter(|n| n.kind == kind).collect()
    }

    /// All notifications, newest first.
    #[must_use]
    pub fn list(&self) -> &[Notification] {
        &self.entries
    }

    /// Look up a notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn get(&self, id: NotificationId) -> Result<&Notification> {
        self.entries
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::not_found("notification", id))
    }

    /// Whether a notification with this id exists.
    #[must_use]
    pub fn contains(&self, id: NotificationId) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    /// The smallest id greater than every id in the inbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the inbox already holds the largest
    /// possible id.
    pub fn next_id(&self) -> Result<NotificationId> {
        match self.entries.iter().map(|n| n.id).max() {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| Error::conflict("notification ids exhausted")),
        }
    }

    /// Number of notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the inbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
