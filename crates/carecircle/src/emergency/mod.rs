//! Emergency sessions.
//!
//! A session runs from activation to cancellation. At most one session is
//! active at a time; cancellation is one-way. Elapsed time is derived from
//! the stored start instant and the injected [`Clock`].

mod selector;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{seconds_between, Clock, MonotonicClock};
use crate::directory::{VolunteerDirectory, VolunteerId};
use crate::dispatch::{DispatchEvent, EventSink};
use crate::error::{Error, Result};

pub use selector::{NearestFirst, RespondentSelector};

/// Identifier of an emergency session.
pub type SessionId = u64;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Volunteers are being alerted and the clock is running.
    Active,
    /// The user stood the emergency down.
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// Where a respondent is in answering the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondentStatus {
    /// Alerted, no answer yet.
    Notified,
    /// On the way.
    Responding,
}

impl fmt::Display for RespondentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notified => write!(f, "notified"),
            Self::Responding => write!(f, "responding"),
        }
    }
}

impl std::str::FromStr for RespondentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "notified" => Ok(Self::Notified),
            "responding" => Ok(Self::Responding),
            other => Err(format!("unknown respondent status '{other}'")),
        }
    }
}

/// A shared geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

/// A volunteer alerted for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerResponse {
    /// The volunteer.
    pub volunteer_id: VolunteerId,
    /// Display name at the time of alerting.
    pub volunteer_name: String,
    /// Distance from the user in miles.
    pub distance_miles: f64,
    /// Estimated minutes until arrival.
    pub eta_minutes: u32,
    /// Current answer.
    pub status: RespondentStatus,
}

/// One emergency episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencySession {
    /// Unique identifier.
    pub id: SessionId,
    /// When the user raised the alert.
    pub started_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: SessionStatus,
    /// When the session was cancelled, if it was.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Where the user was when activating.
    pub location: Option<Location>,
    /// Alerted volunteers, in notify order.
    pub respondents: Vec<VolunteerResponse>,
}

impl EmergencySession {
    /// Whether the session is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Elapsed seconds as of `now`; frozen at the cancellation instant.
    #[must_use]
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        let end = match (self.status, self.cancelled_at) {
            (SessionStatus::Cancelled, Some(at)) => at,
            _ => now,
        };
        seconds_between(self.started_at, end)
    }

    /// Respondents currently on the way.
    pub fn responding(&self) -> impl Iterator<Item = &VolunteerResponse> {
        self.respondents
            .iter()
            .filter(|r| r.status == RespondentStatus::Responding)
    }
}

/// Format elapsed seconds as `m:ss`.
#[must_use]
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Owner of all emergency sessions for one user.
#[derive(Debug)]
pub struct SessionManager {
    sessions: Vec<EmergencySession>,
    /// `None` once the id space is used up.
    next_id: Option<SessionId>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    selector: Box<dyn RespondentSelector>,
}

impl SessionManager {
    /// Create an empty manager.
    ///
    /// The clock is wrapped in a [`MonotonicClock`] so elapsed time never
    /// goes down while a session is active.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        selector: Box<dyn RespondentSelector>,
    ) -> Self {
        Self {
            sessions: Vec::new(),
            next_id: Some(1),
            clock: Arc::new(MonotonicClock::new(clock)),
            sink,
            selector,
        }
    }

    /// Rebuild a manager from previously stored sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if two sessions share an id, or
    /// [`Error::Conflict`] if more than one session is active.
    pub fn restore(
        mut sessions: Vec<EmergencySession>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        selector: Box<dyn RespondentSelector>,
    ) -> Result<Self> {
        sessions.sort_by_key(|s| s.id);
        if let Some(pair) = sessions.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(Error::duplicate_id("session", pair[0].id));
        }
        if sessions.iter().filter(|s| s.is_active()).count() > 1 {
            return Err(Error::conflict("stored state has more than one active session"));
        }
        let next_id = sessions.last().map_or(Some(1), |s| s.id.checked_add(1));
        let floor = sessions
            .iter()
            .flat_map(|s| std::iter::once(s.started_at).chain(s.cancelled_at))
            .max();
        debug!(count = sessions.len(), ?next_id, "Restored emergency sessions");
        Ok(Self {
            sessions,
            next_id,
            clock: Arc::new(MonotonicClock::with_floor(clock, floor)),
            sink,
            selector,
        })
    }

    /// Raise a new emergency and alert nearby volunteers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if a session is already active or no
    /// session ids are left.
    pub fn activate(
        &mut self,
        directory: &VolunteerDirectory,
        location: Option<Location>,
    ) -> Result<SessionId> {
        if let Some(active) = self.active() {
            warn!(session_id = active.id, "Rejected activation: session already active");
            return Err(Error::conflict(format!(
                "emergency session {} is already active",
                active.id
            )));
        }

        let id = self
            .next_id
            .ok_or_else(|| Error::conflict("emergency session ids exhausted"))?;

        let respondents: Vec<VolunteerResponse> = self
            .selector
            .select(directory)
            .into_iter()
            .map(|v| VolunteerResponse {
                volunteer_id: v.id,
                volunteer_name: v.name.clone(),
                distance_miles: v.distance_miles,
                eta_minutes: v.eta_minutes(),
                status: RespondentStatus::Notified,
            })
            .collect();

        self.next_id = id.checked_add(1);
        let session = EmergencySession {
            id,
            started_at: self.clock.now(),
            status: SessionStatus::Active,
            cancelled_at: None,
            location,
            respondents,
        };
        info!(
            session_id = id,
            respondents = session.respondents.len(),
            selector = self.selector.name(),
            "Emergency session activated"
        );

        self.sink.emit(DispatchEvent::SessionActivated {
            session_id: id,
            location,
            respondents: session.respondents.clone(),
        });
        self.sessions.push(session);
        Ok(id)
    }

    /// Stand an active emergency down.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or
    /// [`Error::InvalidState`] if the session is already cancelled.
    pub fn cancel(&mut self, session_id: SessionId) -> Result<()> {
        let now = self.clock.now();
        let session = self.session_mut(session_id)?;
        if !session.is_active() {
            return Err(Error::invalid_state(format!(
                "emergency session {session_id} is already cancelled"
            )));
        }

        session.status = SessionStatus::Cancelled;
        session.cancelled_at = Some(now.max(session.started_at));
        info!(
            session_id,
            elapsed_seconds = session.elapsed_at(now),
            "Emergency session cancelled"
        );

        self.sink
            .emit(DispatchEvent::SessionCancelled { session_id });
        Ok(())
    }

    /// Seconds since activation, frozen once cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn elapsed(&self, session_id: SessionId) -> Result<u64> {
        Ok(self.get(session_id)?.elapsed_at(self.clock.now()))
    }

    /// Record a respondent's new answer. Notify order is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the session is unknown or the volunteer
    /// was not alerted for it, and [`Error::InvalidState`] if the session has
    /// been cancelled.
    pub fn respondent_status_changed(
        &mut self,
        session_id: SessionId,
        volunteer_id: VolunteerId,
        new_status: RespondentStatus,
    ) -> Result<()> {
        let session = self.session_mut(session_id)?;
        if !session.is_active() {
            return Err(Error::invalid_state(format!(
                "emergency session {session_id} is cancelled"
            )));
        }

        let respondent = session
            .respondents
            .iter_mut()
            .find(|r| r.volunteer_id == volunteer_id)
            .ok_or_else(|| {
                Error::not_found("respondent", format!("{volunteer_id} in session {session_id}"))
            })?;

        debug!(
            session_id,
            volunteer_id,
            from = %respondent.status,
            to = %new_status,
            "Respondent status changed"
        );
        respondent.status = new_status;
        Ok(())
    }

    /// Look up a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id.
    pub fn get(&self, session_id: SessionId) -> Result<&EmergencySession> {
        self.sessions
            .iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| Error::not_found("session", session_id))
    }

    /// The currently active session, if any.
    #[must_use]
    pub fn active(&self) -> Option<&EmergencySession> {
        self.sessions.iter().find(|s| s.is_active())
    }

    /// All sessions, oldest first.
    #[must_use]
    pub fn list(&self) -> &[EmergencySession] {
        &self.sessions
    }

    /// The clock this manager reads (never goes backwards).
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn session_mut(&mut self, session_id: SessionId) -> Result<&mut EmergencySession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| Error::not_found("session", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::dispatch::{ChannelSink, NullSink};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 15, 14, 0, 0).unwrap()
    }

    fn manager_with(clock: &ManualClock, limit: usize) -> SessionManager {
        SessionManager::new(
            Arc::new(clock.clone()),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(limit)),
        )
    }

    #[test]
    fn test_activate_selects_nearest_respondents() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 3);
        let directory = VolunteerDirectory::seeded();

        let id = manager.activate(&directory, None).unwrap();
        let session = manager.get(id).unwrap();

        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.started_at, start());
        let names: Vec<_> = session
            .respondents
            .iter()
            .map(|r| r.volunteer_name.as_str())
            .collect();
        assert_eq!(names, vec!["Sarah Johnson", "Michael Chen", "Emma Rodriguez"]);
        assert!(session
            .respondents
            .iter()
            .all(|r| r.status == RespondentStatus::Notified));
        assert_eq!(session.respondents[2].eta_minutes, 33);
    }

    #[test]
    fn test_double_activate_conflicts_and_leaves_session_unchanged() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 3);
        let directory = VolunteerDirectory::seeded();

        let id = manager.activate(&directory, None).unwrap();
        let before = manager.get(id).unwrap().clone();
        clock.advance(Duration::seconds(5));

        let err = manager.activate(&directory, None).unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(manager.get(id).unwrap(), &before);
        assert_eq!(manager.list().len(), 1);
    }

    #[test]
    fn test_cancel_then_cancel_again() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 3);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();

        manager.cancel(id).unwrap();
        assert_eq!(manager.get(id).unwrap().status, SessionStatus::Cancelled);
        assert!(manager.active().is_none());

        let err = manager.cancel(id).unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_cancel_unknown_id_leaves_state_unchanged() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 3);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();

        let err = manager.cancel(id + 100).unwrap_err();
        assert!(err.is_not_found());
        assert!(manager.get(id).unwrap().is_active());
    }

    #[test]
    fn test_elapsed_tracks_clock_and_freezes_on_cancel() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 3);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();

        assert_eq!(manager.elapsed(id).unwrap(), 0);
        clock.advance(Duration::seconds(42));
        assert_eq!(manager.elapsed(id).unwrap(), 42);
        // Simulate the process being suspended for a long time.
        clock.advance(Duration::minutes(10));
        assert_eq!(manager.elapsed(id).unwrap(), 642);

        manager.cancel(id).unwrap();
        clock.advance(Duration::hours(1));
        assert_eq!(manager.elapsed(id).unwrap(), 642);
    }

    #[test]
    fn test_elapsed_never_negative() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 1);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();
        clock.advance(Duration::seconds(-30));
        assert_eq!(manager.elapsed(id).unwrap(), 0);
    }

    #[test]
    fn test_elapsed_does_not_drop_when_clock_steps_back() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 1);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();

        clock.advance(Duration::seconds(100));
        assert_eq!(manager.elapsed(id).unwrap(), 100);
        clock.advance(Duration::seconds(-40));
        assert_eq!(manager.elapsed(id).unwrap(), 100);
        clock.advance(Duration::seconds(70));
        assert_eq!(manager.elapsed(id).unwrap(), 130);
    }

    #[test]
    fn test_restored_clock_does_not_read_before_stored_sessions() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 1);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();
        clock.advance(Duration::seconds(50));

        let restored = SessionManager::restore(
            manager.list().to_vec(),
            Arc::new(clock.clone()),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(1)),
        )
        .unwrap();
        clock.set(start() - Duration::minutes(5));
        assert_eq!(restored.elapsed(id).unwrap(), 0);
        assert!(restored.clock().now() >= start());
    }

    #[test]
    fn test_activate_fails_when_ids_exhausted() {
        let clock = ManualClock::new(start());
        let directory = VolunteerDirectory::seeded();
        let mut manager = manager_with(&clock, 1);
        let id = manager.activate(&directory, None).unwrap();
        manager.cancel(id).unwrap();
        let mut last = manager.get(id).unwrap().clone();
        last.id = SessionId::MAX;

        let mut restored = SessionManager::restore(
            vec![last],
            Arc::new(clock),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(1)),
        )
        .unwrap();
        let err = restored.activate(&directory, None).unwrap_err();
        assert!(err.is_conflict());
        assert!(restored.active().is_none());
    }

    #[test]
    fn test_new_session_after_cancel() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 2);
        let directory = VolunteerDirectory::seeded();

        let first = manager.activate(&directory, None).unwrap();
        manager.cancel(first).unwrap();
        let second = manager.activate(&directory, None).unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.active().map(|s| s.id), Some(second));
        assert_eq!(
            manager.list().iter().filter(|s| s.is_active()).count(),
            1
        );
    }

    #[test]
    fn test_respondent_status_change_preserves_order() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 3);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();

        manager
            .respondent_status_changed(id, 3, RespondentStatus::Responding)
            .unwrap();

        let session = manager.get(id).unwrap();
        let order: Vec<_> = session.respondents.iter().map(|r| r.volunteer_id).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(session.respondents[2].status, RespondentStatus::Responding);
        assert_eq!(session.responding().count(), 1);
    }

    #[test]
    fn test_respondent_status_change_unknown_volunteer() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 2);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();

        let err = manager
            .respondent_status_changed(id, 4, RespondentStatus::Responding)
            .unwrap_err();
        assert!(err.is_not_found());

        let err = manager
            .respondent_status_changed(id + 1, 1, RespondentStatus::Responding)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_respondent_status_change_after_cancel() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 2);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();
        manager.cancel(id).unwrap();

        let err = manager
            .respondent_status_changed(id, 1, RespondentStatus::Responding)
            .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_events_emitted_on_activate_and_cancel() {
        let clock = ManualClock::new(start());
        let (sink, mut rx) = ChannelSink::new();
        let mut manager = SessionManager::new(
            Arc::new(clock),
            Arc::new(sink),
            Box::new(NearestFirst::nearest(2)),
        );
        let location = Location {
            latitude: 40.71,
            longitude: -74.0,
        };

        let id = manager
            .activate(&VolunteerDirectory::seeded(), Some(location))
            .unwrap();
        manager.cancel(id).unwrap();

        match rx.try_recv().unwrap() {
            DispatchEvent::SessionActivated {
                session_id,
                location: loc,
                respondents,
            } => {
                assert_eq!(session_id, id);
                assert_eq!(loc, Some(location));
                assert_eq!(respondents.len(), 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            DispatchEvent::SessionCancelled { session_id: id }
        );
    }

    #[test]
    fn test_failed_operations_emit_nothing() {
        let clock = ManualClock::new(start());
        let (sink, mut rx) = ChannelSink::new();
        let mut manager = SessionManager::new(
            Arc::new(clock),
            Arc::new(sink),
            Box::new(NearestFirst::nearest(2)),
        );
        let directory = VolunteerDirectory::seeded();
        let id = manager.activate(&directory, None).unwrap();
        let _ = rx.try_recv();

        assert!(manager.activate(&directory, None).is_err());
        assert!(manager.cancel(id + 1).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_restore_rejects_two_active_sessions() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 1);
        let id = manager
            .activate(&VolunteerDirectory::seeded(), None)
            .unwrap();
        let mut twin = manager.get(id).unwrap().clone();
        twin.id = id + 1;
        let sessions = vec![manager.get(id).unwrap().clone(), twin];

        let err = SessionManager::restore(
            sessions,
            Arc::new(clock),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(1)),
        )
        .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_restore_continues_id_sequence() {
        let clock = ManualClock::new(start());
        let mut manager = manager_with(&clock, 1);
        let directory = VolunteerDirectory::seeded();
        let id = manager.activate(&directory, None).unwrap();
        manager.cancel(id).unwrap();

        let mut restored = SessionManager::restore(
            manager.list().to_vec(),
            Arc::new(clock),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(1)),
        )
        .unwrap();
        let next = restored.activate(&directory, None).unwrap();
        assert_eq!(next, id + 1);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65), "1:05");
        assert_eq!(format_elapsed(600), "10:00");
    }

    #[test]
    fn test_status_round_trip_from_str() {
        for status in [SessionStatus::Active, SessionStatus::Cancelled] {
            assert_eq!(status.to_string().parse::<SessionStatus>().unwrap(), status);
        }
        for status in [RespondentStatus::Notified, RespondentStatus::Responding] {
            assert_eq!(
                status.to_string().parse::<RespondentStatus>().unwrap(),
                status
            );
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }
}
