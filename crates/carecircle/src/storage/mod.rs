//! Storage layer for carecircle.
//!
//! This module provides `SQLite`-based snapshot storage for a [`CareState`]:
//! emergency sessions with their respondents, the notification inbox and the
//! health document ledger. The volunteer directory is reference data and is
//! not stored.

pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::directory::VolunteerDirectory;
use crate::dispatch::EventSink;
use crate::emergency::{
    EmergencySession, Location, RespondentSelector, SessionId, SessionManager, VolunteerResponse,
};
use crate::error::{Error, Result};
use crate::health::{HealthDocument, HealthRecords};
use crate::inbox::{Notification, NotificationInbox};
use crate::state::CareState;

/// How long a handle waits for another handle's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Format used for document dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Summary counts of what is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StorageStats {
    /// All emergency sessions.
    pub sessions: u64,
    /// Sessions still active.
    pub active_sessions: u64,
    /// All notifications.
    pub notifications: u64,
    /// Notifications not yet read.
    pub unread_notifications: u64,
    /// Health documents.
    pub documents: u64,
}

/// Snapshot store for one user's state.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot with `state`, atomically.
    ///
    /// This overwrites whatever another handle stored since `state` was
    /// loaded; use [`Storage::update`] for read-modify-write.
    ///
    /// # Errors
    ///
    /// Returns an error if any database operation fails; the previous
    /// snapshot is left intact in that case.
    pub fn save(&mut self, state: &CareState) -> Result<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        write_snapshot(&tx, state)?;
        tx.commit()?;
        Ok(())
    }

    /// Load the state, apply `command` and store the result, all under one
    /// write lock.
    ///
    /// Other handles on the same database wait (up to the busy timeout)
    /// until this one commits, so two overlapping commands never lose each
    /// other's changes. `command` returns whether it changed the state;
    /// nothing is written when it returns `false` or fails.
    ///
    /// # Errors
    ///
    /// Returns the command's error, or a storage error if the lock cannot
    /// be taken, the snapshot cannot be read, or it cannot be written.
    pub fn update<E>(
        &mut self,
        directory: VolunteerDirectory,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        selector: Box<dyn RespondentSelector>,
        command: impl FnOnce(&mut CareState) -> std::result::Result<bool, E>,
    ) -> std::result::Result<bool, E>
    where
        E: From<Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::from)?;
        let mut state = read_state(&tx, directory, clock, sink, selector)?;

        let changed = command(&mut state)?;
        if changed {
            write_snapshot(&tx, &state)?;
            tx.commit().map_err(Error::from)?;
        }
        Ok(changed)
    }

    /// How long to wait for another handle's write lock before failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the setting cannot be applied.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    /// Rebuild a [`CareState`] from the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails, a row cannot be decoded, or the
    /// stored state breaks a domain invariant.
    pub fn load(
        &self,
        directory: VolunteerDirectory,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
        selector: Box<dyn RespondentSelector>,
    ) -> Result<CareState> {
        read_state(&self.conn, directory, clock, sink, selector)
    }

    /// Load all stored sessions, oldest first, with respondents in notify order.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a row cannot be decoded.
    pub fn load_sessions(&self) -> Result<Vec<EmergencySession>> {
        read_sessions(&self.conn)
    }

    /// Load the inbox entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a row cannot be decoded.
    pub fn load_notifications(&self) -> Result<Vec<Notification>> {
        read_notifications(&self.conn)
    }

    /// Load the health documents, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a row cannot be decoded.
    pub fn load_documents(&self) -> Result<Vec<HealthDocument>> {
        read_documents(&self.conn)
    }

    /// Get counts of stored entities.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |sql: &str| -> Result<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            from_sql_int("metadata", n)
        };

        Ok(StorageStats {
            sessions: count("SELECT COUNT(*) FROM sessions")?,
            active_sessions: count("SELECT COUNT(*) FROM sessions WHERE status = 'active'")?,
            notifications: count("SELECT COUNT(*) FROM notifications")?,
            unread_notifications: count("SELECT COUNT(*) FROM notifications WHERE read = 0")?,
            documents: count("SELECT COUNT(*) FROM documents")?,
        })
    }
}

fn read_state(
    conn: &Connection,
    directory: VolunteerDirectory,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    selector: Box<dyn RespondentSelector>,
) -> Result<CareState> {
    let sessions = SessionManager::restore(read_sessions(conn)?, clock, sink, selector)?;
    let inbox = NotificationInbox::from_entries(read_notifications(conn)?)?;
    let health = HealthRecords::from_documents(read_documents(conn)?)?;
    Ok(CareState::from_parts(directory, sessions, inbox, health))
}

fn write_snapshot(conn: &Connection, state: &CareState) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM respondents; DELETE FROM sessions; \
         DELETE FROM notifications; DELETE FROM documents;",
    )?;

    let mut insert_session = conn.prepare(
        r"
        INSERT INTO sessions (id, started_at, status, cancelled_at, latitude, longitude)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )?;
    let mut insert_respondent = conn.prepare(
        r"
        INSERT INTO respondents
        (session_id, position, volunteer_id, volunteer_name, distance_miles, eta_minutes, status)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )?;
    for session in state.sessions().list() {
        let session_id = to_sql_int(session.id)?;
        insert_session.execute(params![
            session_id,
            session.started_at.to_rfc3339(),
            session.status.to_string(),
            session.cancelled_at.map(|at| at.to_rfc3339()),
            session.location.map(|l| l.latitude),
            session.location.map(|l| l.longitude),
        ])?;
        for (position, r) in session.respondents.iter().enumerate() {
            insert_respondent.execute(params![
                session_id,
                to_sql_int(position as u64)?,
                r.volunteer_id,
                r.volunteer_name,
                r.distance_miles,
                r.eta_minutes,
                r.status.to_string(),
            ])?;
        }
    }

    let mut insert_notification = conn.prepare(
        r"
        INSERT INTO notifications (id, position, kind, title, message, created_at, read)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )?;
    for (position, n) in state.inbox().list().iter().enumerate() {
        insert_notification.execute(params![
            to_sql_int(n.id)?,
            to_sql_int(position as u64)?,
            n.kind.as_str(),
            n.title,
            n.message,
            n.created_at.to_rfc3339(),
            n.read,
        ])?;
    }

    let mut insert_document = conn.prepare(
        r"
        INSERT INTO documents (id, position, name, kind, date, size_bytes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )?;
    for (position, d) in state.health().list().iter().enumerate() {
        insert_document.execute(params![
            to_sql_int(d.id)?,
            to_sql_int(position as u64)?,
            d.name,
            d.kind.as_str(),
            d.date.format(DATE_FORMAT).to_string(),
            to_sql_int(d.size_bytes)?,
        ])?;
    }

    debug!(
        sessions = state.sessions().list().len(),
        notifications = state.inbox().len(),
        documents = state.health().list().len(),
        "Wrote state snapshot"
    );
    Ok(())
}

fn read_sessions(conn: &Connection) -> Result<Vec<EmergencySession>> {
    let mut respondents = read_respondents(conn)?;

    let mut stmt = conn.prepare(
        r"
        SELECT id, started_at, status, cancelled_at, latitude, longitude
        FROM sessions ORDER BY id
        ",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<f64>>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(
            |(id, started_at, status, cancelled_at, latitude, longitude)| -> Result<EmergencySession> {
            let id = from_sql_int("sessions", id)?;
            let location = match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Some(Location {
                    latitude,
                    longitude,
                }),
                _ => None,
            };
            Ok(EmergencySession {
                id,
                started_at: parse_time("sessions", &started_at)?,
                status: status
                    .parse()
                    .map_err(|e: String| Error::corrupt_record("sessions", e))?,
                cancelled_at: cancelled_at
                    .map(|at| parse_time("sessions", &at))
                    .transpose()?,
                location,
                respondents: respondents.remove(&id).unwrap_or_default(),
            })
        })
        .collect()
}

fn read_respondents(conn: &Connection) -> Result<HashMap<SessionId, Vec<VolunteerResponse>>> {
    let mut stmt = conn.prepare(
        r"
        SELECT session_id, volunteer_id, volunteer_name, distance_miles, eta_minutes, status
        FROM respondents ORDER BY session_id, position
        ",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut by_session: HashMap<SessionId, Vec<VolunteerResponse>> = HashMap::new();
    for (session_id, volunteer_id, volunteer_name, distance_miles, eta_minutes, status) in rows
    {
        let status = status
            .parse()
            .map_err(|e: String| Error::corrupt_record("respondents", e))?;
        by_session
            .entry(from_sql_int("respondents", session_id)?)
            .or_default()
            .push(VolunteerResponse {
                volunteer_id,
                volunteer_name,
                distance_miles,
                eta_minutes,
                status,
            });
    }
    Ok(by_session)
}

fn read_notifications(conn: &Connection) -> Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, kind, title, message, created_at, read
        FROM notifications ORDER BY position
        ",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, kind, title, message, created_at, read)| -> Result<Notification> {
            Ok(Notification {
                id: from_sql_int("notifications", id)?,
                kind: kind
                    .parse()
                    .map_err(|e: String| Error::corrupt_record("notifications", e))?,
                title,
                message,
                created_at: parse_time("notifications", &created_at)?,
                read,
            })
        })
        .collect()
}

fn read_documents(conn: &Connection) -> Result<Vec<HealthDocument>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, name, kind, date, size_bytes
        FROM documents ORDER BY position
        ",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, kind, date, size_bytes)| -> Result<HealthDocument> {
            Ok(HealthDocument {
                id: from_sql_int("documents", id)?,
                name,
                kind: kind
                    .parse()
                    .map_err(|e: String| Error::corrupt_record("documents", e))?,
                date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                    .map_err(|e| Error::corrupt_record("documents", e.to_string()))?,
                size_bytes: from_sql_int("documents", size_bytes)?,
            })
        })
        .collect()
}

fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::invalid_state(format!("value {value} exceeds storage range")))
}

fn from_sql_int(table: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::corrupt_record(table, format!("negative value {value}")))
}

fn parse_time(table: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::corrupt_record(table, format!("bad timestamp '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::dispatch::NullSink;
    use crate::emergency::{NearestFirst, RespondentStatus, SessionStatus};
    use crate::health::DocumentKind;
    use crate::inbox::NotificationKind;
    use chrono::{Duration, TimeZone};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 10, 15, 12, 0, 0).unwrap())
    }

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn new_state(clock: &ManualClock) -> CareState {
        CareState::new(
            VolunteerDirectory::seeded(),
            Arc::new(clock.clone()),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(3)),
        )
    }

    fn reload(storage: &Storage, clock: &ManualClock) -> CareState {
        storage
            .load(
                VolunteerDirectory::seeded(),
                Arc::new(clock.clone()),
                Arc::new(NullSink),
                Box::new(NearestFirst::nearest(3)),
            )
            .expect("failed to load state")
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
        assert_eq!(storage.unwrap().path(), Path::new(":memory:"));
    }

    #[test]
    fn test_load_empty_database() {
        let storage = create_test_storage();
        let state = reload(&storage, &clock());
        assert!(state.sessions().list().is_empty());
        assert!(state.inbox().is_empty());
        assert!(state.health().list().is_empty());
    }

    #[test]
    fn test_sessions_survive_reload() {
        let clock = clock();
        let mut storage = create_test_storage();
        let mut state = new_state(&clock);

        let first = state
            .activate_emergency(Some(Location {
                latitude: 51.5,
                longitude: -0.12,
            }))
            .unwrap();
        clock.advance(Duration::seconds(30));
        state.cancel_emergency(first).unwrap();
        let second = state.activate_emergency(None).unwrap();
        state
            .respondent_status_changed(second, 2, RespondentStatus::Responding)
            .unwrap();
        storage.save(&state).unwrap();

        clock.advance(Duration::seconds(90));
        let loaded = reload(&storage, &clock);
        assert_eq!(loaded.sessions().list(), state.sessions().list());
        assert_eq!(loaded.elapsed(first).unwrap(), 30);
        assert_eq!(loaded.elapsed(second).unwrap(), 90);
        assert_eq!(loaded.sessions().active().map(|s| s.id), Some(second));
        assert_eq!(
            loaded.sessions().get(first).unwrap().status,
            SessionStatus::Cancelled
        );
    }

    #[test]
    fn test_reloaded_state_still_rejects_second_activation() {
        let clock = clock();
        let mut storage = create_test_storage();
        let mut state = new_state(&clock);
        state.activate_emergency(None).unwrap();
        storage.save(&state).unwrap();

        let mut loaded = reload(&storage, &clock);
        assert!(loaded.activate_emergency(None).unwrap_err().is_conflict());
    }

    #[test]
    fn test_inbox_order_and_read_state_survive_reload() {
        let clock = clock();
        let mut storage = create_test_storage();
        let mut state = new_state(&clock);
        for kind in [
            NotificationKind::Appointment,
            NotificationKind::CheckIn,
            NotificationKind::VolunteerResponse,
        ] {
            state.notify(kind, kind.as_str(), "body").unwrap();
        }
        state.mark_read(2).unwrap();
        storage.save(&state).unwrap();

        let loaded = reload(&storage, &clock);
        assert_eq!(loaded.inbox().list(), state.inbox().list());
        let ids: Vec<_> = loaded.inbox().list().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(loaded.inbox().unread_count(), 2);
    }

    #[test]
    fn test_documents_survive_reload() {
        let clock = clock();
        let mut storage = create_test_storage();
        let mut state = new_state(&clock);
        state
            .record_document(DocumentKind::LabResults, 2_300_000, None)
            .unwrap();
        state
            .record_document(DocumentKind::Prescription, 1_024, Some("refill.pdf".into()))
            .unwrap();
        storage.save(&state).unwrap();

        let mut loaded = reload(&storage, &clock);
        assert_eq!(loaded.health().list(), state.health().list());
        assert_eq!(
            loaded
                .record_document(DocumentKind::MedicalReport, 1, None)
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let clock = clock();
        let mut storage = create_test_storage();
        let mut state = new_state(&clock);
        state.notify(NotificationKind::CheckIn, "a", "b").unwrap();
        storage.save(&state).unwrap();
        storage.save(&new_state(&clock)).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats, StorageStats::default());
    }

    #[test]
    fn test_stats() {
        let clock = clock();
        let mut storage = create_test_storage();
        let mut state = new_state(&clock);
        let id = state.activate_emergency(None).unwrap();
        state.cancel_emergency(id).unwrap();
        state.activate_emergency(None).unwrap();
        state.notify(NotificationKind::CheckIn, "a", "b").unwrap();
        state.notify(NotificationKind::CheckIn, "c", "d").unwrap();
        state.mark_read(1).unwrap();
        state
            .record_document(DocumentKind::LabResults, 5, None)
            .unwrap();
        storage.save(&state).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.active_sessions, 1);
        assert_eq!(stats.notifications, 2);
        assert_eq!(stats.unread_notifications, 1);
        assert_eq!(stats.documents, 1);
    }

    #[test]
    fn test_corrupt_status_is_reported() {
        let storage = create_test_storage();
        storage
            .conn
            .execute(
                "INSERT INTO sessions (id, started_at, status) VALUES (1, ?1, 'paused')",
                [clock().now().to_rfc3339()],
            )
            .unwrap();

        let err = storage.load_sessions().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { table: "sessions", .. }));
    }

    #[test]
    fn test_corrupt_timestamp_is_reported() {
        let storage = create_test_storage();
        storage
            .conn
            .execute(
                "INSERT INTO notifications (id, position, kind, title, message, created_at, read)
                 VALUES (1, 0, 'check_in', 't', 'm', 'yesterday', 0)",
                [],
            )
            .unwrap();

        let err = storage.load_notifications().unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    fn temp_db(name: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("carecircle-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("state.db");
        (dir, path)
    }

    fn update_with(
        storage: &mut Storage,
        clock: &ManualClock,
        command: impl FnOnce(&mut CareState) -> Result<bool>,
    ) -> Result<bool> {
        storage.update(
            VolunteerDirectory::seeded(),
            Arc::new(clock.clone()),
            Arc::new(NullSink),
            Box::new(NearestFirst::nearest(3)),
            command,
        )
    }

    #[test]
    fn test_update_writes_only_when_changed() {
        let clock = clock();
        let mut storage = create_test_storage();

        let changed = update_with(&mut storage, &clock, |state| {
            state.activate_emergency(None)?;
            Ok(false)
        })
        .unwrap();
        assert!(!changed);
        assert_eq!(storage.stats().unwrap().sessions, 0);

        update_with(&mut storage, &clock, |state| {
            state.activate_emergency(None)?;
            Ok(true)
        })
        .unwrap();
        assert_eq!(storage.stats().unwrap().active_sessions, 1);
    }

    #[test]
    fn test_failed_update_leaves_snapshot_untouched() {
        let clock = clock();
        let mut storage = create_test_storage();
        update_with(&mut storage, &clock, |state| {
            state.activate_emergency(None)?;
            Ok(true)
        })
        .unwrap();

        let err = update_with(&mut storage, &clock, |state| {
            state.notify(NotificationKind::CheckIn, "a", "b")?;
            state.activate_emergency(None)?;
            Ok(true)
        })
        .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(storage.stats().unwrap().notifications, 0);
    }

    #[test]
    fn test_updates_from_two_handles_both_survive() {
        let clock = clock();
        let (dir, path) = temp_db("two-handles");
        let mut first = Storage::open(&path).unwrap();
        let mut second = Storage::open(&path).unwrap();

        update_with(&mut first, &clock, |state| {
            state.activate_emergency(None)?;
            state.notify(NotificationKind::EmergencyAlert, "Help requested", "Alerted")?;
            Ok(true)
        })
        .unwrap();

        update_with(&mut second, &clock, |state| {
            state.cancel_emergency(1)?;
            Ok(true)
        })
        .unwrap();
        update_with(&mut first, &clock, |state| {
            state.mark_read(1)?;
            Ok(true)
        })
        .unwrap();

        let state = reload(&second, &clock);
        assert_eq!(
            state.sessions().get(1).unwrap().status,
            SessionStatus::Cancelled
        );
        assert_eq!(state.inbox().unread_count(), 0);

        drop(first);
        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_update_holds_write_lock_until_commit() {
        let clock = clock();
        let (dir, path) = temp_db("write-lock");
        let mut first = Storage::open(&path).unwrap();
        let mut second = Storage::open(&path).unwrap();
        second
            .set_busy_timeout(std::time::Duration::from_millis(50))
            .unwrap();

        update_with(&mut first, &clock, |state| {
            state.activate_emergency(None)?;
            Ok(true)
        })
        .unwrap();

        update_with(&mut first, &clock, |state| {
            let blocked = update_with(&mut second, &clock, |other| {
                other.cancel_emergency(1)?;
                Ok(true)
            });
            assert!(matches!(blocked, Err(Error::DatabaseQuery(_))));
            state.respondent_status_changed(1, 1, RespondentStatus::Responding)?;
            Ok(true)
        })
        .unwrap();

        let state = reload(&second, &clock);
        let session = state.sessions().get(1).unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.respondents[0].status, RespondentStatus::Responding);

        drop(first);
        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("carecircle-test-{}", std::process::id()));
        let path = dir.join("nested").join("state.db");
        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.path(), path.as_path());
        assert!(path.exists());
        drop(storage);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
