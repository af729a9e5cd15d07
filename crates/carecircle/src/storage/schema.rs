//! `SQLite` schema definitions for carecircle.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema. Ordered collections carry an explicit `position`
//! column so reloads reproduce notify and newest-first order exactly.

/// SQL statement to create the sessions table.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY,
    started_at TEXT NOT NULL,
    status TEXT NOT NULL,
    cancelled_at TEXT,
    latitude REAL,
    longitude REAL
)
";

/// SQL statement to create the respondents table.
pub const CREATE_RESPONDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS respondents (
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    volunteer_id INTEGER NOT NULL,
    volunteer_name TEXT NOT NULL,
    distance_miles REAL NOT NULL,
    eta_minutes INTEGER NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (session_id, position)
)
";

/// SQL statement to create the notifications table.
pub const CREATE_NOTIFICATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL,
    read INTEGER NOT NULL DEFAULT 0
)
";

/// SQL statement to create an index on notification position for ordered reads.
pub const CREATE_NOTIFICATIONS_POSITION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_notifications_position ON notifications(position)
";

/// SQL statement to create the documents table.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY,
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    kind TEXT NOT NULL,
    date TEXT NOT NULL,
    size_bytes INTEGER NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SESSIONS_TABLE,
    CREATE_RESPONDENTS_TABLE,
    CREATE_NOTIFICATIONS_TABLE,
    CREATE_NOTIFICATIONS_POSITION_INDEX,
    CREATE_DOCUMENTS_TABLE,
    CREATE_METADATA_TABLE,
];
