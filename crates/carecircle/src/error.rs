//! Error types for carecircle.
//!
//! This module defines all error types used throughout the carecircle crate.
//! Domain errors are local and recoverable; the presentation layer decides how
//! to surface them to the user.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for carecircle operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// An invariant would be violated, e.g. activating a second emergency.
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflicting state.
        message: String,
    },

    /// No entity with the given identifier exists.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The operation is not legal in the entity's current state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the operation was rejected.
        message: String,
    },

    /// An insert collided with an existing identifier.
    #[error("duplicate {entity} id: {id}")]
    DuplicateId {
        /// Kind of entity being inserted.
        entity: &'static str,
        /// The colliding identifier.
        id: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt record in {table}: {message}")]
    CorruptRecord {
        /// Table the row came from.
        table: &'static str,
        /// Description of the decoding failure.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to read the volunteer roster file.
    #[error("failed to load roster from {path}: {message}")]
    RosterLoad {
        /// Path to the roster file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// A volunteer record has out-of-range fields.
    #[error("invalid volunteer record: {message}")]
    InvalidVolunteer {
        /// Description of the offending field.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for carecircle operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a not-found error for the given entity kind and id.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an invalid-state error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a duplicate-id error for the given entity kind and id.
    #[must_use]
    pub fn duplicate_id(entity: &'static str, id: impl ToString) -> Self {
        Self::DuplicateId {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a corrupt-record error.
    #[must_use]
    pub fn corrupt_record(table: &'static str, message: impl Into<String>) -> Self {
        Self::CorruptRecord {
            table,
            message: message.into(),
        }
    }

    /// Check if this error is a conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this error is a lookup miss.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is an illegal state transition.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Check if this error is an id collision.
    #[must_use]
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, Self::DuplicateId { .. })
    }

    /// Check if this error belongs to the domain taxonomy (as opposed to
    /// storage, configuration or I/O failures).
    #[must_use]
    pub fn is_domain(&self) -> bool {
        self.is_conflict()
            || self.is_not_found()
            || self.is_invalid_state()
            || self.is_duplicate_id()
    }
}
