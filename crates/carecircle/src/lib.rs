//! `carecircle` - Domain core for a community caregiving platform
//!
//! This library tracks emergency sessions raised by a user and the volunteers
//! alerted for them, keeps the user's notification inbox and health document
//! ledger, and answers queries over a neighborhood volunteer directory.
//!
//! [`CareState`] holds everything for one user; [`Storage`] persists it.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod clock;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod emergency;
pub mod error;
pub mod health;
pub mod inbox;
pub mod logging;
pub mod state;
pub mod storage;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::Config;
pub use directory::{Availability, Review, Volunteer, VolunteerDirectory, VolunteerId};
pub use dispatch::{ChannelSink, DispatchEvent, EventSink, LogSink, NullSink};
pub use emergency::{
    EmergencySession, Location, NearestFirst, RespondentSelector, RespondentStatus, SessionId,
    SessionManager, SessionStatus, VolunteerResponse,
};
pub use error::{Error, Result};
pub use health::{
    DocumentKind, HealthDocument, HealthMetric, HealthRecords, HealthSummary, MedicalRecord,
    RecordKind,
};
pub use inbox::{Notification, NotificationId, NotificationInbox, NotificationKind};
pub use logging::init_logging;
pub use state::CareState;
pub use storage::{Storage, StorageStats};
