//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::emergency::RespondentStatus;
use crate::health::DocumentKind;
use crate::inbox::NotificationKind;

/// Volunteer directory commands.
#[derive(Debug, Subcommand)]
pub enum VolunteerCommand {
    /// List volunteers
    List {
        /// Only volunteers offering this specialty
        #[arg(short, long)]
        specialty: Option<String>,

        /// Only volunteers available right now
        #[arg(short = 'n', long)]
        available_now: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show one volunteer's profile
    Show {
        /// Volunteer id
        id: u32,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Emergency session commands.
#[derive(Debug, Subcommand)]
pub enum EmergencyCommand {
    /// Raise an emergency and alert nearby volunteers
    Activate {
        /// Latitude to share with volunteers
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude to share with volunteers
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Only alert volunteers within this many miles
        #[arg(long)]
        max_distance: Option<f64>,

        /// Maximum number of volunteers to alert
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Cancel an active emergency
    Cancel {
        /// Session id
        id: u64,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show an emergency session (the active one by default)
    Status {
        /// Session id
        id: Option<u64>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Record a volunteer's answer to an alert
    Respond {
        /// Session id
        session: u64,

        /// Volunteer id
        volunteer: u32,

        /// New status
        #[arg(short, long, value_enum, default_value = "responding")]
        status: RespondentStatusArg,
    },

    /// List all emergency sessions
    History {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Notification inbox commands.
#[derive(Debug, Subcommand)]
pub enum InboxCommand {
    /// List notifications, newest first
    List {
        /// Only notifications of this kind
        #[arg(short, long, value_enum)]
        kind: Option<NotificationKindArg>,

        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a notification
    Add {
        /// Notification kind
        #[arg(short, long, value_enum)]
        kind: NotificationKindArg,

        /// Headline
        #[arg(short, long)]
        title: String,

        /// Body text
        #[arg(short, long)]
        message: String,

        /// Explicit id (defaults to the next free id)
        #[arg(long)]
        id: Option<u64>,
    },

    /// Mark a notification as read
    Read {
        /// Notification id
        id: u64,
    },

    /// Mark all notifications as read
    ReadAll,
}

/// Health document commands.
#[derive(Debug, Subcommand)]
pub enum HealthCommand {
    /// Record an uploaded document
    Record {
        /// Document kind
        #[arg(short, long, value_enum)]
        kind: DocumentKindArg,

        /// Size in bytes
        #[arg(short, long, default_value = "0")]
        size: u64,

        /// File name (defaults to kind and date)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List recorded documents, newest first
    List {
        /// Only documents of this kind
        #[arg(short, long, value_enum)]
        kind: Option<DocumentKindArg>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show vital metrics
    Metrics {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List recent medical records, newest first
    Records {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Respondent status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RespondentStatusArg {
    /// Alerted, no answer yet
    Notified,
    /// On the way
    Responding,
}

impl From<RespondentStatusArg> for RespondentStatus {
    fn from(arg: RespondentStatusArg) -> Self {
        match arg {
            RespondentStatusArg::Notified => Self::Notified,
            RespondentStatusArg::Responding => Self::Responding,
        }
    }
}

/// Notification kind argument for filtering and creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotificationKindArg {
    /// A volunteer answered a request
    VolunteerResponse,
    /// Emergency status update
    EmergencyAlert,
    /// Medication or health reminder
    HealthReminder,
    /// A volunteer became available nearby
    VolunteerNearby,
    /// Wellness check-in prompt
    CheckIn,
    /// Upcoming appointment
    Appointment,
}

impl From<NotificationKindArg> for NotificationKind {
    fn from(arg: NotificationKindArg) -> Self {
        match arg {
            NotificationKindArg::VolunteerResponse => Self::VolunteerResponse,
            NotificationKindArg::EmergencyAlert => Self::EmergencyAlert,
            NotificationKindArg::HealthReminder => Self::HealthReminder,
            NotificationKindArg::VolunteerNearby => Self::VolunteerNearby,
            NotificationKindArg::CheckIn => Self::CheckIn,
            NotificationKindArg::Appointment => Self::Appointment,
        }
    }
}

/// Document kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKindArg {
    /// Report from a doctor or hospital
    MedicalReport,
    /// Medication prescription
    Prescription,
    /// Laboratory results
    LabResults,
}

impl From<DocumentKindArg> for DocumentKind {
    fn from(arg: DocumentKindArg) -> Self {
        match arg {
            DocumentKindArg::MedicalReport => Self::MedicalReport,
            DocumentKindArg::Prescription => Self::Prescription,
            DocumentKindArg::LabResults => Self::LabResults,
        }
    }
}
