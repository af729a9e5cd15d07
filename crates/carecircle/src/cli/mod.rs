//! Command-line interface for carecircle.
//!
//! This module provides the CLI structure for the `carecircle` binary, the
//! presentation adapter over [`crate::CareState`].

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DocumentKindArg, EmergencyCommand, HealthCommand, InboxCommand,
    NotificationKindArg, RespondentStatusArg, StatusCommand, VolunteerCommand,
};

/// carecircle - Neighbors helping neighbors
///
/// Raise emergency alerts to nearby volunteers, keep track of notifications
/// and health documents, and browse the volunteer directory.
#[derive(Debug, Parser)]
#[command(name = "carecircle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse the volunteer directory
    #[command(subcommand)]
    Volunteers(VolunteerCommand),

    /// Raise, follow and cancel emergencies
    #[command(subcommand)]
    Emergency(EmergencyCommand),

    /// Read and manage notifications
    #[command(subcommand)]
    Inbox(InboxCommand),

    /// Health documents, vital metrics and medical records
    #[command(subcommand)]
    Health(HealthCommand),

    /// Show a summary of stored state
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "carecircle");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(3, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_emergency_activate_with_location() {
        let args = vec![
            "carecircle", "emergency", "activate", "--lat", "40.7", "--lon", "-74.0", "--limit",
            "2",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Emergency(EmergencyCommand::Activate {
                lat, lon, limit, ..
            }) => {
                assert_eq!(lat, Some(40.7));
                assert_eq!(lon, Some(-74.0));
                assert_eq!(limit, Some(2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_activate_lat_requires_lon() {
        let args = vec!["carecircle", "emergency", "activate", "--lat", "40.7"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_emergency_cancel() {
        let args = vec!["carecircle", "emergency", "cancel", "4", "--yes"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Emergency(EmergencyCommand::Cancel { id: 4, yes: true })
        ));
    }

    #[test]
    fn test_parse_respond_default_status() {
        let args = vec!["carecircle", "emergency", "respond", "1", "2"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Emergency(EmergencyCommand::Respond {
                session: 1,
                volunteer: 2,
                status: RespondentStatusArg::Responding,
            })
        ));
    }

    #[test]
    fn test_parse_inbox_list_by_kind() {
        let args = vec!["carecircle", "inbox", "list", "--kind", "health-reminder"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Inbox(InboxCommand::List {
                kind: Some(NotificationKindArg::HealthReminder),
                ..
            })
        ));
    }

    #[test]
    fn test_parse_health_record() {
        let args = vec![
            "carecircle", "health", "record", "--kind", "lab-results", "--size", "2300000",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Health(HealthCommand::Record {
                kind: DocumentKindArg::LabResults,
                size: 2_300_000,
                name: None,
            })
        ));
    }

    #[test]
    fn test_parse_health_records_json() {
        let cli = Cli::try_parse_from(["carecircle", "health", "records", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Health(HealthCommand::Records { json: true })
        ));
        let cli = Cli::try_parse_from(["carecircle", "health", "metrics"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Health(HealthCommand::Metrics { json: false })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = vec!["carecircle", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let args = vec!["carecircle", "-vv", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
