//! `carecircle` - CLI for the carecircle domain core
//!
//! This binary loads the stored state, applies one command to it and writes
//! the state back when the command changed something.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use clap::Parser;
use tracing::debug;

use carecircle::cli::{
    Cli, Command, ConfigCommand, EmergencyCommand, HealthCommand, InboxCommand, VolunteerCommand,
};
use carecircle::emergency::format_elapsed;
use carecircle::{
    init_logging, Availability, CareState, Config, EmergencySession, HealthSummary, LogSink,
    Location, Storage, SystemClock,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Volunteers(volunteer_cmd) => {
            let directory = CareState::load_directory(&config)?;
            handle_volunteers(&directory, volunteer_cmd)
        }
        Command::Health(HealthCommand::Metrics { json }) => print_metrics(json),
        Command::Health(HealthCommand::Records { json }) => print_medical_records(json),
        command => {
            if let Command::Emergency(EmergencyCommand::Activate {
                max_distance, limit, ..
            }) = &command
            {
                apply_dispatch_overrides(&mut config, *max_distance, *limit)?;
            }

            let mut storage = Storage::open(config.database_path())?;

            if let Command::Status(cmd) = command {
                let state = load_state(&config, &storage)?;
                return handle_status(&config, &storage, &state, cmd.json);
            }

            let directory = CareState::load_directory(&config)?;
            let changed = storage.update(
                directory,
                Arc::new(SystemClock),
                Arc::new(LogSink),
                Box::new(config.respondent_selector()),
                |state| match command {
                    Command::Emergency(cmd) => handle_emergency(state, cmd),
                    Command::Inbox(cmd) => handle_inbox(state, cmd),
                    Command::Health(cmd) => handle_health(state, cmd),
                    Command::Status(_) | Command::Config(_) | Command::Volunteers(_) => Ok(false),
                },
            )?;
            if changed {
                debug!("Saved state to {}", storage.path().display());
            }
            Ok(())
        }
    }
}

fn apply_dispatch_overrides(
    config: &mut Config,
    max_distance: Option<f64>,
    limit: Option<usize>,
) -> CliResult {
    if let Some(miles) = max_distance {
        config.emergency.max_distance_miles = miles;
    }
    if let Some(limit) = limit {
        config.emergency.max_respondents = limit;
    }
    config.validate()?;
    Ok(())
}

fn load_state(config: &Config, storage: &Storage) -> CliResult<CareState> {
    let directory = CareState::load_directory(config)?;
    let state = storage.load(
        directory,
        Arc::new(SystemClock),
        Arc::new(LogSink),
        Box::new(config.respondent_selector()),
    )?;
    Ok(state)
}

fn handle_volunteers(
    directory: &carecircle::VolunteerDirectory,
    cmd: VolunteerCommand,
) -> CliResult {
    match cmd {
        VolunteerCommand::List {
            specialty,
            available_now,
            json,
        } => {
            let mut volunteers: Vec<_> = match &specialty {
                Some(tag) => directory.filter_by_specialty(tag),
                None => directory.list_all().iter().collect(),
            };
            if available_now {
                volunteers.retain(|v| v.availability.satisfies(Availability::AvailableNow));
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&volunteers)?);
                return Ok(());
            }
            if volunteers.is_empty() {
                println!("No volunteers match.");
                return Ok(());
            }
            for v in volunteers {
                println!(
                    "{:>3}  {:<20} {:>4.1} mi  {:.1}*  {:<18} {}{}",
                    v.id,
                    v.name,
                    v.distance_miles,
                    v.rating,
                    v.availability.to_string(),
                    v.specialties.join(", "),
                    if v.verified { "  [verified]" } else { "" }
                );
            }
        }
        VolunteerCommand::Show { id, json } => {
            let v = directory.get(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(v)?);
                return Ok(());
            }
            println!("{} (#{})", v.name, v.id);
            println!("  Rating:          {:.1} ({} helps)", v.rating, v.completed_helps);
            println!("  Distance:        {:.1} mi", v.distance_miles);
            println!("  Availability:    {}", v.availability);
            println!("  Response time:   ~{} min", v.response_time_minutes_avg);
            println!("  Specialties:     {}", v.specialties.join(", "));
            println!("  Verified:        {}", if v.verified { "yes" } else { "no" });
            if !v.languages.is_empty() {
                println!("  Languages:       {}", v.languages.join(", "));
            }
            if !v.badges.is_empty() {
                println!("  Badges:          {}", v.badges.join(", "));
            }
            if let Some(joined) = &v.joined {
                println!("  Joined:          {joined}");
            }
            if let Some(bio) = &v.bio {
                println!();
                println!("  {bio}");
            }
            if !v.reviews.is_empty() {
                println!();
                println!("  Reviews:");
                for r in &v.reviews {
                    println!(
                        "    {} {}  ({})",
                        "*".repeat(usize::from(r.rating)),
                        r.reviewer,
                        r.date
                    );
                    println!("      {}", r.comment);
                }
            }
        }
    }
    Ok(())
}

/// Returns whether the state changed.
fn handle_emergency(state: &mut CareState, cmd: EmergencyCommand) -> CliResult<bool> {
    match cmd {
        EmergencyCommand::Activate { lat, lon, .. } => {
            let location = lat.zip(lon).map(|(latitude, longitude)| Location {
                latitude,
                longitude,
            });
            let id = state.activate_emergency(location)?;
            let session = state.sessions().get(id)?;
            println!("Emergency #{id} activated.");
            if session.respondents.is_empty() {
                println!("No volunteers are within range.");
            } else {
                println!("Alerted {} volunteer(s):", session.respondents.len());
                print_respondents(session);
            }
            Ok(true)
        }
        EmergencyCommand::Cancel { id, yes } => {
            if !yes {
                println!("Cancel emergency #{id}? Volunteers on the way will be told to stand down.");
                println!("Use --yes to confirm.");
                return Ok(false);
            }
            state.cancel_emergency(id)?;
            println!("Emergency #{id} cancelled.");
            Ok(true)
        }
        EmergencyCommand::Status { id, json } => {
            let session = match id {
                Some(id) => Some(state.sessions().get(id)?),
                None => state.sessions().active(),
            };
            let Some(session) = session else {
                if json {
                    println!("null");
                } else {
                    println!("No active emergency.");
                }
                return Ok(false);
            };
            let elapsed = state.elapsed(session.id)?;

            if json {
                let status = serde_json::json!({
                    "session": session,
                    "elapsed_seconds": elapsed,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(false);
            }

            println!("Emergency #{} - {}", session.id, session.status);
            println!("  Started:   {}", session.started_at.to_rfc3339());
            if let Some(cancelled_at) = session.cancelled_at {
                println!("  Cancelled: {}", cancelled_at.to_rfc3339());
            }
            println!("  Elapsed:   {}", format_elapsed(elapsed));
            match session.location {
                Some(loc) => println!("  Location:  {:.4}, {:.4}", loc.latitude, loc.longitude),
                None => println!("  Location:  not shared"),
            }
            println!(
                "  Responding: {} of {}",
                session.responding().count(),
                session.respondents.len()
            );
            print_respondents(session);
            Ok(false)
        }
        EmergencyCommand::Respond {
            session,
            volunteer,
            status,
        } => {
            let status = status.into();
            state.respondent_status_changed(session, volunteer, status)?;
            println!("Volunteer #{volunteer} is now {status} for emergency #{session}.");
            Ok(true)
        }
        EmergencyCommand::History { json } => {
            let sessions = state.sessions().list();
            if json {
                println!("{}", serde_json::to_string_pretty(sessions)?);
                return Ok(false);
            }
            if sessions.is_empty() {
                println!("No emergencies recorded.");
            }
            for s in sessions {
                println!(
                    "#{:<4} {:<10} {}  {} volunteer(s)",
                    s.id,
                    s.status.to_string(),
                    s.started_at.to_rfc3339(),
                    s.respondents.len()
                );
            }
            Ok(false)
        }
    }
}

fn print_respondents(session: &EmergencySession) {
    for r in &session.respondents {
        println!(
            "  {:>3}  {:<20} {:>4.1} mi  ETA {:>3} min  {}",
            r.volunteer_id, r.volunteer_name, r.distance_miles, r.eta_minutes, r.status
        );
    }
}

/// Returns whether the state changed.
fn handle_inbox(state: &mut CareState, cmd: InboxCommand) -> CliResult<bool> {
    match cmd {
        InboxCommand::List { kind, unread, json } => {
            let mut entries: Vec<_> = match kind {
                Some(kind) => state.inbox().list_by_kind(kind.into()),
                None => state.inbox().list().iter().collect(),
            };
            if unread {
                entries.retain(|n| !n.read);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(false);
            }
            println!("{} unread", state.inbox().unread_count());
            for n in entries {
                println!(
                    "{} #{:<4} [{}] {} ({})",
                    if n.read { " " } else { "*" },
                    n.id,
                    n.kind,
                    n.title,
                    n.created_at.format("%Y-%m-%d %H:%M")
                );
                println!("        {}", n.message);
            }
            Ok(false)
        }
        InboxCommand::Add {
            kind,
            title,
            message,
            id,
        } => {
            let id = match id {
                Some(id) => {
                    let now = state.now();
                    state.add_notification(carecircle::Notification::new(
                        id,
                        kind.into(),
                        title,
                        message,
                        now,
                    ))?;
                    id
                }
                None => state.notify(kind.into(), title, message)?,
            };
            println!("Added notification #{id}.");
            Ok(true)
        }
        InboxCommand::Read { id } => {
            state.mark_read(id)?;
            println!("Notification #{id} marked read.");
            Ok(true)
        }
        InboxCommand::ReadAll => {
            let changed = state.mark_all_read();
            println!("Marked {changed} notification(s) read.");
            Ok(changed > 0)
        }
    }
}

/// Returns whether the state changed.
fn handle_health(state: &mut CareState, cmd: HealthCommand) -> CliResult<bool> {
    match cmd {
        HealthCommand::Record { kind, size, name } => {
            let id = state.record_document(kind.into(), size, name)?;
            let doc = state.health().get(id)?;
            println!("Recorded {} ({}) as document #{id}.", doc.name, doc.display_size());
            Ok(true)
        }
        HealthCommand::List { kind, json } => {
            let documents: Vec<_> = match kind {
                Some(kind) => state.health().list_by_kind(kind.into()),
                None => state.health().list().iter().collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&documents)?);
                return Ok(false);
            }
            if documents.is_empty() {
                println!("No documents recorded.");
            }
            for d in documents {
                println!(
                    "#{:<4} {:<32} {:<16} {}  {}",
                    d.id,
                    d.name,
                    d.kind.label(),
                    d.date,
                    d.display_size()
                );
            }
            Ok(false)
        }
        HealthCommand::Metrics { json } => {
            print_metrics(json)?;
            Ok(false)
        }
        HealthCommand::Records { json } => {
            print_medical_records(json)?;
            Ok(false)
        }
    }
}

fn print_metrics(json: bool) -> CliResult {
    let summary = HealthSummary::seeded();
    if json {
        println!("{}", serde_json::to_string_pretty(summary.metrics())?);
        return Ok(());
    }
    for m in summary.metrics() {
        println!("{:<16} {:>8}  {}", m.title, m.value, m.status);
    }
    Ok(())
}

fn print_medical_records(json: bool) -> CliResult {
    let summary = HealthSummary::seeded();
    if json {
        println!("{}", serde_json::to_string_pretty(summary.records())?);
        return Ok(());
    }
    for r in summary.records() {
        println!(
            "#{:<4} {:<22} {:<14} {}  {}",
            r.id, r.title, r.doctor, r.date, r.kind
        );
    }
    Ok(())
}

fn handle_status(config: &Config, storage: &Storage, state: &CareState, json: bool) -> CliResult {
    let stats = storage.stats()?;
    let active = state.sessions().active();

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "volunteers": state.directory().len(),
            "active_session": active.map(|s| s.id),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("carecircle status");
    println!("-----------------");
    println!("Database:       {}", config.database_path().display());
    println!("Volunteers:     {}", state.directory().len());
    match active {
        Some(session) => println!(
            "Emergency:      #{} active for {}",
            session.id,
            format_elapsed(state.elapsed(session.id)?)
        ),
        None => println!("Emergency:      none active"),
    }
    println!("Sessions:       {}", stats.sessions);
    println!(
        "Notifications:  {} ({} unread)",
        stats.notifications, stats.unread_notifications
    );
    println!("Documents:      {}", stats.documents);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Emergency]");
                println!(
                    "  Max distance (mi):  {}",
                    config.emergency.max_distance_miles
                );
                println!("  Max respondents:    {}", config.emergency.max_respondents);
                println!();
                println!("[Directory]");
                match &config.directory.roster_path {
                    Some(path) => println!("  Roster:             {}", path.display()),
                    None => println!("  Roster:             built-in"),
                }
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration at: {}", path.display());
            let loaded = Config::load_from(Some(path))?;
            CareState::load_directory(&loaded)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
