//! Volunteer rosters: the built-in seed and JSON roster files.

use std::path::Path;

use tracing::{debug, info};

use super::{Availability, Review, Volunteer};
use crate::error::{Error, Result};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn review(id: u32, reviewer: &str, rating: u8, comment: &str, date: &str) -> Review {
    Review {
        id,
        reviewer: reviewer.to_string(),
        rating,
        comment: comment.to_string(),
        date: date.to_string(),
    }
}

/// The built-in roster used when no roster file is configured.
#[must_use]
pub fn seed_roster() -> Vec<Volunteer> {
    vec![
        Volunteer {
            id: 1,
            name: "Sarah Johnson".to_string(),
            rating: 4.9,
            distance_miles: 0.3,
            specialties: strings(&["Medical Support", "Transportation", "Companionship"]),
            availability: Availability::AvailableNow,
            response_time_minutes_avg: 5,
            completed_helps: 127,
            verified: true,
            bio: Some(
                "Retired nurse with 30+ years of experience. Available for medical \
                 support, transportation, and companionship."
                    .to_string(),
            ),
            languages: strings(&["English", "Spanish"]),
            badges: strings(&["Top Helper", "Quick Responder", "Medical Expert"]),
            joined: Some("March 2023".to_string()),
            reviews: vec![
                review(
                    1,
                    "Margaret K.",
                    5,
                    "Sarah was incredibly helpful and kind. She helped me get to my doctor \
                     appointment and stayed with me during the visit.",
                    "2 weeks ago",
                ),
                review(
                    2,
                    "Robert M.",
                    5,
                    "Very professional and caring. Sarah helped me understand my medication \
                     schedule and set up reminders.",
                    "1 month ago",
                ),
                review(
                    3,
                    "Dorothy L.",
                    4,
                    "Great help with grocery shopping. Sarah was patient and made sure I got \
                     everything I needed.",
                    "2 months ago",
                ),
            ],
        },
        Volunteer {
            id: 2,
            name: "Michael Chen".to_string(),
            rating: 4.8,
            distance_miles: 0.5,
            specialties: strings(&["Grocery Shopping", "Technology Help"]),
            availability: Availability::AvailableNow,
            response_time_minutes_avg: 8,
            completed_helps: 89,
            verified: true,
            bio: None,
            languages: Vec::new(),
            badges: Vec::new(),
            joined: None,
            reviews: Vec::new(),
        },
        Volunteer {
            id: 3,
            name: "Emma Rodriguez".to_string(),
            rating: 4.9,
            distance_miles: 0.7,
            specialties: strings(&["Companionship", "Pet Care"]),
            availability: Availability::AvailableIn { minutes: 30 },
            response_time_minutes_avg: 3,
            completed_helps: 156,
            verified: true,
            bio: None,
            languages: Vec::new(),
            badges: Vec::new(),
            joined: None,
            reviews: Vec::new(),
        },
        Volunteer {
            id: 4,
            name: "David Thompson".to_string(),
            rating: 4.7,
            distance_miles: 1.2,
            specialties: strings(&["Home Repairs", "Transportation"]),
            availability: Availability::AvailableNow,
            response_time_minutes_avg: 12,
            completed_helps: 73,
            verified: true,
            bio: None,
            languages: Vec::new(),
            badges: Vec::new(),
            joined: None,
            reviews: Vec::new(),
        },
    ]
}

/// Read a roster from a JSON file containing an array of volunteers.
///
/// # Errors
///
/// Returns [`Error::RosterLoad`] if the file cannot be read or parsed, or if
/// a record has an out-of-range rating or distance.
pub fn load_roster(path: &Path) -> Result<Vec<Volunteer>> {
    debug!("Loading roster from {}", path.display());
    let raw = std::fs::read_to_string(path).map_err(|e| Error::RosterLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let volunteers = parse_roster(&raw).map_err(|message| Error::RosterLoad {
        path: path.to_path_buf(),
        message,
    })?;
    info!(count = volunteers.len(), "Loaded roster from {}", path.display());
    Ok(volunteers)
}

fn parse_roster(raw: &str) -> std::result::Result<Vec<Volunteer>, String> {
    let volunteers: Vec<Volunteer> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    for volunteer in &volunteers {
        volunteer.check()?;
    }
    Ok(volunteers)
}
