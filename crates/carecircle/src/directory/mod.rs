//! Read-only volunteer directory.
//!
//! The directory is loaded once (from the built-in roster or a JSON file) and
//! never mutated afterwards. Emergency sessions query it to decide which
//! volunteers to notify.

mod roster;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub use roster::{load_roster, seed_roster};

/// Identifier of a volunteer.
pub type VolunteerId = u32;

/// When a volunteer can start helping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    /// Ready to help immediately.
    AvailableNow,
    /// Free after the given number of minutes.
    AvailableIn {
        /// Minutes until the volunteer is free.
        minutes: u32,
    },
}

impl Availability {
    /// Minutes until the volunteer is free (zero when available now).
    #[must_use]
    pub fn wait_minutes(&self) -> u32 {
        match self {
            Self::AvailableNow => 0,
            Self::AvailableIn { minutes } => *minutes,
        }
    }

    /// Whether a volunteer with this availability can start within the
    /// window described by `wanted`.
    #[must_use]
    pub fn satisfies(&self, wanted: Availability) -> bool {
        self.wait_minutes() <= wanted.wait_minutes()
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AvailableNow => write!(f, "Available now"),
            Self::AvailableIn { minutes } => write!(f, "Available in {minutes} min"),
        }
    }
}

/// A review left by someone the volunteer helped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Identifier, unique within the volunteer's reviews.
    pub id: u32,
    /// Display name of the reviewer.
    pub reviewer: String,
    /// Whole-star rating, 1 to 5.
    pub rating: u8,
    /// Free-form comment.
    pub comment: String,
    /// When the review was left, as shown on the profile.
    pub date: String,
}

/// A volunteer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volunteer {
    /// Unique identifier.
    pub id: VolunteerId,
    /// Display name.
    pub name: String,
    /// Average rating, 0 to 5.
    pub rating: f32,
    /// Distance from the user in miles.
    pub distance_miles: f64,
    /// Areas the volunteer helps with, in display order.
    pub specialties: Vec<String>,
    /// Current availability.
    pub availability: Availability,
    /// Average response time in minutes.
    pub response_time_minutes_avg: u32,
    /// Number of completed helps.
    pub completed_helps: u32,
    /// Whether the volunteer passed verification.
    pub verified: bool,
    /// Free-form biography.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Spoken languages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Recognition badges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
    /// When the volunteer joined, as shown on their profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined: Option<String>,
    /// Reviews, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<Review>,
}

impl Volunteer {
    /// Whether the volunteer lists `tag` as a specialty (case-insensitive).
    #[must_use]
    pub fn has_specialty(&self, tag: &str) -> bool {
        self.specialties
            .iter()
            .any(|s| s.eq_ignore_ascii_case(tag.trim()))
    }

    /// Minutes until this volunteer could reach the user.
    #[must_use]
    pub fn eta_minutes(&self) -> u32 {
        self.response_time_minutes_avg
            .saturating_add(self.availability.wait_minutes())
    }

    fn check(&self) -> std::result::Result<(), String> {
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(format!(
                "volunteer {} has rating {} outside 0-5",
                self.id, self.rating
            ));
        }
        if !self.distance_miles.is_finite() || self.distance_miles < 0.0 {
            return Err(format!(
                "volunteer {} has invalid distance {}",
                self.id, self.distance_miles
            ));
        }
        if let Some(review) = self.reviews.iter().find(|r| !(1..=5).contains(&r.rating)) {
            return Err(format!(
                "volunteer {} has review {} with rating {} outside 1-5",
                self.id, review.id, review.rating
            ));
        }
        Ok(())
    }
}

/// Read-only catalog of volunteers, in roster order.
#[derive(Debug, Clone, Default)]
pub struct VolunteerDirectory {
    volunteers: Vec<Volunteer>,
    index: HashMap<VolunteerId, usize>,
}

impl VolunteerDirectory {
    /// Build a directory from a list of volunteers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVolunteer`] if a record has an out-of-range
    /// rating, distance or review, and [`Error::DuplicateId`] if two records
    /// share an id.
    pub fn new(volunteers: Vec<Volunteer>) -> Result<Self> {
        let mut index = HashMap::with_capacity(volunteers.len());
        for (pos, volunteer) in volunteers.iter().enumerate() {
            volunteer
                .check()
                .map_err(|message| Error::InvalidVolunteer { message })?;
            if index.insert(volunteer.id, pos).is_some() {
                return Err(Error::duplicate_id("volunteer", volunteer.id));
            }
        }
        debug!(count = volunteers.len(), "Volunteer directory loaded");
        Ok(Self { volunteers, index })
    }

    /// The built-in seed directory.
    #[must_use]
    pub fn seeded() -> Self {
        let volunteers = seed_roster();
        let index = volunteers
            .iter()
            .enumerate()
            .map(|(pos, v)| (v.id, pos))
            .collect();
        Self { volunteers, index }
    }

    /// Load a directory from a JSON roster file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if a record is
    /// out of range, or if ids collide.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(load_roster(path.as_ref())?)
    }

    /// Look up a volunteer by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no volunteer has this id.
    pub fn get(&self, id: VolunteerId) -> Result<&Volunteer> {
        self.index
            .get(&id)
            .map(|&pos| &self.volunteers[pos])
            .ok_or_else(|| Error::not_found("volunteer", id))
    }

    /// All volunteers in roster order.
    #[must_use]
    pub fn list_all(&self) -> &[Volunteer] {
        &self.volunteers
    }

    /// Volunteers offering the given specialty.
    #[must_use]
    pub fn filter_by_specialty(&self, tag: &str) -> Vec<&Volunteer> {
        self.volunteers
            .iter()
            .filter(|v| v.has_specialty(tag))
            .collect()
    }

    /// Volunteers able to start within the window described by `wanted`.
    ///
    /// `AvailableNow` selects only volunteers available now;
    /// `AvailableIn { minutes }` also includes those free within `minutes`.
    #[must_use]
    pub fn filter_by_availability(&self, wanted: Availability) -> Vec<&Volunteer> {
        self.volunteers
            .iter()
            .filter(|v| v.availability.satisfies(wanted))
            .collect()
    }

    /// Number of volunteers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.volunteers.len()
    }

    /// Whether the directory has no volunteers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volunteers.is_empty()
    }
}
