//! Respondent selection strategies.
//!
//! A real deployment would ask a matching service; locally the choice is a
//! deterministic function of the directory.

use std::fmt;

use crate::directory::{Volunteer, VolunteerDirectory};

/// Chooses which volunteers to notify when an emergency is activated.
pub trait RespondentSelector: Send + Sync + fmt::Debug {
    /// Name of the strategy (for logging).
    fn name(&self) -> &'static str;

    /// Pick respondents from the directory, in notify order.
    fn select<'a>(&self, directory: &'a VolunteerDirectory) -> Vec<&'a Volunteer>;
}

/// Nearest volunteers first, optionally within a distance threshold.
///
/// Ties on distance are broken by ascending volunteer id so the selection is
/// stable across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestFirst {
    /// Ignore volunteers farther than this many miles.
    pub max_distance_miles: Option<f64>,
    /// Maximum number of respondents.
    pub limit: usize,
}

impl NearestFirst {
    /// Select up to `limit` volunteers regardless of distance.
    #[must_use]
    pub fn nearest(limit: usize) -> Self {
        Self {
            max_distance_miles: None,
            limit,
        }
    }

    /// Select up to `limit` volunteers no farther than `max_distance_miles`.
    #[must_use]
    pub fn within(max_distance_miles: f64, limit: usize) -> Self {
        Self {
            max_distance_miles: Some(max_distance_miles),
            limit,
        }
    }
}

impl Default for NearestFirst {
    fn default() -> Self {
        Self::within(2.0, 3)
    }
}

impl RespondentSelector for NearestFirst {
    fn name(&self) -> &'static str {
        "nearest_first"
    }

    fn select<'a>(&self, directory: &'a VolunteerDirectory) -> Vec<&'a Volunteer> {
        let mut candidates: Vec<&Volunteer> = directory
            .list_all()
            .iter()
            .filter(|v| {
                self.max_distance_miles
                    .map_or(true, |max| v.distance_miles <= max)
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance_miles
                .total_cmp(&b.distance_miles)
                .then(a.id.cmp(&b.id))
        });
        candidates.truncate(self.limit);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Availability;

    fn volunteer(id: u32, distance: f64) -> Volunteer {
        Volunteer {
            id,
            name: format!("V{id}"),
            rating: 4.0,
            distance_miles: distance,
            specialties: Vec::new(),
            availability: Availability::AvailableNow,
            response_time_minutes_avg: 4,
            completed_helps: 0,
            verified: true,
            bio: None,
            languages: Vec::new(),
            badges: Vec::new(),
            joined: None,
            reviews: Vec::new(),
        }
    }

    fn ids(selected: &[&Volunteer]) -> Vec<u32> {
        selected.iter().map(|v| v.id).collect()
    }

    #[test]
    fn test_nearest_three_of_four() {
        let directory = VolunteerDirectory::new(vec![
            volunteer(1, 1.2),
            volunteer(2, 0.3),
            volunteer(3, 0.9),
            volunteer(4, 0.5),
        ])
        .unwrap();

        let selected = NearestFirst::nearest(3).select(&directory);
        assert_eq!(ids(&selected), vec![2, 4, 3]);
    }

    #[test]
    fn test_threshold_excludes_far_volunteers() {
        let directory = VolunteerDirectory::seeded();
        let selected = NearestFirst::within(1.0, 10).select(&directory);
        assert_eq!(ids(&selected), vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let directory =
            VolunteerDirectory::new(vec![volunteer(7, 0.5), volunteer(3, 0.5), volunteer(5, 0.1)])
                .unwrap();
        let selected = NearestFirst::nearest(3).select(&directory);
        assert_eq!(ids(&selected), vec![5, 3, 7]);
    }

    #[test]
    fn test_zero_limit_selects_nobody() {
        let directory = VolunteerDirectory::seeded();
        assert!(NearestFirst::nearest(0).select(&directory).is_empty());
    }

    #[test]
    fn test_empty_directory() {
        let directory = VolunteerDirectory::default();
        assert!(NearestFirst::default().select(&directory).is_empty());
    }
}
