//! Journey records.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: i64 = 1_000_000;

/// A single journey between two stations.
///
/// `duration` is recorded by the source system independently of the two
/// timestamps, so the two can disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Journey {
    pub id: i32,
    pub departure_date_time: Option<NaiveDateTime>,
    pub return_date_time: Option<NaiveDateTime>,
    pub departure_station_id: Option<i32>,
    pub return_station_id: Option<i32>,
    pub distance: Option<i32>,
    pub duration: Option<i32>,
}

impl Journey {
    /// Time between departure and return, when both are recorded.
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.departure_date_time, self.return_date_time) {
            (Some(departed), Some(returned)) => Some(returned - departed),
            _ => None,
        }
    }

    /// Whether the journey can be classified as regular or irregular.
    pub fn is_classifiable(&self) -> bool {
        self.elapsed().is_some() && self.duration.is_some()
    }

    /// Gap between the elapsed time and the recorded duration, in
    /// microseconds, keeping fractions of a second.
    fn deviation_micros(&self) -> Option<i64> {
        let elapsed = self.elapsed()?.num_microseconds()?;
        let recorded = i64::from(self.duration?) * MICROS_PER_SEC;
        Some((elapsed - recorded).abs())
    }

    /// Whether the recorded duration deviates from the elapsed time by more
    /// than `threshold_secs`. Unclassifiable journeys are never irregular.
    pub fn is_irregular(&self, threshold_secs: u32) -> bool {
        self.deviation_micros()
            .map_or(false, |deviation| deviation > i64::from(threshold_secs) * MICROS_PER_SEC)
    }
}

/// A journey row as returned by listings, with both station names joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JourneyListing {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub journey: Journey,
    pub departure_station_name: Option<String>,
    pub return_station_name: Option<String>,
}
