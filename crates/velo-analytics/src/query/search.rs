//! Free-text search predicates.
//!
//! A search term becomes a list of per-column predicates that a row matches
//! if it satisfies any one of them.

use super::sort::{JourneyColumn, StationColumn};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid regex"));

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// A single column test.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<C> {
    /// Integer column equals the value.
    Equals(C, i64),
    /// Text column contains the value as a substring.
    Contains(C, String),
    /// Timestamp column falls on the given calendar day.
    OnDay(C, NaiveDate),
    /// Timestamp column equals the given instant.
    At(C, NaiveDateTime),
}

/// A search string with its numeric and date readings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTerm {
    text: String,
    number: Option<i64>,
    when: Option<When>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum When {
    Day(NaiveDate),
    Instant(NaiveDateTime),
}

impl SearchTerm {
    pub fn parse(text: &str) -> Self {
        let number = NUMERIC
            .is_match(text)
            .then(|| text.parse::<i64>().ok())
            .flatten();
        let when = DATE_TIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
            .map(When::Instant)
            .or_else(|| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .map(When::Day)
            });

        Self {
            text: text.to_string(),
            number,
            when,
        }
    }

    /// The term as an integer, when it consists of digits only.
    pub fn number(&self) -> Option<i64> {
        self.number
    }

    fn on<C: Copy>(&self, column: C) -> Option<Predicate<C>> {
        match self.when? {
            When::Day(day) => Some(Predicate::OnDay(column, day)),
            When::Instant(at) => Some(Predicate::At(column, at)),
        }
    }

    /// Station search: identifier by equality, every text column by
    /// substring. Coordinates are matched as text.
    pub fn station_predicates(&self) -> Vec<Predicate<StationColumn>> {
        let mut predicates = Vec::with_capacity(5);
        if let Some(n) = self.number {
            predicates.push(Predicate::Equals(StationColumn::Id, n));
        }
        for column in [
            StationColumn::Name,
            StationColumn::Address,
            StationColumn::X,
            StationColumn::Y,
        ] {
            predicates.push(Predicate::Contains(column, self.text.clone()));
        }
        predicates
    }

    /// Journey search: numeric columns by equality, timestamps by the date
    /// (or date-time) the term parses to.
    pub fn journey_predicates(&self) -> Vec<Predicate<JourneyColumn>> {
        let mut predicates = Vec::with_capacity(5);
        if let Some(n) = self.number {
            predicates.push(Predicate::Equals(JourneyColumn::Id, n));
        }
        predicates.extend(self.on(JourneyColumn::DepartureTime));
        predicates.extend(self.on(JourneyColumn::ReturnTime));
        if let Some(n) = self.number {
            predicates.push(Predicate::Equals(JourneyColumn::Distance, n));
            predicates.push(Predicate::Equals(JourneyColumn::Duration, n));
        }
        predicates
    }
}
