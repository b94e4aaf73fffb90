//! Aggregate result types.

use super::station::Station;
use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A percentage with exactly two decimal places.
///
/// Stored as hundredths of a percent and serialized as text (`"25.00"`), so
/// that cached payloads carry the rounded value rather than a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(u64);

impl Percentage {
    /// `part / total * 100`, rounded half-up to two decimals.
    ///
    /// Returns `None` when `total` is zero.
    pub fn from_ratio(part: u64, total: u64) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let part = u128::from(part);
        let total = u128::from(total);
        let hundredths = (part * 10_000 * 2 + total) / (total * 2);
        Some(Self(hundredths as u64))
    }

    /// Build from a value expressed in hundredths of a percent.
    pub fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    pub fn hundredths(&self) -> u64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Error returned when a percentage string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid percentage: {0}")]
pub struct ParsePercentageError(String);

impl FromStr for Percentage {
    type Err = ParsePercentageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePercentageError(s.to_string());
        let (whole, frac) = s.split_once('.').unwrap_or((s, "0"));
        if whole.is_empty() || frac.is_empty() || frac.len() > 2 {
            return Err(err());
        }
        let whole: u64 = whole.parse().map_err(|_| err())?;
        let mut frac: u64 = frac.parse().map_err(|_| err())?;
        if s.split_once('.').map(|(_, f)| f.len()) == Some(1) {
            frac *= 10;
        }
        Ok(Self(whole * 100 + frac))
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Detail view of one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    pub station_name: Option<String>,
    pub station_address: Option<String>,
    /// Journeys departing from the station.
    pub start_count: i64,
    /// Journeys returning to the station.
    pub return_count: i64,
    /// Average distance of departing journeys, as the store's numeric text.
    pub start_average: Option<String>,
    /// Average distance of returning journeys, as the store's numeric text.
    pub return_average: Option<String>,
    /// Share of irregular arrivals, absent when no arrival can be classified.
    pub percentage: Option<Percentage>,
}

/// Departures and arrivals of one station in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyFlow {
    /// First day of the month.
    pub month: NaiveDate,
    pub station_id: i32,
    pub departure_count: i64,
    pub arrival_count: i64,
}

/// A destination station reached from a fixed origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Destination {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub station: Station,
    pub journey_count: i64,
}

/// Share of irregular arrivals at one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrregularJourneyPercentage {
    pub station_id: i32,
    pub station_name: Option<String>,
    pub percentage: Percentage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_in_four_is_twenty_five() {
        let p = Percentage::from_ratio(1, 4).unwrap();
        assert_eq!(p.to_string(), "25.00");
        assert_eq!(p.as_f64(), 25.0);
    }

    #[test]
    fn test_rounds_half_up() {
        // 1/8 = 12.5%
        assert_eq!(Percentage::from_ratio(1, 8).unwrap().to_string(), "12.50");
        // 1/3 = 33.333..%
        assert_eq!(Percentage::from_ratio(1, 3).unwrap().to_string(), "33.33");
        // 2/3 = 66.666..%
        assert_eq!(Percentage::from_ratio(2, 3).unwrap().to_string(), "66.67");
        // 1/1600 = 0.0625% -> 0.06
        assert_eq!(Percentage::from_ratio(1, 1600).unwrap().to_string(), "0.06");
        // 1/800 = 0.125% -> 0.13
        assert_eq!(Percentage::from_ratio(1, 800).unwrap().to_string(), "0.13");
    }

    #[test]
    fn test_zero_total_has_no_percentage() {
        assert!(Percentage::from_ratio(0, 0).is_none());
        assert_eq!(Percentage::from_ratio(0, 5).unwrap().to_string(), "0.00");
        assert_eq!(Percentage::from_ratio(5, 5).unwrap().to_string(), "100.00");
    }

    #[test]
    fn test_serializes_as_text() {
        let p = Percentage::from_hundredths(5000);
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"50.00\"");
        let back: Percentage = serde_json::from_str("\"50.00\"").unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_parses_short_fractions() {
        assert_eq!("0.05".parse::<Percentage>().unwrap().hundredths(), 5);
        assert_eq!("7.5".parse::<Percentage>().unwrap().hundredths(), 750);
        assert_eq!("12".parse::<Percentage>().unwrap().hundredths(), 1200);
        assert!("12.345".parse::<Percentage>().is_err());
        assert!("abc".parse::<Percentage>().is_err());
        assert!(".5".parse::<Percentage>().is_err());
    }

    #[test]
    fn test_destination_serializes_flat() {
        let d = Destination {
            station: Station::new(2, "Station 2", "Address 2", "123.456", "456.789"),
            journey_count: 100,
        };
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["id"], 2);
        assert_eq!(value["journey_count"], 100);
    }
}
