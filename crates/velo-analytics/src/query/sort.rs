//! Sort directions and sortable columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Error for a direction other than `ASC` or `DESC`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sort direction must be ASC or DESC, got {0:?}")]
pub struct ParseDirectionError(String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// Sortable and searchable station columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationColumn {
    Id,
    Name,
    Address,
    X,
    Y,
}

impl StationColumn {
    pub fn sql(&self) -> &'static str {
        match self {
            StationColumn::Id => "id",
            StationColumn::Name => "station_name",
            StationColumn::Address => "station_address",
            StationColumn::X => "coordinate_x",
            StationColumn::Y => "coordinate_y",
        }
    }
}

/// Sortable and searchable journey columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JourneyColumn {
    Id,
    DepartureTime,
    ReturnTime,
    Distance,
    Duration,
}

impl JourneyColumn {
    /// Column reference qualified with the `j` alias used by journey listings.
    pub fn sql(&self) -> &'static str {
        match self {
            JourneyColumn::Id => "j.id",
            JourneyColumn::DepartureTime => "j.departure_date_time",
            JourneyColumn::ReturnTime => "j.return_date_time",
            JourneyColumn::Distance => "j.distance",
            JourneyColumn::Duration => "j.duration",
        }
    }
}

/// Collect the set directions, in slot order, into ordering terms.
pub(crate) fn ordering<C: Copy>(slots: &[(C, Option<Direction>)]) -> Vec<(C, Direction)> {
    slots
        .iter()
        .filter_map(|(column, direction)| direction.map(|d| (*column, d)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_only_uppercase_keywords() {
        assert_eq!("ASC".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("asc".parse::<Direction>().is_err());
        assert!("UP".parse::<Direction>().is_err());
    }

    #[test]
    fn test_unset_slots_are_skipped() {
        let order = ordering(&[
            (StationColumn::Id, None),
            (StationColumn::Name, Some(Direction::Desc)),
            (StationColumn::Address, Some(Direction::Asc)),
            (StationColumn::X, None),
        ]);
        assert_eq!(
            order,
            vec![
                (StationColumn::Name, Direction::Desc),
                (StationColumn::Address, Direction::Asc)
            ]
        );
    }
}
