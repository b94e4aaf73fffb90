//! Station records.

use serde::{Deserialize, Serialize};

/// A bike station.
///
/// Identifiers are assigned by the upstream data load, and coordinates are
/// kept as the exact decimal text that was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Station {
    pub id: i32,
    pub station_name: Option<String>,
    pub station_address: Option<String>,
    pub coordinate_x: Option<String>,
    pub coordinate_y: Option<String>,
}

impl Station {
    /// Create a station with every attribute present.
    pub fn new(
        id: i32,
        name: impl Into<String>,
        address: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self {
            id,
            station_name: Some(name.into()),
            station_address: Some(address.into()),
            coordinate_x: Some(x.into()),
            coordinate_y: Some(y.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_survive_serialization_verbatim() {
        let station = Station::new(1, "Kaivopuisto", "Meritori 1", "24.950211", "60.155370");
        let json = serde_json::to_string(&station).unwrap();
        assert!(json.contains("\"coordinate_x\":\"24.950211\""));
        assert!(json.contains("\"coordinate_y\":\"60.155370\""));

        let back: Station = serde_json::from_str(&json).unwrap();
        assert_eq!(back, station);
    }
}
