//! Most frequent destinations from a station.

use super::Analytics;
use crate::cache::CacheKey;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::Destination;
use crate::query::DestinationParams;
use std::cmp::Reverse;
use velo_common_log::spans::{instrument_future, query_span};

/// Order destinations by journey count, highest first, ties by station id.
pub fn rank_destinations(mut destinations: Vec<Destination>) -> Vec<Destination> {
    destinations.sort_by_key(|d| (Reverse(d.journey_count), d.station.id));
    destinations
}

impl Analytics {
    /// Return stations reached from `params.station_id`, most frequent
    /// first, optionally limited to departures within a date range.
    pub async fn popular_destinations(&self, params: &DestinationParams) -> AnalyticsResult<Vec<Destination>> {
        let key = params.cache_key();
        let fetch = self.cache.fetch_value(&key, self.ttl.analytics(), || async move {
            let destinations = self
                .store
                .destination_counts(params.station_id, &params.range(), params.window())
                .await?;
            Ok::<_, AnalyticsError>(destinations)
        });
        instrument_future(fetch, query_span("popular_destinations", &key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Station;

    fn destination(id: i32, journey_count: i64) -> Destination {
        Destination {
            station: Station::new(id, format!("Station {}", id), "", "", ""),
            journey_count,
        }
    }

    #[test]
    fn test_most_frequent_first() {
        let ranked = rank_destinations(vec![destination(1, 3), destination(2, 7)]);
        let ids: Vec<i32> = ranked.iter().map(|d| d.station.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_ties_break_by_station_id() {
        let ranked = rank_destinations(vec![destination(9, 5), destination(4, 5), destination(6, 8)]);
        let ids: Vec<i32> = ranked.iter().map(|d| d.station.id).collect();
        assert_eq!(ids, vec![6, 4, 9]);
    }
}
