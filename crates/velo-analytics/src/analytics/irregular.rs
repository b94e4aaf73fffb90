//! Share of irregular journeys per return station.

use super::Analytics;
use crate::cache::CacheKey;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{IrregularJourneyPercentage, Percentage};
use crate::query::IrregularParams;
use crate::store::ArrivalTally;
use velo_common_log::spans::{instrument_future, query_span};

/// Percentages from per-station tallies, keeping the input order. Stations
/// without classified arrivals are dropped.
pub fn percentages_from_tallies(tallies: Vec<ArrivalTally>) -> Vec<IrregularJourneyPercentage> {
    tallies
        .into_iter()
        .filter_map(|tally| {
            let total = u64::try_from(tally.total).ok()?;
            let irregular = u64::try_from(tally.irregular).ok()?;
            let percentage = Percentage::from_ratio(irregular, total)?;
            Some(IrregularJourneyPercentage {
                station_id: tally.station_id,
                station_name: tally.station_name,
                percentage,
            })
        })
        .collect()
}

impl Analytics {
    /// Query parameters using the configured threshold over all dates.
    pub fn irregular_params(&self) -> IrregularParams {
        IrregularParams::new(self.irregular_threshold_secs)
    }

    /// Irregular-journey percentage of every station with classifiable
    /// arrivals, ordered by station id.
    pub async fn irregular_journey_percentage(
        &self,
        params: &IrregularParams,
    ) -> AnalyticsResult<Vec<IrregularJourneyPercentage>> {
        let key = params.cache_key();
        let fetch = self.cache.fetch_value(&key, self.ttl.analytics(), || async move {
            let tallies = self
                .store
                .arrival_tallies(params.threshold_secs, &params.range())
                .await?;
            Ok::<_, AnalyticsError>(percentages_from_tallies(tallies))
        });
        instrument_future(fetch, query_span("irregular_journey_percentage", &key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(station_id: i32, total: i64, irregular: i64) -> ArrivalTally {
        ArrivalTally {
            station_id,
            station_name: Some(format!("Station {}", station_id)),
            total,
            irregular,
        }
    }

    #[test]
    fn test_one_in_four_is_twenty_five_percent() {
        let result = percentages_from_tallies(vec![tally(3, 4, 1)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].percentage.to_string(), "25.00");
    }

    #[test]
    fn test_stations_without_arrivals_are_dropped() {
        let result = percentages_from_tallies(vec![tally(1, 0, 0), tally(2, 3, 3)]);
        let ids: Vec<i32> = result.iter().map(|p| p.station_id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(result[0].percentage.to_string(), "100.00");
    }
}
