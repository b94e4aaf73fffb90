//! Monthly departure and arrival counts.

use super::Analytics;
use crate::cache::CacheKey;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::MonthlyFlow;
use crate::query::MonthlyFlowParams;
use crate::store::MonthlyCount;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use velo_common_log::spans::{instrument_future, query_span};

/// Join departure and arrival counts on `(month, station)`.
///
/// A pair present on only one side gets zero for the other. The result is
/// ordered by month, then station id.
pub fn merge_flows(departures: Vec<MonthlyCount>, arrivals: Vec<MonthlyCount>) -> Vec<MonthlyFlow> {
    let mut merged: BTreeMap<(NaiveDate, i32), (i64, i64)> = BTreeMap::new();
    for count in departures {
        merged.entry((count.month, count.station_id)).or_default().0 += count.journeys;
    }
    for count in arrivals {
        merged.entry((count.month, count.station_id)).or_default().1 += count.journeys;
    }

    merged
        .into_iter()
        .map(|((month, station_id), (departure_count, arrival_count))| MonthlyFlow {
            month,
            station_id,
            departure_count,
            arrival_count,
        })
        .collect()
}

impl Analytics {
    /// Departures and arrivals per station and month.
    pub async fn journey_count_by_month(&self, params: &MonthlyFlowParams) -> AnalyticsResult<Vec<MonthlyFlow>> {
        let key = params.cache_key();
        let fetch = self.cache.fetch_value(&key, self.ttl.analytics(), || async move {
            let departures = self.store.monthly_departures(params).await?;
            let arrivals = self.store.monthly_arrivals(params).await?;
            Ok::<_, AnalyticsError>(merge_flows(departures, arrivals))
        });
        instrument_future(fetch, query_span("journey_count_by_month", &key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(month: u32, station_id: i32, journeys: i64) -> MonthlyCount {
        MonthlyCount {
            month: NaiveDate::from_ymd_opt(2021, month, 1).unwrap(),
            station_id,
            journeys,
        }
    }

    #[test]
    fn test_missing_side_is_zero() {
        let flows = merge_flows(vec![count(3, 1, 4)], vec![count(3, 2, 1)]);
        assert_eq!(flows.len(), 2);
        assert_eq!((flows[0].station_id, flows[0].departure_count, flows[0].arrival_count), (1, 4, 0));
        assert_eq!((flows[1].station_id, flows[1].departure_count, flows[1].arrival_count), (2, 0, 1));
    }

    #[test]
    fn test_ordered_by_month_then_station() {
        let flows = merge_flows(
            vec![count(6, 1, 1), count(5, 9, 1)],
            vec![count(5, 2, 1), count(6, 1, 3)],
        );
        let order: Vec<(u32, i32)> = flows
            .iter()
            .map(|f| (chrono::Datelike::month(&f.month), f.station_id))
            .collect();
        assert_eq!(order, vec![(5, 2), (5, 9), (6, 1)]);
        assert_eq!(flows[2].arrival_count, 3);
    }

    #[test]
    fn test_empty_inputs_merge_to_nothing() {
        assert!(merge_flows(vec![], vec![]).is_empty());
    }
}
