//! Station counts, listings and summaries.

use super::Analytics;
use crate::cache::{keys, CacheKey};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{Percentage, Station, StationSummary};
use crate::query::StationListParams;
use crate::store::StationTotals;
use velo_common_log::spans::{instrument_future, query_span};

impl From<StationTotals> for StationSummary {
    fn from(totals: StationTotals) -> Self {
        let percentage = u64::try_from(totals.classified_arrivals)
            .ok()
            .and_then(|total| Percentage::from_ratio(totals.irregular_arrivals.max(0) as u64, total));

        Self {
            station_name: totals.station_name,
            station_address: totals.station_address,
            start_count: totals.start_count,
            return_count: totals.return_count,
            start_average: totals.start_average,
            return_average: totals.return_average,
            percentage,
        }
    }
}

impl Analytics {
    /// Number of stations.
    pub async fn station_count(&self) -> AnalyticsResult<i64> {
        let key = keys::station_count();
        let fetch = self.cache.fetch_value(&key, self.ttl.count(), || async move {
            Ok::<_, AnalyticsError>(self.store.count_stations().await?)
        });
        instrument_future(fetch, query_span("station_count", &key)).await
    }

    /// One page of stations, optionally ordered and searched.
    pub async fn list_stations(&self, params: &StationListParams) -> AnalyticsResult<Vec<Station>> {
        let key = params.cache_key();
        let fetch = self.cache.fetch_value(&key, self.ttl.listing(), || async move {
            let query = params.to_query();
            Ok::<_, AnalyticsError>(self.store.list_stations(&query).await?)
        });
        instrument_future(fetch, query_span("list_stations", &key)).await
    }

    /// Detail view of a station, `None` when it does not exist.
    ///
    /// The irregular percentage uses the configured threshold and is absent
    /// when the station has no classifiable arrivals.
    pub async fn station_summary(&self, station_id: i32) -> AnalyticsResult<Option<StationSummary>> {
        let key = keys::station(station_id);
        let threshold = self.irregular_threshold_secs;
        let fetch = self.cache.fetch(&key, self.ttl.detail(), || async move {
            let totals = self.store.station_totals(station_id, threshold).await?;
            Ok::<_, AnalyticsError>(totals.map(StationSummary::from))
        });
        instrument_future(fetch, query_span("station_summary", &key)).await
    }
}
