//! Journey counts, listings and lookups.

use super::Analytics;
use crate::cache::{keys, CacheKey};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{Journey, JourneyListing};
use crate::query::{JourneyListParams, Side, StationJourneysParams};
use tracing::debug;
use velo_common_log::spans::{instrument_future, query_span};

impl Analytics {
    /// Number of journeys.
    pub async fn journey_count(&self) -> AnalyticsResult<i64> {
        let key = keys::journey_count();
        let fetch = self.cache.fetch_value(&key, self.ttl.count(), || async move {
            Ok::<_, AnalyticsError>(self.store.count_journeys().await?)
        });
        instrument_future(fetch, query_span("journey_count", &key)).await
    }

    /// One page of journeys with station names joined in.
    pub async fn list_journeys(&self, params: &JourneyListParams) -> AnalyticsResult<Vec<JourneyListing>> {
        let key = params.cache_key();
        let fetch = self.cache.fetch_value(&key, self.ttl.listing(), || async move {
            let query = params.to_query();
            Ok::<_, AnalyticsError>(self.store.list_journeys(&query).await?)
        });
        instrument_future(fetch, query_span("list_journeys", &key)).await
    }

    /// A single journey, `None` when it does not exist.
    pub async fn journey(&self, id: i32) -> AnalyticsResult<Option<Journey>> {
        let key = keys::journey(id);
        let fetch = self.cache.fetch(&key, self.ttl.detail(), || async move {
            Ok::<_, AnalyticsError>(self.store.find_journey(id).await?)
        });
        instrument_future(fetch, query_span("journey", &key)).await
    }

    /// Journeys on one side of a station, read straight from the store.
    pub async fn station_journeys(&self, params: &StationJourneysParams) -> AnalyticsResult<Vec<Journey>> {
        debug!(
            station_id = params.station_id,
            side = ?params.side,
            "Uncached station journey listing"
        );
        Ok(self
            .store
            .station_journeys(params.station_id, params.side, params.window())
            .await?)
    }

    /// Journeys that left `station_id`, ordered by id.
    pub async fn journeys_from_station(&self, station_id: i32, skip: i64, take: i64) -> AnalyticsResult<Vec<Journey>> {
        self.station_journeys(&StationJourneysParams {
            station_id,
            side: Side::Departure,
            skip,
            take,
        })
        .await
    }

    /// Journeys that returned to `station_id`, ordered by id.
    pub async fn journeys_to_station(&self, station_id: i32, skip: i64, take: i64) -> AnalyticsResult<Vec<Journey>> {
        self.station_journeys(&StationJourneysParams {
            station_id,
            side: Side::Return,
            skip,
            take,
        })
        .await
    }
}
