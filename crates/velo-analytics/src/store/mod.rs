//! Storage query execution.
//!
//! [`JourneyStore`] has one method per query family and returns typed rows.
//! Aggregation that spans several queries (merging monthly sides, turning
//! tallies into percentages) happens in [`crate::analytics`], not here.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{Destination, Journey, JourneyListing, Station};
use crate::query::{DateRange, JourneyColumn, ListingQuery, MonthlyFlowParams, Side, StationColumn, Window};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// Store operation result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Per-station figures behind a station summary.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StationTotals {
    pub station_name: Option<String>,
    pub station_address: Option<String>,
    pub start_count: i64,
    pub return_count: i64,
    /// `AVG(distance)` of departures, as the numeric text Postgres renders.
    pub start_average: Option<String>,
    /// `AVG(distance)` of arrivals, as the numeric text Postgres renders.
    pub return_average: Option<String>,
    /// Arrivals with both timestamps and a duration recorded.
    pub classified_arrivals: i64,
    /// Classified arrivals over the irregularity threshold.
    pub irregular_arrivals: i64,
}

/// Journeys on one side of a station in one month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct MonthlyCount {
    /// First day of the month.
    pub month: NaiveDate,
    pub station_id: i32,
    pub journeys: i64,
}

/// Classified and irregular arrivals at one station.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ArrivalTally {
    pub station_id: i32,
    pub station_name: Option<String>,
    pub total: i64,
    pub irregular: i64,
}

/// Read-only access to stations and journeys.
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn count_stations(&self) -> StoreResult<i64>;

    async fn count_journeys(&self) -> StoreResult<i64>;

    async fn list_stations(&self, query: &ListingQuery<StationColumn>) -> StoreResult<Vec<Station>>;

    async fn list_journeys(&self, query: &ListingQuery<JourneyColumn>) -> StoreResult<Vec<JourneyListing>>;

    async fn find_journey(&self, id: i32) -> StoreResult<Option<Journey>>;

    /// Journeys leaving (`Side::Departure`) or returning to (`Side::Return`)
    /// a station, ordered by journey id.
    async fn station_journeys(&self, station_id: i32, side: Side, window: Window) -> StoreResult<Vec<Journey>>;

    /// Totals for one station, `None` when the station does not exist.
    async fn station_totals(&self, station_id: i32, threshold_secs: u32) -> StoreResult<Option<StationTotals>>;

    /// Departures grouped by month and departure station.
    async fn monthly_departures(&self, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>>;

    /// Arrivals grouped by month and return station.
    async fn monthly_arrivals(&self, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>>;

    /// Return stations reached from `origin`, most frequent first, ties by
    /// station id.
    async fn destination_counts(&self, origin: i32, range: &DateRange, window: Window) -> StoreResult<Vec<Destination>>;

    /// Arrival tallies per return station, ordered by station id. Stations
    /// without classified arrivals are omitted.
    async fn arrival_tallies(&self, threshold_secs: u32, range: &DateRange) -> StoreResult<Vec<ArrivalTally>>;
}
