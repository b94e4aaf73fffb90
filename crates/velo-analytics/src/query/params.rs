//! Parameter records for each cached query family.
//!
//! Every record lists its parameters in the order they appear in the cache
//! key, and every parameter is always written to the key.

use super::page::{DateRange, Page, Window};
use super::search::SearchTerm;
use super::sort::{ordering, Direction, JourneyColumn, StationColumn};
use super::{ListingQuery, Side};
use crate::cache::key::{CacheKey, CacheKeyBuilder};
use chrono::NaiveDate;

/// Station listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationListParams {
    pub skip: i64,
    pub take: i64,
    pub id: Option<Direction>,
    pub name: Option<Direction>,
    pub address: Option<Direction>,
    pub x: Option<Direction>,
    pub y: Option<Direction>,
    pub search: Option<String>,
}

impl StationListParams {
    /// Page `skip` of `take` stations, unsorted and unfiltered.
    pub fn new(skip: i64, take: i64) -> Self {
        Self {
            skip,
            take,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(&self) -> Page {
        Page::from_skip_take(self.skip, self.take)
    }

    pub fn to_query(&self) -> ListingQuery<StationColumn> {
        ListingQuery {
            window: self.page().window(),
            order: ordering(&[
                (StationColumn::Id, self.id),
                (StationColumn::Name, self.name),
                (StationColumn::Address, self.address),
                (StationColumn::X, self.x),
                (StationColumn::Y, self.y),
            ]),
            filter: self
                .search
                .as_deref()
                .map(|s| SearchTerm::parse(s).station_predicates()),
        }
    }
}

impl CacheKey for StationListParams {
    fn cache_key(&self) -> String {
        CacheKeyBuilder::new("stations:")
            .param("skip", &self.skip)
            .param("take", &self.take)
            .param("id", &self.id)
            .param("name", &self.name)
            .param("address", &self.address)
            .param("x", &self.x)
            .param("y", &self.y)
            .param("search", &self.search)
            .build()
    }
}

/// Journey listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JourneyListParams {
    pub skip: i64,
    pub take: i64,
    pub id: Option<Direction>,
    pub departure_time: Option<Direction>,
    pub return_time: Option<Direction>,
    pub distance: Option<Direction>,
    pub duration: Option<Direction>,
    pub search: Option<String>,
}

impl JourneyListParams {
    /// Page `skip` of `take` journeys, unsorted and unfiltered.
    pub fn new(skip: i64, take: i64) -> Self {
        Self {
            skip,
            take,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(&self) -> Page {
        Page::from_skip_take(self.skip, self.take)
    }

    pub fn to_query(&self) -> ListingQuery<JourneyColumn> {
        ListingQuery {
            window: self.page().window(),
            order: ordering(&[
                (JourneyColumn::Id, self.id),
                (JourneyColumn::DepartureTime, self.departure_time),
                (JourneyColumn::ReturnTime, self.return_time),
                (JourneyColumn::Distance, self.distance),
                (JourneyColumn::Duration, self.duration),
            ]),
            filter: self
                .search
                .as_deref()
                .map(|s| SearchTerm::parse(s).journey_predicates()),
        }
    }
}

impl CacheKey for JourneyListParams {
    fn cache_key(&self) -> String {
        CacheKeyBuilder::new("journeys:")
            .param("skip", &self.skip)
            .param("take", &self.take)
            .param("id", &self.id)
            .param("dTime", &self.departure_time)
            .param("rTime", &self.return_time)
            .param("distance", &self.distance)
            .param("duration", &self.duration)
            .param("search", &self.search)
            .build()
    }
}

/// Scope of a monthly departure/arrival count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonthlyFlowParams {
    /// Restrict to one station; every station when unset.
    pub station_id: Option<i32>,
    /// First month included.
    pub month_start: Option<NaiveDate>,
    /// Last month included.
    pub month_end: Option<NaiveDate>,
}

impl MonthlyFlowParams {
    pub fn for_station(station_id: i32) -> Self {
        Self {
            station_id: Some(station_id),
            ..Self::default()
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.month_start = start;
        self.month_end = end;
        self
    }

    /// The month range with both ends truncated to the first of the month.
    pub fn months(&self) -> DateRange {
        DateRange::new(self.month_start, self.month_end).to_months()
    }
}

impl CacheKey for MonthlyFlowParams {
    fn cache_key(&self) -> String {
        let namespace = match self.station_id {
            Some(id) => format!("station:{}/journey-count?", id),
            None => "stations:journey-count?".to_string(),
        };
        CacheKeyBuilder::new(&namespace)
            .param("monthStart", &self.month_start)
            .param("monthEnd", &self.month_end)
            .build()
    }
}

/// Ranked destinations from one origin station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationParams {
    pub station_id: i32,
    pub skip: i64,
    pub take: i64,
    /// First departure day included.
    pub start_date: Option<NaiveDate>,
    /// Last departure day included.
    pub end_date: Option<NaiveDate>,
}

impl DestinationParams {
    /// Every destination of `station_id`, over all time.
    pub fn new(station_id: i32) -> Self {
        Self {
            station_id,
            skip: -1,
            take: -1,
            start_date: None,
            end_date: None,
        }
    }

    pub fn paged(mut self, skip: i64, take: i64) -> Self {
        self.skip = skip;
        self.take = take;
        self
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn window(&self) -> Window {
        Page::from_skip_take(self.skip, self.take).window()
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

impl CacheKey for DestinationParams {
    fn cache_key(&self) -> String {
        CacheKeyBuilder::new("stations:popular_destination?")
            .param("id", &self.station_id)
            .param("skip", &self.skip)
            .param("take", &self.take)
            .param("startDate", &self.start_date)
            .param("endDate", &self.end_date)
            .build()
    }
}

/// Irregular-journey percentages across all stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrregularParams {
    /// Allowed deviation in seconds before a journey counts as irregular.
    pub threshold_secs: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl IrregularParams {
    pub fn new(threshold_secs: u32) -> Self {
        Self {
            threshold_secs,
            start_date: None,
            end_date: None,
        }
    }

    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }
}

impl CacheKey for IrregularParams {
    fn cache_key(&self) -> String {
        CacheKeyBuilder::new("stations:irregular_journey_percentage?")
            .param("threshold", &self.threshold_secs)
            .param("startDate", &self.start_date)
            .param("endDate", &self.end_date)
            .build()
    }
}

/// Journeys leaving from or returning to one station. Not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationJourneysParams {
    pub station_id: i32,
    pub side: Side,
    pub skip: i64,
    pub take: i64,
}

impl StationJourneysParams {
    pub fn window(&self) -> Window {
        Page::from_skip_take(self.skip, self.take).window()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::UNSET;
    use crate::query::Predicate;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_station_listing_key_defaults() {
        assert_eq!(
            StationListParams::new(0, 10).cache_key(),
            "stations:skip=0&take=10&id=undefined&name=undefined&address=undefined&x=undefined&y=undefined&search=undefined"
        );
    }

    #[test]
    fn test_station_listing_key_with_sort_and_search() {
        let params = StationListParams {
            name: Some(Direction::Desc),
            address: Some(Direction::Asc),
            ..StationListParams::new(0, 10)
        }
        .with_search("Station 1");

        assert_eq!(
            params.cache_key(),
            "stations:skip=0&take=10&id=undefined&name=DESC&address=ASC&x=undefined&y=undefined&search=Station 1"
        );
    }

    #[test]
    fn test_journey_listing_key() {
        let params = JourneyListParams {
            distance: Some(Direction::Asc),
            duration: Some(Direction::Desc),
            ..JourneyListParams::new(2, -1)
        };
        assert_eq!(
            params.cache_key(),
            "journeys:skip=2&take=-1&id=undefined&dTime=undefined&rTime=undefined&distance=ASC&duration=DESC&search=undefined"
        );
    }

    #[test]
    fn test_monthly_flow_keys() {
        let params = MonthlyFlowParams::for_station(1).between(Some(day(2023, 1, 1)), None);
        assert_eq!(
            params.cache_key(),
            "station:1/journey-count?monthStart=2023-01-01&monthEnd=undefined"
        );
        assert_eq!(
            MonthlyFlowParams::default().cache_key(),
            "stations:journey-count?monthStart=undefined&monthEnd=undefined"
        );
    }

    #[test]
    fn test_destination_key_includes_page() {
        let params = DestinationParams::new(1)
            .paged(0, 2)
            .between(Some(day(2023, 1, 1)), Some(day(2023, 1, 31)));
        assert_eq!(
            params.cache_key(),
            "stations:popular_destination?id=1&skip=0&take=2&startDate=2023-01-01&endDate=2023-01-31"
        );
        assert_ne!(params.cache_key(), params.paged(1, 2).cache_key());
    }

    #[test]
    fn test_irregular_key() {
        let params = IrregularParams::new(1000).between(Some(day(2023, 1, 1)), Some(day(2023, 1, 31)));
        assert_eq!(
            params.cache_key(),
            "stations:irregular_journey_percentage?threshold=1000&startDate=2023-01-01&endDate=2023-01-31"
        );
    }

    #[test]
    fn test_station_query_resolution() {
        let params = StationListParams {
            name: Some(Direction::Desc),
            ..StationListParams::new(2, 5)
        }
        .with_search("123");
        let query = params.to_query();

        assert_eq!(query.window, Window { offset: Some(10), limit: Some(5) });
        assert_eq!(query.order, vec![(StationColumn::Name, Direction::Desc)]);
        let filter = query.filter.unwrap();
        assert_eq!(filter[0], Predicate::Equals(StationColumn::Id, 123));
        assert_eq!(filter.len(), 5);
    }

    #[test]
    fn test_unbounded_journey_query() {
        let query = JourneyListParams::new(2, -1).to_query();
        assert_eq!(query.window, Window { offset: Some(2), limit: None });
        assert!(query.order.is_empty());
        assert!(query.filter.is_none());
    }

    #[test]
    fn test_literal_undefined_search_shares_unset_key() {
        let unset = StationListParams::new(0, 10);
        let literal = StationListParams::new(0, 10).with_search(UNSET);
        assert_ne!(unset, literal);
        assert_eq!(unset.cache_key(), literal.cache_key());

        let unset = JourneyListParams::new(0, 10);
        let literal = JourneyListParams::new(0, 10).with_search("undefined");
        assert_eq!(unset.cache_key(), literal.cache_key());

        let other = StationListParams::new(0, 10).with_search("undefinedx");
        assert_ne!(other.cache_key(), StationListParams::new(0, 10).cache_key());
    }

    fn direction() -> impl Strategy<Value = Option<Direction>> {
        prop_oneof![Just(None), Just(Some(Direction::Asc)), Just(Some(Direction::Desc))]
    }

    prop_compose! {
        fn station_params()(
            skip in -1i64..50,
            take in -1i64..50,
            id in direction(),
            name in direction(),
            address in direction(),
            x in direction(),
            y in direction(),
            search in proptest::option::of("[a-zA-Z0-9 ]{0,12}"),
        ) -> StationListParams {
            StationListParams { skip, take, id, name, address, x, y, search }
        }
    }

    proptest! {
        #[test]
        fn test_station_key_is_deterministic(params in station_params()) {
            prop_assert_eq!(params.cache_key(), params.clone().cache_key());
        }

        #[test]
        fn test_station_key_separates_distinct_params(a in station_params(), b in station_params()) {
            // A literal "undefined" search collides with an unset one.
            prop_assume!(a.search.as_deref() != Some(UNSET) && b.search.as_deref() != Some(UNSET));
            prop_assert_eq!(a == b, a.cache_key() == b.cache_key());
        }

        #[test]
        fn test_irregular_key_separates_thresholds(t1 in 0u32..5000, t2 in 0u32..5000) {
            let a = IrregularParams::new(t1).cache_key();
            let b = IrregularParams::new(t2).cache_key();
            prop_assert_eq!(t1 == t2, a == b);
        }
    }
}
