//! In-memory store.
//!
//! Evaluates every query family over rows held in process. Used by tests and
//! by the CLI's `--seed` mode. Null ordering follows Postgres: nulls sort last
//! ascending and first descending.

use super::{ArrivalTally, JourneyStore, MonthlyCount, StationTotals, StoreError, StoreResult};
use crate::analytics::destinations::rank_destinations;
use crate::models::{Destination, Journey, JourneyListing, Station};
use crate::query::page::month_of;
use crate::query::{
    DateRange, Direction, JourneyColumn, ListingQuery, MonthlyFlowParams, Predicate, Side, StationColumn,
    Window,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

#[derive(Default, Deserialize)]
struct Dataset {
    #[serde(default, deserialize_with = "stations_by_id")]
    stations: BTreeMap<i32, Station>,
    #[serde(default)]
    journeys: Vec<Journey>,
}

fn stations_by_id<'de, D>(deserializer: D) -> Result<BTreeMap<i32, Station>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let stations = Vec::<Station>::deserialize(deserializer)?;
    Ok(stations.into_iter().map(|s| (s.id, s)).collect())
}

/// Store holding stations and journeys in memory.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
    queries: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(stations: impl IntoIterator<Item = Station>, journeys: impl IntoIterator<Item = Journey>) -> Self {
        let store = Self::new();
        {
            let mut data = store.data.write();
            data.stations = stations.into_iter().map(|s| (s.id, s)).collect();
            data.journeys = journeys.into_iter().collect();
        }
        store
    }

    /// Load a `{"stations": [...], "journeys": [...]}` document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let data: Dataset = serde_json::from_str(json)?;
        Ok(Self {
            data: RwLock::new(data),
            ..Self::default()
        })
    }

    pub fn insert_station(&self, station: Station) {
        self.data.write().stations.insert(station.id, station);
    }

    pub fn insert_journey(&self, journey: Journey) {
        self.data.write().journeys.push(journey);
    }

    /// Number of queries served so far, failed ones included.
    pub fn query_count(&self) -> usize {
        self.queries.load(AtomicOrdering::SeqCst)
    }

    /// Make every following query fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, AtomicOrdering::SeqCst);
    }

    fn begin(&self) -> StoreResult<()> {
        self.queries.fetch_add(1, AtomicOrdering::SeqCst);
        if self.failing.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        Ok(())
    }
}

/// A column value as seen by predicates and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Cell<'a> {
    Int(Option<i64>),
    Text(Option<&'a str>),
    Time(Option<NaiveDateTime>),
}

impl Cell<'_> {
    fn is_null(&self) -> bool {
        matches!(self, Cell::Int(None) | Cell::Text(None) | Cell::Time(None))
    }
}

trait Row<C> {
    fn cell(&self, column: C) -> Cell<'_>;
}

impl Row<StationColumn> for Station {
    fn cell(&self, column: StationColumn) -> Cell<'_> {
        match column {
            StationColumn::Id => Cell::Int(Some(i64::from(self.id))),
            StationColumn::Name => Cell::Text(self.station_name.as_deref()),
            StationColumn::Address => Cell::Text(self.station_address.as_deref()),
            StationColumn::X => Cell::Text(self.coordinate_x.as_deref()),
            StationColumn::Y => Cell::Text(self.coordinate_y.as_deref()),
        }
    }
}

impl Row<JourneyColumn> for JourneyListing {
    fn cell(&self, column: JourneyColumn) -> Cell<'_> {
        let j = &self.journey;
        match column {
            JourneyColumn::Id => Cell::Int(Some(i64::from(j.id))),
            JourneyColumn::DepartureTime => Cell::Time(j.departure_date_time),
            JourneyColumn::ReturnTime => Cell::Time(j.return_date_time),
            JourneyColumn::Distance => Cell::Int(j.distance.map(i64::from)),
            JourneyColumn::Duration => Cell::Int(j.duration.map(i64::from)),
        }
    }
}

fn satisfies<C: Copy, R: Row<C>>(row: &R, predicate: &Predicate<C>) -> bool {
    match predicate {
        Predicate::Equals(column, n) => row.cell(*column) == Cell::Int(Some(*n)),
        Predicate::Contains(column, term) => {
            matches!(row.cell(*column), Cell::Text(Some(text)) if text.contains(term.as_str()))
        }
        Predicate::OnDay(column, day) => {
            matches!(row.cell(*column), Cell::Time(Some(at)) if at.date() == *day)
        }
        Predicate::At(column, at) => row.cell(*column) == Cell::Time(Some(*at)),
    }
}

fn compare<C: Copy, R: Row<C>>(a: &R, b: &R, order: &[(C, Direction)]) -> Ordering {
    for (column, direction) in order {
        let (x, y) = (a.cell(*column), b.cell(*column));
        let ordering = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.cmp(&y),
        };
        let ordering = match direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn run_listing<C: Copy, R: Row<C>>(rows: Vec<R>, query: &ListingQuery<C>) -> Vec<R> {
    let mut rows: Vec<R> = match &query.filter {
        None => rows,
        Some(predicates) => rows
            .into_iter()
            .filter(|row| predicates.iter().any(|p| satisfies(row, p)))
            .collect(),
    };
    rows.sort_by(|a, b| compare(a, b, &query.order));
    query.window.apply(rows)
}

/// Whether a journey departed within `range`. An open range admits journeys
/// without a departure time.
fn departed_within(journey: &Journey, range: &DateRange) -> bool {
    if range.start.is_none() && range.end.is_none() {
        return true;
    }
    journey
        .departure_date_time
        .map_or(false, |at| range.contains(at.date()))
}

/// Most significant base-10000 digit of `value` and its position.
fn leading_group(value: u128) -> (i32, u128) {
    let (mut weight, mut lead) = (0, value);
    while lead >= 10_000 {
        lead /= 10_000;
        weight += 1;
    }
    (weight, lead)
}

/// Decimal places Postgres keeps when dividing two integers as `numeric`:
/// at least 16 significant digits, never fewer than zero places.
fn division_scale(dividend: u128, divisor: u128) -> usize {
    let (w1, d1) = leading_group(dividend);
    let (w2, d2) = leading_group(divisor);
    let mut weight = w1 - w2;
    if d1 <= d2 {
        weight -= 1;
    }
    (16 - weight * 4).clamp(0, 1000) as usize
}

/// `AVG` over an integer column, rendered the way Postgres prints the
/// resulting `numeric`. Rounds half away from zero in the last place.
fn numeric_avg(values: impl Iterator<Item = i32>) -> Option<String> {
    let (sum, count) = values.fold((0i128, 0u128), |(sum, count), v| (sum + i128::from(v), count + 1));
    if count == 0 {
        return None;
    }

    let dividend = sum.unsigned_abs();
    let scale = division_scale(dividend, count);
    let mut whole = dividend / count;
    let mut rem = dividend % count;
    let mut digits = Vec::with_capacity(scale);
    for _ in 0..scale {
        rem *= 10;
        digits.push((rem / count) as u8);
        rem %= count;
    }

    if rem * 2 >= count {
        let mut carry = true;
        for digit in digits.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            whole += 1;
        }
    }

    let negative = sum < 0 && (whole > 0 || digits.iter().any(|d| *d > 0));
    let mut out = String::with_capacity(scale + 24);
    if negative {
        out.push('-');
    }
    out.push_str(&whole.to_string());
    if scale > 0 {
        out.push('.');
        out.extend(digits.iter().map(|d| char::from(b'0' + d)));
    }
    Some(out)
}

impl MemoryStore {
    fn monthly(&self, side: Side, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>> {
        self.begin()?;
        let data = self.data.read();
        let months = scope.months();

        let mut counts: BTreeMap<(NaiveDate, i32), i64> = BTreeMap::new();
        for journey in &data.journeys {
            let (at, station) = match side {
                Side::Departure => (journey.departure_date_time, journey.departure_station_id),
                Side::Return => (journey.return_date_time, journey.return_station_id),
            };
            let (Some(at), Some(station)) = (at, station) else {
                continue;
            };
            if scope.station_id.map_or(false, |id| id != station) {
                continue;
            }
            let month = month_of(at.date());
            if !months.contains(month) {
                continue;
            }
            *counts.entry((month, station)).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|((month, station_id), journeys)| MonthlyCount {
                month,
                station_id,
                journeys,
            })
            .collect())
    }
}

#[async_trait]
impl JourneyStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn count_stations(&self) -> StoreResult<i64> {
        self.begin()?;
        Ok(self.data.read().stations.len() as i64)
    }

    async fn count_journeys(&self) -> StoreResult<i64> {
        self.begin()?;
        Ok(self.data.read().journeys.len() as i64)
    }

    async fn list_stations(&self, query: &ListingQuery<StationColumn>) -> StoreResult<Vec<Station>> {
        self.begin()?;
        let rows: Vec<Station> = self.data.read().stations.values().cloned().collect();
        Ok(run_listing(rows, query))
    }

    async fn list_journeys(&self, query: &ListingQuery<JourneyColumn>) -> StoreResult<Vec<JourneyListing>> {
        self.begin()?;
        let data = self.data.read();
        let name_of = |id: Option<i32>| {
            id.and_then(|id| data.stations.get(&id))
                .and_then(|s| s.station_name.clone())
        };
        let rows: Vec<JourneyListing> = data
            .journeys
            .iter()
            .map(|j| JourneyListing {
                journey: j.clone(),
                departure_station_name: name_of(j.departure_station_id),
                return_station_name: name_of(j.return_station_id),
            })
            .collect();
        Ok(run_listing(rows, query))
    }

    async fn find_journey(&self, id: i32) -> StoreResult<Option<Journey>> {
        self.begin()?;
        Ok(self.data.read().journeys.iter().find(|j| j.id == id).cloned())
    }

    async fn station_journeys(&self, station_id: i32, side: Side, window: Window) -> StoreResult<Vec<Journey>> {
        self.begin()?;
        let data = self.data.read();
        let mut rows: Vec<Journey> = data
            .journeys
            .iter()
            .filter(|j| {
                let station = match side {
                    Side::Departure => j.departure_station_id,
                    Side::Return => j.return_station_id,
                };
                station == Some(station_id)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|j| j.id);
        Ok(window.apply(rows))
    }

    async fn station_totals(&self, station_id: i32, threshold_secs: u32) -> StoreResult<Option<StationTotals>> {
        self.begin()?;
        let data = self.data.read();
        let Some(station) = data.stations.get(&station_id) else {
            return Ok(None);
        };

        let departures: Vec<&Journey> = data
            .journeys
            .iter()
            .filter(|j| j.departure_station_id == Some(station_id))
            .collect();
        let arrivals: Vec<&Journey> = data
            .journeys
            .iter()
            .filter(|j| j.return_station_id == Some(station_id))
            .collect();
        let classified: Vec<&&Journey> = arrivals.iter().filter(|j| j.is_classifiable()).collect();

        Ok(Some(StationTotals {
            station_name: station.station_name.clone(),
            station_address: station.station_address.clone(),
            start_count: departures.len() as i64,
            return_count: arrivals.len() as i64,
            start_average: numeric_avg(departures.iter().filter_map(|j| j.distance)),
            return_average: numeric_avg(arrivals.iter().filter_map(|j| j.distance)),
            classified_arrivals: classified.len() as i64,
            irregular_arrivals: classified
                .iter()
                .filter(|j| j.is_irregular(threshold_secs))
                .count() as i64,
        }))
    }

    async fn monthly_departures(&self, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>> {
        self.monthly(Side::Departure, scope)
    }

    async fn monthly_arrivals(&self, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>> {
        self.monthly(Side::Return, scope)
    }

    async fn destination_counts(&self, origin: i32, range: &DateRange, window: Window) -> StoreResult<Vec<Destination>> {
        self.begin()?;
        let data = self.data.read();

        let mut counts: HashMap<i32, i64> = HashMap::new();
        for journey in &data.journeys {
            if journey.departure_station_id != Some(origin) || !departed_within(journey, range) {
                continue;
            }
            if let Some(destination) = journey.return_station_id {
                *counts.entry(destination).or_default() += 1;
            }
        }

        let destinations = counts
            .into_iter()
            .filter_map(|(id, journey_count)| {
                data.stations.get(&id).map(|station| Destination {
                    station: station.clone(),
                    journey_count,
                })
            })
            .collect();

        Ok(window.apply(rank_destinations(destinations)))
    }

    async fn arrival_tallies(&self, threshold_secs: u32, range: &DateRange) -> StoreResult<Vec<ArrivalTally>> {
        self.begin()?;
        let data = self.data.read();

        let mut tallies: BTreeMap<i32, (i64, i64)> = BTreeMap::new();
        for journey in &data.journeys {
            let Some(station) = journey.return_station_id else {
                continue;
            };
            if !journey.is_classifiable() || !departed_within(journey, range) {
                continue;
            }
            let tally = tallies.entry(station).or_default();
            tally.0 += 1;
            if journey.is_irregular(threshold_secs) {
                tally.1 += 1;
            }
        }

        Ok(tallies
            .into_iter()
            .map(|(station_id, (total, irregular))| ArrivalTally {
                station_id,
                station_name: data
                    .stations
                    .get(&station_id)
                    .and_then(|s| s.station_name.clone()),
                total,
                irregular,
            })
            .collect())
    }
}
