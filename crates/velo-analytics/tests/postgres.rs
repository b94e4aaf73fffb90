//! Postgres store parity with the memory store.
//!
//! Runs only when `DATABASE_URL` is set. Tables are created as session
//! temporaries on a single connection, so the target database is untouched.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;
use velo_analytics::models::{Journey, Station};
use velo_analytics::query::{
    DateRange, Direction, JourneyListParams, MonthlyFlowParams, Side, StationListParams, Window,
};
use velo_analytics::store::{JourneyStore, MemoryStore, PgStore};

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|day| day.and_hms_opt(12, 0, 0))
        .unwrap()
}

fn day(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn journey(id: i32, from: i32, to: i32, departed: NaiveDateTime, elapsed_ms: i64, duration: i32, distance: i32) -> Journey {
    Journey {
        id,
        departure_date_time: Some(departed),
        return_date_time: Some(departed + ChronoDuration::milliseconds(elapsed_ms)),
        departure_station_id: Some(from),
        return_station_id: Some(to),
        distance: Some(distance),
        duration: Some(duration),
    }
}

fn stations() -> Vec<Station> {
    (1..=4)
        .map(|id| {
            Station::new(
                id,
                format!("Station {}", id),
                format!("Address {}", id),
                format!("24.9{:02}", id),
                format!("60.1{:02}", id),
            )
        })
        .collect()
}

fn journeys() -> Vec<Journey> {
    vec![
        journey(1, 1, 2, at(2021, 3, 4), 600_000, 600, i32::MAX),
        journey(2, 1, 2, at(2021, 3, 9), 900_000, 100, i32::MAX),
        journey(3, 1, 2, at(2021, 5, 1), 300_900, 0, i32::MAX - 1),
        journey(4, 1, 3, at(2021, 5, 2), 300_000, 0, 1),
        journey(5, 2, 1, at(2021, 6, 30), 420_000, 420, 2),
        journey(6, 3, 1, at(2021, 7, 1), 1_000, 1, 2),
        Journey {
            id: 7,
            departure_date_time: Some(at(2021, 7, 2)),
            return_date_time: None,
            departure_station_id: Some(3),
            return_station_id: Some(1),
            distance: None,
            duration: Some(60),
        },
    ]
}

async fn pg_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("DATABASE_URL is set but unreachable");

    sqlx::query(
        "CREATE TEMP TABLE station (id integer PRIMARY KEY, station_name text, \
         station_address text, coordinate_x text, coordinate_y text)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TEMP TABLE journey (id integer PRIMARY KEY, departure_date_time timestamp, \
         return_date_time timestamp, departure_station_id integer, return_station_id integer, \
         distance integer, duration integer)",
    )
    .execute(&pool)
    .await
    .unwrap();

    for s in stations() {
        sqlx::query("INSERT INTO station VALUES ($1, $2, $3, $4, $5)")
            .bind(s.id)
            .bind(s.station_name)
            .bind(s.station_address)
            .bind(s.coordinate_x)
            .bind(s.coordinate_y)
            .execute(&pool)
            .await
            .unwrap();
    }
    for j in journeys() {
        sqlx::query("INSERT INTO journey VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(j.id)
            .bind(j.departure_date_time)
            .bind(j.return_date_time)
            .bind(j.departure_station_id)
            .bind(j.return_station_id)
            .bind(j.distance)
            .bind(j.duration)
            .execute(&pool)
            .await
            .unwrap();
    }

    Some(PgStore::new(pool))
}

fn memory_store() -> MemoryStore {
    MemoryStore::with_data(stations(), journeys())
}

#[tokio::test]
async fn test_listings_match_memory_store() {
    let Some(pg) = pg_store().await else {
        return;
    };
    let mem = memory_store();

    assert_eq!(pg.count_stations().await.unwrap(), mem.count_stations().await.unwrap());
    assert_eq!(pg.count_journeys().await.unwrap(), mem.count_journeys().await.unwrap());

    let mut stations = StationListParams::new(0, 3).with_search("2");
    stations.id = Some(Direction::Desc);
    assert_eq!(
        pg.list_stations(&stations.to_query()).await.unwrap(),
        mem.list_stations(&stations.to_query()).await.unwrap()
    );

    let mut journeys = JourneyListParams::new(-1, -1).with_search("2021-05-01");
    journeys.id = Some(Direction::Asc);
    assert_eq!(
        pg.list_journeys(&journeys.to_query()).await.unwrap(),
        mem.list_journeys(&journeys.to_query()).await.unwrap()
    );

    let window = Window {
        offset: Some(1),
        limit: Some(2),
    };
    assert_eq!(
        pg.station_journeys(1, Side::Departure, window).await.unwrap(),
        mem.station_journeys(1, Side::Departure, window).await.unwrap()
    );
    assert_eq!(pg.find_journey(7).await.unwrap(), mem.find_journey(7).await.unwrap());
}

#[tokio::test]
async fn test_station_totals_match_memory_store() {
    let Some(pg) = pg_store().await else {
        return;
    };
    let mem = memory_store();

    for id in 1..=4 {
        assert_eq!(
            pg.station_totals(id, 300).await.unwrap(),
            mem.station_totals(id, 300).await.unwrap(),
            "station {}",
            id
        );
    }

    let totals = pg.station_totals(2, 300).await.unwrap().unwrap();
    assert_eq!(totals.return_average.as_deref(), Some("2147483646.66666667"));
    assert_eq!(totals.irregular_arrivals, 2);
    assert!(pg.station_totals(99, 300).await.unwrap().is_none());
}

#[tokio::test]
async fn test_aggregations_match_memory_store() {
    let Some(pg) = pg_store().await else {
        return;
    };
    let mem = memory_store();

    let scopes = [
        MonthlyFlowParams::default(),
        MonthlyFlowParams::default().between(day(2021, 3, 20), day(2021, 6, 1)),
        MonthlyFlowParams::for_station(1).between(None, day(2021, 5, 31)),
    ];
    for scope in &scopes {
        assert_eq!(
            pg.monthly_departures(scope).await.unwrap(),
            mem.monthly_departures(scope).await.unwrap()
        );
        assert_eq!(
            pg.monthly_arrivals(scope).await.unwrap(),
            mem.monthly_arrivals(scope).await.unwrap()
        );
    }

    let ranges = [
        DateRange::default(),
        DateRange::new(day(2021, 3, 9), day(2021, 5, 1)),
        DateRange::new(day(2021, 7, 1), None),
    ];
    for range in &ranges {
        assert_eq!(
            pg.destination_counts(1, range, Window::ALL).await.unwrap(),
            mem.destination_counts(1, range, Window::ALL).await.unwrap()
        );
        for threshold in [0, 300, 600] {
            assert_eq!(
                pg.arrival_tallies(threshold, range).await.unwrap(),
                mem.arrival_tallies(threshold, range).await.unwrap()
            );
        }
    }

    let page = Window {
        offset: Some(1),
        limit: Some(1),
    };
    assert_eq!(
        pg.destination_counts(1, &DateRange::default(), page).await.unwrap(),
        mem.destination_counts(1, &DateRange::default(), page).await.unwrap()
    );
}
