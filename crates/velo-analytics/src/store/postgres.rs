//! PostgreSQL store.

use super::{ArrivalTally, JourneyStore, MonthlyCount, StationTotals, StoreError, StoreResult};
use crate::db::instrumentation::QueryTimer;
use crate::models::{Destination, Journey, JourneyListing, Station};
use crate::query::{
    DateRange, Direction, JourneyColumn, ListingQuery, MonthlyFlowParams, Predicate, Side, StationColumn,
    Window,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::instrument;
use velo_common_log::spans::{instrument_future, store_span};

const STATION_COLUMNS: &str = "id, station_name, station_address, coordinate_x, coordinate_y";

const JOURNEY_COLUMNS: &str =
    "id, departure_date_time, return_date_time, departure_station_id, return_station_id, distance, duration";

const JOURNEY_LISTING: &str = "SELECT j.id, j.departure_date_time, j.return_date_time, \
     j.departure_station_id, j.return_station_id, j.distance, j.duration, \
     ds.station_name AS departure_station_name, rs.station_name AS return_station_name \
     FROM journey j \
     LEFT JOIN station ds ON ds.id = j.departure_station_id \
     LEFT JOIN station rs ON rs.id = j.return_station_id";

const CLASSIFIED: &str =
    "j.departure_date_time IS NOT NULL AND j.return_date_time IS NOT NULL AND j.duration IS NOT NULL";

const DEVIATION: &str = "ABS(EXTRACT(EPOCH FROM (j.return_date_time - j.departure_date_time)) - j.duration)";

/// Postgres SQLSTATE for a cancelled statement.
const QUERY_CANCELED: &str = "57014";

/// Store backed by a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    slow_query_threshold: Duration,
    statement_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            slow_query_threshold: Duration::from_millis(1000),
            statement_timeout: Duration::from_secs(30),
        }
    }

    /// Queries slower than `threshold` are logged at warn.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Reported in [`StoreError::Timeout`] when a statement is cancelled.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn timed<T, F>(&self, label: &'static str, query: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let timer = QueryTimer::new(label, self.slow_query_threshold);
        let result = instrument_future(query, store_span("postgres", label)).await;
        timer.finish();
        result.map_err(|e| self.map_error(e))
    }

    fn map_error(&self, e: sqlx::Error) -> StoreError {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(e.to_string()),
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                StoreError::Timeout(self.statement_timeout)
            }
            other => StoreError::Database(other),
        }
    }
}

trait SqlColumn: Copy {
    fn sql(&self) -> &'static str;
}

impl SqlColumn for StationColumn {
    fn sql(&self) -> &'static str {
        StationColumn::sql(self)
    }
}

impl SqlColumn for JourneyColumn {
    fn sql(&self) -> &'static str {
        JourneyColumn::sql(self)
    }
}

fn bound(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Escape `LIKE` wildcards so the term matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filter<C: SqlColumn>(qb: &mut QueryBuilder<'_, Postgres>, filter: &Option<Vec<Predicate<C>>>) {
    let Some(predicates) = filter else {
        return;
    };
    if predicates.is_empty() {
        qb.push(" WHERE FALSE");
        return;
    }

    qb.push(" WHERE (");
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        match predicate {
            Predicate::Equals(column, n) => {
                qb.push(column.sql()).push(" = ").push_bind(*n);
            }
            Predicate::Contains(column, term) => {
                qb.push(column.sql())
                    .push(" LIKE ")
                    .push_bind(like_pattern(term))
                    .push(" ESCAPE '\\'");
            }
            Predicate::OnDay(column, day) => {
                qb.push(column.sql()).push("::date = ").push_bind(*day);
            }
            Predicate::At(column, at) => {
                qb.push(column.sql()).push(" = ").push_bind(*at);
            }
        }
    }
    qb.push(")");
}

fn push_order<C: SqlColumn>(qb: &mut QueryBuilder<'_, Postgres>, order: &[(C, Direction)]) {
    for (i, (column, direction)) in order.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(column.sql()).push(" ").push(direction.as_sql());
    }
}

fn push_window(qb: &mut QueryBuilder<'_, Postgres>, window: Window) {
    if let Some(limit) = window.limit {
        qb.push(" LIMIT ").push_bind(bound(limit));
    }
    if let Some(offset) = window.offset {
        qb.push(" OFFSET ").push_bind(bound(offset));
    }
}

fn push_departure_range(qb: &mut QueryBuilder<'_, Postgres>, range: &DateRange) {
    if let Some(start) = range.start {
        qb.push(" AND j.departure_date_time::date >= ").push_bind(start);
    }
    if let Some(end) = range.end {
        qb.push(" AND j.departure_date_time::date <= ").push_bind(end);
    }
}

fn station_totals_sql() -> String {
    format!(
        "SELECT s.station_name, s.station_address, \
         (SELECT COUNT(*) FROM journey j WHERE j.departure_station_id = s.id) AS start_count, \
         (SELECT COUNT(*) FROM journey j WHERE j.return_station_id = s.id) AS return_count, \
         (SELECT AVG(j.distance)::text FROM journey j WHERE j.departure_station_id = s.id) AS start_average, \
         (SELECT AVG(j.distance)::text FROM journey j WHERE j.return_station_id = s.id) AS return_average, \
         (SELECT COUNT(*) FROM journey j WHERE j.return_station_id = s.id AND {classified}) AS classified_arrivals, \
         (SELECT COUNT(*) FROM journey j WHERE j.return_station_id = s.id AND {classified} \
          AND {deviation} > $2) AS irregular_arrivals \
         FROM station s WHERE s.id = $1",
        classified = CLASSIFIED,
        deviation = DEVIATION,
    )
}

/// Journeys per (month, station) on one side, months truncated to their first day.
fn monthly_query(side: Side, scope: &MonthlyFlowParams) -> QueryBuilder<'static, Postgres> {
    let (time, station) = match side {
        Side::Departure => ("j.departure_date_time", "j.departure_station_id"),
        Side::Return => ("j.return_date_time", "j.return_station_id"),
    };
    let month = format!("date_trunc('month', {})::date", time);

    let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
    qb.push(&month)
        .push(" AS month, ")
        .push(station)
        .push(" AS station_id, COUNT(*) AS journeys FROM journey j WHERE ")
        .push(time)
        .push(" IS NOT NULL AND ")
        .push(station)
        .push(" IS NOT NULL");

    if let Some(id) = scope.station_id {
        qb.push(" AND ").push(station).push(" = ").push_bind(id);
    }
    let months = scope.months();
    if let Some(start) = months.start {
        qb.push(" AND ").push(&month).push(" >= ").push_bind(start);
    }
    if let Some(end) = months.end {
        qb.push(" AND ").push(&month).push(" <= ").push_bind(end);
    }
    qb.push(" GROUP BY 1, 2 ORDER BY 1, 2");
    qb
}

fn destination_query(origin: i32, range: &DateRange, window: Window) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(
        "SELECT s.id, s.station_name, s.station_address, s.coordinate_x, s.coordinate_y, \
         COUNT(*) AS journey_count \
         FROM journey j JOIN station s ON s.id = j.return_station_id \
         WHERE j.departure_station_id = ",
    );
    qb.push_bind(origin);
    push_departure_range(&mut qb, range);
    qb.push(" GROUP BY s.id ORDER BY journey_count DESC, s.id ASC");
    push_window(&mut qb, window);
    qb
}

fn arrival_tally_query(threshold_secs: u32, range: &DateRange) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT j.return_station_id AS station_id, s.station_name, COUNT(*) AS total, \
         COUNT(*) FILTER (WHERE {} > ",
        DEVIATION
    ));
    qb.push_bind(i64::from(threshold_secs));
    qb.push(format!(
        ") AS irregular \
         FROM journey j LEFT JOIN station s ON s.id = j.return_station_id \
         WHERE j.return_station_id IS NOT NULL AND {}",
        CLASSIFIED
    ));
    push_departure_range(&mut qb, range);
    qb.push(" GROUP BY j.return_station_id, s.station_name ORDER BY j.return_station_id");
    qb
}

impl PgStore {
    async fn monthly(&self, side: Side, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>> {
        let mut qb = monthly_query(side, scope);
        let label = match side {
            Side::Departure => "monthly_departures",
            Side::Return => "monthly_arrivals",
        };
        self.timed(label, qb.build_query_as::<MonthlyCount>().fetch_all(&self.pool))
            .await
    }
}

#[async_trait]
impl JourneyStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip_all)]
    async fn count_stations(&self) -> StoreResult<i64> {
        self.timed(
            "count_stations",
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM station").fetch_one(&self.pool),
        )
        .await
    }

    #[instrument(skip_all)]
    async fn count_journeys(&self) -> StoreResult<i64> {
        self.timed(
            "count_journeys",
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM journey").fetch_one(&self.pool),
        )
        .await
    }

    #[instrument(skip_all, fields(filtered = query.is_filtered()))]
    async fn list_stations(&self, query: &ListingQuery<StationColumn>) -> StoreResult<Vec<Station>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM station", STATION_COLUMNS));
        push_filter(&mut qb, &query.filter);
        push_order(&mut qb, &query.order);
        push_window(&mut qb, query.window);

        self.timed("list_stations", qb.build_query_as::<Station>().fetch_all(&self.pool))
            .await
    }

    #[instrument(skip_all, fields(filtered = query.is_filtered()))]
    async fn list_journeys(&self, query: &ListingQuery<JourneyColumn>) -> StoreResult<Vec<JourneyListing>> {
        let mut qb = QueryBuilder::<Postgres>::new(JOURNEY_LISTING);
        push_filter(&mut qb, &query.filter);
        push_order(&mut qb, &query.order);
        push_window(&mut qb, query.window);

        self.timed(
            "list_journeys",
            qb.build_query_as::<JourneyListing>().fetch_all(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_journey(&self, id: i32) -> StoreResult<Option<Journey>> {
        let sql = format!("SELECT {} FROM journey WHERE id = $1", JOURNEY_COLUMNS);
        self.timed(
            "find_journey",
            sqlx::query_as::<_, Journey>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self, window))]
    async fn station_journeys(&self, station_id: i32, side: Side, window: Window) -> StoreResult<Vec<Journey>> {
        let column = match side {
            Side::Departure => "departure_station_id",
            Side::Return => "return_station_id",
        };
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM journey WHERE ", JOURNEY_COLUMNS));
        qb.push(column).push(" = ").push_bind(station_id).push(" ORDER BY id");
        push_window(&mut qb, window);

        self.timed(
            "station_journeys",
            qb.build_query_as::<Journey>().fetch_all(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn station_totals(&self, station_id: i32, threshold_secs: u32) -> StoreResult<Option<StationTotals>> {
        let sql = station_totals_sql();

        self.timed(
            "station_totals",
            sqlx::query_as::<_, StationTotals>(&sql)
                .bind(station_id)
                .bind(i64::from(threshold_secs))
                .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn monthly_departures(&self, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>> {
        self.monthly(Side::Departure, scope).await
    }

    #[instrument(skip(self))]
    async fn monthly_arrivals(&self, scope: &MonthlyFlowParams) -> StoreResult<Vec<MonthlyCount>> {
        self.monthly(Side::Return, scope).await
    }

    #[instrument(skip(self, window))]
    async fn destination_counts(&self, origin: i32, range: &DateRange, window: Window) -> StoreResult<Vec<Destination>> {
        let mut qb = destination_query(origin, range, window);

        self.timed(
            "destination_counts",
            qb.build_query_as::<Destination>().fetch_all(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn arrival_tallies(&self, threshold_secs: u32, range: &DateRange) -> StoreResult<Vec<ArrivalTally>> {
        let mut qb = arrival_tally_query(threshold_secs, range);

        self.timed(
            "arrival_tallies",
            qb.build_query_as::<ArrivalTally>().fetch_all(&self.pool),
        )
        .await
    }
}
