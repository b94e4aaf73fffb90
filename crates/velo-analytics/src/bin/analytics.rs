//! Velo analytics command-line tool
//!
//! Runs one analytics operation against the configured store and cache and
//! prints the result as JSON.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use velo_analytics::config::{validate_config, ConfigLoader};
use velo_analytics::query::{
    DestinationParams, Direction, IrregularParams, JourneyListParams, MonthlyFlowParams, StationListParams,
};
use velo_analytics::store::MemoryStore;
use velo_analytics::{AnalyticsError, AppState};

#[derive(Parser)]
#[command(name = "velo-analytics")]
#[command(about = "Cached bike-share journey analytics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file, layered over the built-in defaults
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<String>,

    /// Serve from a JSON dataset instead of Postgres
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Print compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args)]
struct Paging {
    /// Page index, or a row offset when take is -1
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    skip: i64,

    /// Page size, -1 for every row
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    take: i64,
}

#[derive(Args)]
struct DateBounds {
    /// First day included (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day included (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Command {
    /// Number of stations
    StationCount,

    /// Number of journeys
    JourneyCount,

    /// List stations
    Stations {
        #[command(flatten)]
        paging: Paging,
        #[arg(long)]
        id: Option<Direction>,
        #[arg(long)]
        name: Option<Direction>,
        #[arg(long)]
        address: Option<Direction>,
        #[arg(long)]
        x: Option<Direction>,
        #[arg(long)]
        y: Option<Direction>,
        #[arg(long)]
        search: Option<String>,
    },

    /// List journeys
    Journeys {
        #[command(flatten)]
        paging: Paging,
        #[arg(long)]
        id: Option<Direction>,
        #[arg(long)]
        departure_time: Option<Direction>,
        #[arg(long)]
        return_time: Option<Direction>,
        #[arg(long)]
        distance: Option<Direction>,
        #[arg(long)]
        duration: Option<Direction>,
        #[arg(long)]
        search: Option<String>,
    },

    /// Station summary
    Station { id: i32 },

    /// Single journey
    Journey { id: i32 },

    /// Departures and arrivals per month
    Monthly {
        /// Restrict to one station
        #[arg(long)]
        station: Option<i32>,
        #[command(flatten)]
        months: DateBounds,
    },

    /// Most frequent destinations from a station
    Destinations {
        id: i32,
        #[command(flatten)]
        paging: Paging,
        #[command(flatten)]
        dates: DateBounds,
    },

    /// Irregular journey percentage per station
    Irregular {
        /// Allowed deviation in seconds, defaults to the configured threshold
        #[arg(long)]
        threshold: Option<u32>,
        #[command(flatten)]
        dates: DateBounds,
    },

    /// Journeys departing from a station
    JourneysFrom {
        id: i32,
        #[command(flatten)]
        paging: Paging,
    },

    /// Journeys returning to a station
    JourneysTo {
        id: i32,
        #[command(flatten)]
        paging: Paging,
    },

    /// Check database and cache
    Health {
        /// Check timeout in milliseconds
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
}

struct Printer {
    compact: bool,
}

impl Printer {
    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{}", json);
        Ok(())
    }
}

async fn build_state(cli: &Cli) -> Result<AppState> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let config = loader.load()?;

    velo_common_log::init(config.logging.to_log_config()).context("Failed to initialize logging")?;

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(%error, "Invalid configuration");
        }
        bail!("{} configuration error(s)", errors.len());
    }

    match &cli.seed {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read seed file {}", path.display()))?;
            let store = MemoryStore::from_json(&json).context("Invalid seed file")?;
            info!(path = %path.display(), "Serving from seed data");
            Ok(AppState::with_store(&config, Arc::new(store)).await)
        }
        None => AppState::new(&config).await,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let state = build_state(&cli).await?;
    let analytics = &state.analytics;
    let out = Printer { compact: cli.compact };

    match cli.command {
        Command::StationCount => out.print(&analytics.station_count().await?),
        Command::JourneyCount => out.print(&analytics.journey_count().await?),
        Command::Stations {
            paging,
            id,
            name,
            address,
            x,
            y,
            search,
        } => {
            let params = StationListParams {
                id,
                name,
                address,
                x,
                y,
                search,
                ..StationListParams::new(paging.skip, paging.take)
            };
            out.print(&analytics.list_stations(&params).await?)
        }
        Command::Journeys {
            paging,
            id,
            departure_time,
            return_time,
            distance,
            duration,
            search,
        } => {
            let params = JourneyListParams {
                id,
                departure_time,
                return_time,
                distance,
                duration,
                search,
                ..JourneyListParams::new(paging.skip, paging.take)
            };
            out.print(&analytics.list_journeys(&params).await?)
        }
        Command::Station { id } => out.print(&analytics.station_summary(id).await?),
        Command::Journey { id } => out.print(&analytics.journey(id).await?),
        Command::Monthly { station, months } => {
            let params = MonthlyFlowParams {
                station_id: station,
                ..MonthlyFlowParams::default()
            }
            .between(months.start, months.end);
            out.print(&analytics.journey_count_by_month(&params).await?)
        }
        Command::Destinations { id, paging, dates } => {
            let params = DestinationParams::new(id)
                .paged(paging.skip, paging.take)
                .between(dates.start, dates.end);
            out.print(&analytics.popular_destinations(&params).await?)
        }
        Command::Irregular { threshold, dates } => {
            let params = IrregularParams::new(threshold.unwrap_or_else(|| analytics.irregular_threshold_secs()))
                .between(dates.start, dates.end);
            out.print(&analytics.irregular_journey_percentage(&params).await?)
        }
        Command::JourneysFrom { id, paging } => {
            out.print(&analytics.journeys_from_station(id, paging.skip, paging.take).await?)
        }
        Command::JourneysTo { id, paging } => {
            out.print(&analytics.journeys_to_station(id, paging.skip, paging.take).await?)
        }
        Command::Health { timeout_ms } => {
            let report = state.health(Duration::from_millis(timeout_ms)).await;
            out.print(&report)?;
            if !report.is_healthy() {
                bail!("unhealthy");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        if let Some(analytics) = e.downcast_ref::<AnalyticsError>() {
            if analytics.is_transient() {
                tracing::warn!("Store temporarily unavailable, retry later");
                eprintln!("error: {}", analytics);
                std::process::exit(75);
            }
        }
        return Err(e);
    }
    Ok(())
}
