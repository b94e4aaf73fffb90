//! Record and result types served by the analytics layer.

pub mod analytics;
pub mod journey;
pub mod station;

pub use analytics::{
    Destination, IrregularJourneyPercentage, MonthlyFlow, Percentage, StationSummary,
};
pub use journey::{Journey, JourneyListing};
pub use station::Station;
