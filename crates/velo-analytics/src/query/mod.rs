//! Listing query construction.
//!
//! Parameter records ([`params`]) carry exactly what a caller asked for and
//! are what cache keys are derived from. They resolve into a [`ListingQuery`]
//! (window, ordering, search disjunction) that a store executes.

pub mod page;
pub mod params;
pub mod search;
pub mod sort;

pub use page::{DateRange, Page, Window};
pub use params::{
    DestinationParams, IrregularParams, JourneyListParams, MonthlyFlowParams, StationJourneysParams,
    StationListParams,
};
pub use search::{Predicate, SearchTerm};
pub use sort::{Direction, JourneyColumn, StationColumn};

/// A paginated, ordered, optionally filtered listing over one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery<C> {
    /// Resolved offset and limit.
    pub window: Window,
    /// Ordering terms in precedence order.
    pub order: Vec<(C, Direction)>,
    /// Predicates combined with OR. `None` means no filtering; an empty list
    /// matches no row.
    pub filter: Option<Vec<Predicate<C>>>,
}

impl<C> ListingQuery<C> {
    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }
}

/// Which end of a journey a station-scoped listing looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Journeys leaving the station.
    Departure,
    /// Journeys returning to the station.
    Return,
}
