//! Analytics error types.

use crate::store::StoreError;
use thiserror::Error;

/// Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Errors surfaced by analytics operations.
///
/// Cache faults never appear here: they degrade to computing the result.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AnalyticsError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnalyticsError::Store(StoreError::Timeout(_) | StoreError::Unavailable(_))
        )
    }
}
