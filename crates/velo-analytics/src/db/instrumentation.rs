//! Query timing.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query execution timer.
pub struct QueryTimer {
    query: &'static str,
    start: Instant,
    slow_threshold: Duration,
}

impl QueryTimer {
    pub fn new(query: &'static str, slow_threshold: Duration) -> Self {
        Self {
            query,
            start: Instant::now(),
            slow_threshold,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer, logging at warn when the query ran past the threshold.
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;

        if elapsed > self.slow_threshold {
            warn!(query = self.query, elapsed_ms, "Slow query detected");
        } else {
            debug!(query = self.query, elapsed_ms, "Query completed");
        }

        elapsed
    }
}
