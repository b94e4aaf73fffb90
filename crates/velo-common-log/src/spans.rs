//! Span helpers for analytics queries.

use std::future::Future;
use tracing::{info_span, Instrument, Span};

/// Create a span for one analytics query, keyed by its cache key.
pub fn query_span(family: &str, key: &str) -> Span {
    info_span!("query", family = %family, key = %key, cache = tracing::field::Empty)
}

/// Create a span for a store operation.
pub fn store_span(backend: &str, operation: &str) -> Span {
    info_span!("store", backend = %backend, op = %operation)
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

/// Record the cache outcome (`hit` or `miss`) on the current query span.
pub fn record_cache_outcome(outcome: &'static str) {
    Span::current().record("cache", outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    fn with_subscriber<F>(f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::new("trace"))
            .finish();

        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_query_span_records_outcome() {
        with_subscriber(|| {
            let span = query_span("stations", "stations:count");
            let _guard = span.enter();
            record_cache_outcome("hit");
            tracing::info!("served");
        });
    }

    #[tokio::test]
    async fn test_store_span_propagates_across_await() {
        let span = store_span("memory", "count");
        let value = instrument_future(async { 7 }, span).await;
        assert_eq!(value, 7);
    }
}
