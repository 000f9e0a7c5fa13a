// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::time::Duration;

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for store queries
// ============================================================================
//
// Every round trip to the order store is counted and timed, labelled by
// query name. The per-query counters are what make the batched strategy's
// query count observable.
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    pub queries_total: IntCounterVec,
    pub query_errors_total: IntCounterVec,
    pub rows_total: IntCounterVec,
    pub query_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let queries_total = IntCounterVec::new(
            Opts::new("order_store_queries_total", "Total queries issued to the order store"),
            &["query"],
        )?;
        registry.register(Box::new(queries_total.clone()))?;

        let query_errors_total = IntCounterVec::new(
            Opts::new("order_store_query_errors_total", "Total order store queries that failed"),
            &["query"],
        )?;
        registry.register(Box::new(query_errors_total.clone()))?;

        let rows_total = IntCounterVec::new(
            Opts::new("order_store_rows_total", "Total rows returned by the order store"),
            &["query"],
        )?;
        registry.register(Box::new(rows_total.clone()))?;

        let query_duration = HistogramVec::new(
            HistogramOpts::new("order_store_query_duration_seconds", "Order store query duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["query"],
        )?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            registry,
            queries_total,
            query_errors_total,
            rows_total,
            query_duration,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one round trip to the store
    pub fn record_query(&self, query: &str, elapsed: Duration, rows: Option<usize>) {
        self.queries_total.with_label_values(&[query]).inc();
        self.query_duration.with_label_values(&[query]).observe(elapsed.as_secs_f64());
        match rows {
            Some(rows) => self.rows_total.with_label_values(&[query]).inc_by(rows as u64),
            None => self.query_errors_total.with_label_values(&[query]).inc(),
        }
    }

    /// Queries issued so far under a single label
    pub fn query_count(&self, query: &str) -> u64 {
        self.queries_total.with_label_values(&[query]).get()
    }

    /// Queries issued so far across all labels
    pub fn total_queries(&self) -> u64 {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.name() == "order_store_queries_total")
            .flat_map(|family| family.metric.iter())
            .map(|metric| metric.counter.value.unwrap_or_default() as u64)
            .sum()
    }
}
