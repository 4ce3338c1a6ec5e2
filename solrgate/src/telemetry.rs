//! Per-call timing and logging

use std::time::Instant;
use tracing::{error, info, warn};

/// Calls slower than this are logged at warn level
pub const SLOW_QUERY_MS: f64 = 500.0;

/// Metrics collected for one connector call
#[derive(Debug, Clone, Default)]
pub struct QueryMetrics {
    pub core: String,
    pub operation: String,
    pub engine_ms: f64,
    pub total_ms: f64,
    pub num_found: u64,
    pub row_count: usize,
}

/// Tracks elapsed time of one call and its engine round trip
pub struct QueryTelemetry {
    start: Instant,
    engine_ms: f64,
}

impl QueryTelemetry {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            engine_ms: 0.0,
        }
    }

    /// Record the engine round trip that started at `sent`
    pub fn mark_engine(&mut self, sent: Instant) {
        self.engine_ms = sent.elapsed().as_secs_f64() * 1000.0;
    }

    pub fn finish(self, core: &str, operation: &str, num_found: u64, row_count: usize) -> QueryMetrics {
        QueryMetrics {
            core: core.to_string(),
            operation: operation.to_string(),
            engine_ms: self.engine_ms,
            total_ms: self.start.elapsed().as_secs_f64() * 1000.0,
            num_found,
            row_count,
        }
    }
}

impl Default for QueryTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_query_success(metrics: &QueryMetrics) {
    info!(
        core = %metrics.core,
        operation = %metrics.operation,
        num_found = metrics.num_found,
        row_count = metrics.row_count,
        engine_ms = metrics.engine_ms,
        took_ms = metrics.total_ms,
        "query took {:.0} ms",
        metrics.total_ms
    );

    if metrics.total_ms > SLOW_QUERY_MS {
        warn!(
            core = %metrics.core,
            operation = %metrics.operation,
            took_ms = metrics.total_ms,
            "Slow query detected"
        );
    }
}

pub fn log_query_error(core: &str, operation: &str, error: &str) {
    error!(
        core = %core,
        operation = %operation,
        error = %error,
        "Error executing query"
    );
}
