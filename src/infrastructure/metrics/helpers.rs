//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::domain::pool::PoolStats;
use crate::domain::query::{ErrorKind, QueryOutcome};

use super::{
    POOL_ACQUIRE_WAIT, POOL_CONNECTIONS, POOL_CONNECTIONS_CREATED_TOTAL,
    POOL_CONNECTIONS_DISCARDED_TOTAL, POOL_CONNECTIONS_RECYCLED_TOTAL, POOL_EXHAUSTED_TOTAL,
    QUERY_DURATION, QUERY_OUTCOMES_TOTAL, QUERY_RETRIES_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    into_text(buffer)
}

fn into_text(buffer: Vec<u8>) -> Result<String, prometheus::Error> {
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("metrics output is not valid UTF-8: {}", e)))
}

/// Helper struct for recording query executor metrics
pub struct QueryMetrics;

impl QueryMetrics {
    /// Record a finished execution
    pub fn record_outcome(outcome: &QueryOutcome) {
        let label = outcome.label();
        QUERY_OUTCOMES_TOTAL.with_label_values(&[label]).inc();
        QUERY_DURATION
            .with_label_values(&[label])
            .observe(outcome.elapsed().as_secs_f64());
    }

    /// Record a retry triggered by `kind`
    pub fn record_retry(kind: ErrorKind) {
        QUERY_RETRIES_TOTAL.with_label_values(&[kind.as_str()]).inc();
    }
}

/// Helper struct for recording connection pool metrics
pub struct PoolMetrics;

impl PoolMetrics {
    pub fn record_created() {
        POOL_CONNECTIONS_CREATED_TOTAL.inc();
    }

    pub fn record_recycled() {
        POOL_CONNECTIONS_RECYCLED_TOTAL.inc();
    }

    /// Record a discarded connection (`unhealthy` or `pre_ping`)
    pub fn record_discarded(reason: &str) {
        POOL_CONNECTIONS_DISCARDED_TOTAL
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_exhausted() {
        POOL_EXHAUSTED_TOTAL.inc();
    }

    pub fn observe_acquire_wait(waited: Duration) {
        POOL_ACQUIRE_WAIT.observe(waited.as_secs_f64());
    }

    /// Refresh connection gauges from a pool snapshot
    pub fn update_from_stats(stats: &PoolStats) {
        POOL_CONNECTIONS
            .with_label_values(&["idle"])
            .set(stats.idle as i64);
        POOL_CONNECTIONS
            .with_label_values(&["checked_out"])
            .set(stats.checked_out as i64);
        POOL_CONNECTIONS
            .with_label_values(&["overflow"])
            .set(stats.overflow as i64);
    }
}
