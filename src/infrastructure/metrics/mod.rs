//! Prometheus metrics for the status service.
//!
//! - Query metrics (outcomes by kind, retries, latency)
//! - Pool metrics (connection gauges, lifecycle counters, acquire wait)

mod helpers;

pub use helpers::{encode_metrics, PoolMetrics, QueryMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "dbstatus";

lazy_static! {
    // ============================================================================
    // Query Metrics
    // ============================================================================

    /// Executor outcomes, labelled `success` or the failure kind
    pub static ref QUERY_OUTCOMES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_query_outcomes_total", METRIC_PREFIX),
        "Total query executions by outcome",
        &["outcome"]
    ).unwrap();

    /// Retries after transient failures
    pub static ref QUERY_RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_query_retries_total", METRIC_PREFIX),
        "Total query retries by triggering error kind",
        &["kind"]
    ).unwrap();

    /// End-to-end executor latency, including retries
    pub static ref QUERY_DURATION: HistogramVec = register_histogram_vec!(
        format!("{}_query_duration_seconds", METRIC_PREFIX),
        "Query execution time in seconds, including retries",
        &["outcome"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // ============================================================================
    // Pool Metrics
    // ============================================================================

    /// Pool connections by state (idle, checked_out, overflow)
    pub static ref POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        format!("{}_pool_connections", METRIC_PREFIX),
        "Database pool connections by state",
        &["state"]
    ).unwrap();

    /// Physical connections opened
    pub static ref POOL_CONNECTIONS_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_pool_connections_created_total", METRIC_PREFIX),
        "Total physical database connections opened"
    ).unwrap();

    /// Connections replaced because they exceeded the recycle interval
    pub static ref POOL_CONNECTIONS_RECYCLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_pool_connections_recycled_total", METRIC_PREFIX),
        "Total connections recycled after exceeding their lifetime"
    ).unwrap();

    /// Connections thrown away as unhealthy
    pub static ref POOL_CONNECTIONS_DISCARDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_pool_connections_discarded_total", METRIC_PREFIX),
        "Total connections discarded as unhealthy",
        &["reason"]
    ).unwrap();

    /// Acquire calls that hit the wait bound
    pub static ref POOL_EXHAUSTED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_pool_exhausted_total", METRIC_PREFIX),
        "Total acquire attempts that timed out waiting for a connection"
    ).unwrap();

    /// Time spent waiting for a pool slot
    pub static ref POOL_ACQUIRE_WAIT: Histogram = register_histogram!(
        format!("{}_pool_acquire_wait_seconds", METRIC_PREFIX),
        "Time spent waiting for a free pool slot in seconds",
        vec![0.0001, 0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]
    ).unwrap();
}
