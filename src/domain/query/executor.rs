//! Query execution with fixed-delay retries and an overall deadline.

use std::time::{Duration, Instant};

use crate::config::DatabaseConfig;
use crate::domain::pool::ConnectionPool;
use crate::metrics::QueryMetrics;

use super::classifier::{classify, ErrorKind};
use super::types::{QueryFailure, QueryOutcome, QueryRequest, QuerySuccess};

/// Fixed-delay retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl From<&DatabaseConfig> for RetryPolicy {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
        }
    }
}

/// Runs queries on pooled connections.
///
/// Never fails outside [`QueryOutcome::Failure`].
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pool: ConnectionPool,
    policy: RetryPolicy,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(pool: ConnectionPool, policy: RetryPolicy, query_timeout: Duration) -> Self {
        Self {
            pool,
            policy,
            query_timeout,
        }
    }

    pub fn from_config(pool: ConnectionPool, config: &DatabaseConfig) -> Self {
        Self::new(pool, RetryPolicy::from(config), config.query_timeout())
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Execute `request`, retrying transient failures until the deadline.
    pub async fn execute(&self, request: &QueryRequest) -> QueryOutcome {
        let started = Instant::now();
        let deadline = request.timeout.unwrap_or(self.query_timeout);
        let max_retries = request.max_retries.unwrap_or(self.policy.max_retries);

        let outcome =
            match tokio::time::timeout(deadline, self.run(request, max_retries, started)).await {
                Ok(outcome) => outcome,
                Err(_) => QueryOutcome::Failure(QueryFailure::new(
                    ErrorKind::Timeout,
                    format!(
                        "query exceeded deadline of {:.3}s",
                        deadline.as_secs_f64()
                    ),
                    started.elapsed(),
                )),
            };

        match &outcome {
            QueryOutcome::Success(success) => tracing::debug!(
                rows = success.row_count(),
                elapsed_ms = success.elapsed.as_millis() as u64,
                "Query succeeded"
            ),
            QueryOutcome::Failure(failure) => tracing::warn!(
                kind = %failure.kind,
                retriable = failure.retriable,
                elapsed_ms = failure.elapsed.as_millis() as u64,
                detail = %failure.detail,
                "Query failed"
            ),
        }
        QueryMetrics::record_outcome(&outcome);

        outcome
    }

    async fn run(&self, request: &QueryRequest, max_retries: u32, started: Instant) -> QueryOutcome {
        let mut attempt: u32 = 0;

        loop {
            let mut conn = match self.pool.acquire().await {
                Ok(conn) => conn,
                Err(e) => {
                    // Acquisition failures are never retried
                    return QueryOutcome::Failure(QueryFailure::new(
                        classify(&e),
                        e.detail,
                        started.elapsed(),
                    ));
                }
            };

            match conn.query(&request.sql).await {
                Ok(rows) => {
                    conn.release(true);
                    return QueryOutcome::Success(QuerySuccess {
                        columns: rows.columns,
                        rows: rows.rows,
                        elapsed: started.elapsed(),
                    });
                }
                Err(e) => {
                    let kind = classify(&e);
                    conn.release(kind != ErrorKind::ConnectionBroken);

                    if kind.is_retriable() && attempt < max_retries {
                        attempt += 1;
                        QueryMetrics::record_retry(kind);
                        tracing::warn!(
                            attempt,
                            max_retries,
                            kind = %kind,
                            error = %e,
                            delay_ms = self.policy.delay.as_millis() as u64,
                            "Transient query failure, retrying"
                        );
                        tokio::time::sleep(self.policy.delay).await;
                        continue;
                    }

                    return QueryOutcome::Failure(QueryFailure::new(
                        kind,
                        e.detail,
                        started.elapsed(),
                    ));
                }
            }
        }
    }
}
