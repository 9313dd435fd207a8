//! Query executor integration tests
//!
//! Retry, deadline and classification behavior on top of a real pool
//! backed by the in-memory connector.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbstatus_service::domain::pool::ConnectionPool;
use dbstatus_service::domain::query::{
    ErrorKind, QueryExecutor, QueryOutcome, QueryRequest, QueryRows, RetryPolicy,
};

use common::{broken_connection, missing_table, pool_options, settle, MockConnector};

fn executor_with(
    connector: &MockConnector,
    max_retries: u32,
    delay: Duration,
    query_timeout: Duration,
) -> QueryExecutor {
    let pool = ConnectionPool::new(Arc::new(connector.clone()), pool_options(2, 1));
    QueryExecutor::new(pool, RetryPolicy { max_retries, delay }, query_timeout)
}

fn expect_failure(outcome: QueryOutcome) -> dbstatus_service::domain::query::QueryFailure {
    match outcome {
        QueryOutcome::Failure(failure) => failure,
        QueryOutcome::Success(success) => panic!("expected failure, got {:?}", success),
    }
}

// ============================================================================
// Retries
// ============================================================================

mod retry_tests {
    use super::*;

    #[tokio::test]
    async fn test_transient_failure_retried_exactly_max_retries() {
        let connector = MockConnector::new();
        connector.state.on_query(|_, _, _| Err(broken_connection()));
        let delay = Duration::from_millis(40);
        let executor = executor_with(&connector, 3, delay, Duration::from_secs(5));

        let started = Instant::now();
        let failure = expect_failure(executor.execute(&QueryRequest::new("SELECT 1")).await);

        assert_eq!(failure.kind, ErrorKind::ConnectionBroken);
        assert!(failure.retriable);
        assert_eq!(connector.state.queries(), 4);
        assert!(started.elapsed() >= delay * 3);

        // Every broken connection was discarded, so each attempt opened a new one
        assert_eq!(connector.state.connects(), 4);
        assert_eq!(executor.pool().stats().discarded_total, 4);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let connector = MockConnector::new();
        connector.state.on_query(|_, _, number| {
            if number <= 2 {
                Err(broken_connection())
            } else {
                Ok(QueryRows::new(vec!["one".into()], vec![vec![1.into()]]))
            }
        });
        let executor = executor_with(
            &connector,
            3,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let outcome = executor.execute(&QueryRequest::new("SELECT 1")).await;
        let QueryOutcome::Success(success) = outcome else {
            panic!("expected success after retries");
        };
        assert_eq!(success.scalar(), Some(&serde_json::json!(1)));
        assert_eq!(connector.state.queries(), 3);
    }

    #[tokio::test]
    async fn test_non_retriable_failure_is_not_retried() {
        let connector = MockConnector::new();
        connector.state.on_query(|_, _, _| Err(missing_table()));
        let executor = executor_with(
            &connector,
            3,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let failure =
            expect_failure(executor.execute(&QueryRequest::new("SELECT * FROM users")).await);

        assert_eq!(failure.kind, ErrorKind::QueryError);
        assert!(!failure.retriable);
        assert!(failure.detail.contains("does not exist"));
        assert_eq!(connector.state.queries(), 1);

        // The connection itself was fine and went back to the pool
        let stats = executor.pool().stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.discarded_total, 0);
    }

    #[tokio::test]
    async fn test_request_overrides_retry_count() {
        let connector = MockConnector::new();
        connector.state.on_query(|_, _, _| Err(broken_connection()));
        let executor = executor_with(
            &connector,
            3,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let request = QueryRequest::new("SELECT 1").with_max_retries(0);
        let failure = expect_failure(executor.execute(&request).await);

        assert_eq!(failure.kind, ErrorKind::ConnectionBroken);
        assert_eq!(connector.state.queries(), 1);
    }
}

// ============================================================================
// Deadline
// ============================================================================

mod timeout_tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let connector = MockConnector::new();
        connector.state.set_query_delay(Duration::from_millis(500));
        let executor = executor_with(
            &connector,
            3,
            Duration::from_millis(10),
            Duration::from_millis(100),
        );

        let started = Instant::now();
        let failure = expect_failure(executor.execute(&QueryRequest::new("SELECT 1")).await);

        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert!(!failure.retriable);
        assert!(started.elapsed() < Duration::from_millis(500));

        // The in-flight connection was dropped with the query and discarded
        settle().await;
        let stats = executor.pool().stats();
        assert_eq!(stats.open, 0);
        assert_eq!(stats.discarded_total, 1);
    }

    #[tokio::test]
    async fn test_retries_past_deadline_time_out() {
        let connector = MockConnector::new();
        connector.state.on_query(|_, _, _| Err(broken_connection()));
        let executor = executor_with(
            &connector,
            50,
            Duration::from_millis(30),
            Duration::from_millis(100),
        );

        let failure = expect_failure(executor.execute(&QueryRequest::new("SELECT 1")).await);
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert!(connector.state.queries() < 51);
    }

    #[tokio::test]
    async fn test_request_overrides_deadline() {
        let connector = MockConnector::new();
        connector.state.set_query_delay(Duration::from_millis(200));
        let executor = executor_with(
            &connector,
            0,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let request = QueryRequest::new("SELECT CURRENT_TIMESTAMP")
            .with_timeout(Duration::from_millis(50));
        let failure = expect_failure(executor.execute(&request).await);
        assert_eq!(failure.kind, ErrorKind::Timeout);
    }
}

// ============================================================================
// Acquisition failures
// ============================================================================

mod acquire_tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_credentials_surface_as_auth_error() {
        let connector = MockConnector::new();
        connector.state.fail_connect(common::auth_failure());
        let executor = executor_with(
            &connector,
            3,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let failure = expect_failure(executor.execute(&QueryRequest::new("SELECT 1")).await);

        assert_eq!(failure.kind, ErrorKind::AuthError);
        assert!(!failure.retriable);
        assert_eq!(connector.state.connects(), 1);
        assert_eq!(connector.state.queries(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connect_error() {
        let connector = MockConnector::new();
        connector.state.fail_connect(common::connection_refused());
        let executor = executor_with(
            &connector,
            3,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let failure = expect_failure(executor.execute(&QueryRequest::new("SELECT 1")).await);
        assert_eq!(failure.kind, ErrorKind::ConnectError);
        assert_eq!(connector.state.connects(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_pool_is_reported() {
        let connector = MockConnector::new();
        let mut options = pool_options(1, 0);
        options.acquire_timeout = Duration::from_millis(50);
        let pool = ConnectionPool::new(Arc::new(connector.clone()), options);
        let executor = QueryExecutor::new(
            pool.clone(),
            RetryPolicy::default(),
            Duration::from_secs(5),
        );

        let held = pool.acquire().await.expect("first acquire");
        let failure = expect_failure(executor.execute(&QueryRequest::new("SELECT 1")).await);
        assert_eq!(failure.kind, ErrorKind::PoolExhausted);
        pool.release(held, true);

        let outcome = executor
            .execute(&QueryRequest::new("SELECT CURRENT_TIMESTAMP"))
            .await;
        assert!(outcome.is_success());
    }
}
