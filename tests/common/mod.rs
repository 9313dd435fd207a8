//! In-memory connector used by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use dbstatus_service::domain::pool::{Connector, DbConnection, PoolOptions};
use dbstatus_service::domain::query::{DbError, ErrorCategory, Phase, QueryRows};

/// Decides the result of each statement. Receives the SQL, the mock
/// connection id and the 1-based global query number.
pub type QueryHandler = Arc<dyn Fn(&str, u64, usize) -> Result<QueryRows, DbError> + Send + Sync>;

/// Shared, inspectable state behind [`MockConnector`].
pub struct MockState {
    pub connects: AtomicUsize,
    pub queries: AtomicUsize,
    pub pings: AtomicUsize,
    pub closes: AtomicUsize,
    next_id: AtomicU64,
    ping_ok: AtomicBool,
    ping_hangs: AtomicBool,
    connect_error: Mutex<Option<DbError>>,
    connect_delay: Mutex<Duration>,
    query_delay: Mutex<Duration>,
    handler: Mutex<QueryHandler>,
}

impl MockState {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn set_ping_ok(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
    }

    /// Make every ping wait forever, like a half-open socket.
    pub fn hang_pings(&self) {
        self.ping_hangs.store(true, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, error: DbError) {
        *self.connect_error.lock().unwrap() = Some(error);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        *self.connect_delay.lock().unwrap() = delay;
    }

    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = delay;
    }

    pub fn on_query<F>(&self, handler: F)
    where
        F: Fn(&str, u64, usize) -> Result<QueryRows, DbError> + Send + Sync + 'static,
    {
        *self.handler.lock().unwrap() = Arc::new(handler);
    }
}

#[derive(Clone)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                connects: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
                pings: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                next_id: AtomicU64::new(0),
                ping_ok: AtomicBool::new(true),
                ping_hangs: AtomicBool::new(false),
                connect_error: Mutex::new(None),
                connect_delay: Mutex::new(Duration::ZERO),
                query_delay: Mutex::new(Duration::ZERO),
                handler: Mutex::new(Arc::new(default_handler) as QueryHandler),
            }),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn DbConnection>, DbError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);

        let delay = *self.state.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.state.connect_error.lock().unwrap().clone() {
            return Err(error);
        }

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(MockConnection {
            id,
            state: self.state.clone(),
        }))
    }

    fn target(&self) -> String {
        "mock:5432/sample".to_string()
    }
}

struct MockConnection {
    id: u64,
    state: Arc<MockState>,
}

#[async_trait]
impl DbConnection for MockConnection {
    async fn query(&mut self, sql: &str) -> Result<QueryRows, DbError> {
        let number = self.state.queries.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self.state.query_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let handler = self.state.handler.lock().unwrap().clone();
        handler(sql, self.id, number)
    }

    async fn ping(&mut self) -> Result<(), DbError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if self.state.ping_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.state.ping_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(broken_connection())
        }
    }

    async fn close(self: Box<Self>) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// `CURRENT_TIMESTAMP` and the `users` table behave like a healthy server.
fn default_handler(sql: &str, _conn: u64, _number: usize) -> Result<QueryRows, DbError> {
    if sql.contains("CURRENT_TIMESTAMP") {
        return Ok(QueryRows::new(
            vec!["current_timestamp".to_string()],
            vec![vec![Value::String(chrono::Utc::now().to_rfc3339())]],
        ));
    }
    if sql.contains("FROM users") {
        return Ok(users_rows());
    }
    Err(DbError::database(
        Phase::Query,
        "42601",
        format!("syntax error in \"{}\"", sql),
    ))
}

pub fn users_rows() -> QueryRows {
    QueryRows::new(
        vec!["id".to_string(), "name".to_string(), "email".to_string()],
        vec![
            vec![json!(1), json!("Alice"), json!("alice@example.com")],
            vec![json!(2), json!("Bob"), json!("bob@example.com")],
        ],
    )
}

pub fn broken_connection() -> DbError {
    DbError::new(Phase::Query, ErrorCategory::Io, "connection reset by peer")
}

pub fn auth_failure() -> DbError {
    DbError::database(
        Phase::Connect,
        "28P01",
        "password authentication failed for user \"postgres\"",
    )
}

pub fn connection_refused() -> DbError {
    DbError::new(Phase::Connect, ErrorCategory::Io, "Connection refused (os error 111)")
}

pub fn missing_table() -> DbError {
    DbError::database(Phase::Query, "42P01", "relation \"users\" does not exist")
}

/// Small pool with short waits and no recycle or pre-ping.
pub fn pool_options(pool_size: usize, max_overflow: usize) -> PoolOptions {
    PoolOptions {
        pool_size,
        max_overflow,
        acquire_timeout: Duration::from_millis(200),
        connect_timeout: Duration::from_secs(1),
        recycle: None,
        pre_ping: false,
    }
}

/// Let background close tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
