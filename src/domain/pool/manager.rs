//! Bounded connection pool with overflow, lazy recycling and pre-ping.
//!
//! Capacity is a semaphore of `pool_size + max_overflow` permits; every
//! checked-out [`PooledConnection`] holds one. Idle connections sit in a
//! LIFO stack capped at `pool_size`, so overflow connections are closed
//! when they come back. The bookkeeping mutex is never held across an
//! await point.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::domain::query::{DbError, ErrorCategory, Phase, QueryRows};
use crate::metrics::PoolMetrics;

use super::connection::{Connector, DbConnection};
use super::options::PoolOptions;
use super::stats::{PoolCounters, PoolStats};

/// Shared handle to the pool. Cloning is cheap.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    connector: Arc<dyn Connector>,
    options: PoolOptions,
    slots: Arc<Semaphore>,
    state: Mutex<PoolState>,
    counters: PoolCounters,
    next_id: AtomicU64,
}

#[derive(Default)]
struct PoolState {
    idle: Vec<IdleConnection>,
    /// Idle plus checked out
    open: usize,
    closed: bool,
}

struct IdleConnection {
    conn: Box<dyn DbConnection>,
    id: u64,
    created_at: Instant,
}

impl ConnectionPool {
    /// Create an empty pool. Connections are opened on demand.
    pub fn new(connector: Arc<dyn Connector>, options: PoolOptions) -> Self {
        tracing::info!(
            target_db = %connector.target(),
            pool_size = options.pool_size,
            max_overflow = options.max_overflow,
            pre_ping = options.pre_ping,
            recycle_secs = options.recycle.map(|d| d.as_secs()),
            "Database connection pool created"
        );

        Self {
            inner: Arc::new(PoolInner {
                slots: Arc::new(Semaphore::new(options.capacity())),
                connector,
                options,
                state: Mutex::new(PoolState::default()),
                counters: PoolCounters::default(),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Check out a connection.
    ///
    /// Waits up to `acquire_timeout` for a free slot. Idle connections past
    /// their recycle age, or failing pre-ping, are replaced with a fresh one
    /// without surfacing the failure.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        let inner = &self.inner;
        let started = Instant::now();

        let permit = match tokio::time::timeout(
            inner.options.acquire_timeout,
            inner.slots.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(DbError::pool_closed()),
            Err(_) => {
                let waited = started.elapsed();
                PoolCounters::incr(&inner.counters.exhausted);
                PoolMetrics::record_exhausted();
                tracing::warn!(
                    waited_ms = waited.as_millis() as u64,
                    capacity = inner.options.capacity(),
                    "Connection pool exhausted"
                );
                return Err(DbError::pool_timed_out(waited));
            }
        };
        PoolMetrics::observe_acquire_wait(started.elapsed());

        let idle = {
            let mut state = inner.lock_state();
            if state.closed {
                return Err(DbError::pool_closed());
            }
            state.idle.pop()
        };

        if let Some(idle) = idle {
            // Off the idle stack but not yet handed out
            let in_flight = InFlight::new(inner);
            let validated = inner.validate(idle).await;
            in_flight.disarm();

            if let Some(idle) = validated {
                tracing::trace!(connection_id = idle.id, "Reusing idle connection");
                return Ok(PooledConnection::new(idle, inner.clone(), permit));
            }
        }

        let fresh = inner.open_connection().await?;
        Ok(PooledConnection::new(fresh, inner.clone(), permit))
    }

    /// Return a connection. Unhealthy connections are closed, never reused.
    pub fn release(&self, conn: PooledConnection, healthy: bool) {
        conn.release(healthy);
    }

    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        let (open, idle) = {
            let state = inner.lock_state();
            (state.open, state.idle.len())
        };

        PoolStats {
            pool_size: inner.options.pool_size,
            max_overflow: inner.options.max_overflow,
            open,
            idle,
            checked_out: open.saturating_sub(idle),
            overflow: open.saturating_sub(inner.options.pool_size),
            created_total: PoolCounters::load(&inner.counters.created),
            recycled_total: PoolCounters::load(&inner.counters.recycled),
            discarded_total: PoolCounters::load(&inner.counters.discarded),
            exhausted_total: PoolCounters::load(&inner.counters.exhausted),
        }
    }

    pub fn target(&self) -> String {
        self.inner.connector.target()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }

    /// Tear the pool down.
    ///
    /// Idle connections are closed now; checked-out ones are closed when
    /// they are returned. Pending and future `acquire` calls fail.
    pub async fn close(&self) {
        let idle = {
            let mut state = self.inner.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            let idle = std::mem::take(&mut state.idle);
            state.open = state.open.saturating_sub(idle.len());
            idle
        };
        self.inner.slots.close();

        let count = idle.len();
        futures::future::join_all(idle.into_iter().map(|idle| idle.conn.close())).await;
        tracing::info!(closed = count, "Database connection pool closed");
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("target", &self.inner.connector.target())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl PoolInner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply recycle and pre-ping checks. `None` means the connection was
    /// retired and the caller must open a new one.
    async fn validate(&self, mut idle: IdleConnection) -> Option<IdleConnection> {
        if let Some(recycle) = self.options.recycle {
            let age = idle.created_at.elapsed();
            if age > recycle {
                tracing::debug!(
                    connection_id = idle.id,
                    age_secs = age.as_secs(),
                    "Recycling connection past its lifetime"
                );
                PoolCounters::incr(&self.counters.recycled);
                PoolMetrics::record_recycled();
                self.retire(idle.conn);
                return None;
            }
        }

        if self.options.pre_ping {
            let limit = self.options.connect_timeout;
            let ping = match tokio::time::timeout(limit, idle.conn.ping()).await {
                Ok(result) => result,
                Err(_) => Err(DbError::deadline(Phase::Connect, limit)),
            };
            if let Err(e) = ping {
                tracing::warn!(
                    connection_id = idle.id,
                    error = %e,
                    "Pre-ping failed, replacing connection"
                );
                PoolCounters::incr(&self.counters.discarded);
                PoolMetrics::record_discarded("pre_ping");
                self.retire(idle.conn);
                return None;
            }
        }

        Some(idle)
    }

    async fn open_connection(&self) -> Result<IdleConnection, DbError> {
        let started = Instant::now();
        let timeout = self.options.connect_timeout;

        let conn = match tokio::time::timeout(timeout, self.connector.connect()).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::warn!(
                    target_db = %self.connector.target(),
                    error = %e,
                    "Failed to open database connection"
                );
                return Err(e);
            }
            Err(_) => {
                let e = DbError::deadline(Phase::Connect, timeout);
                tracing::warn!(
                    target_db = %self.connector.target(),
                    error = %e,
                    "Timed out opening database connection"
                );
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let open = {
            let mut state = self.lock_state();
            state.open += 1;
            state.open
        };
        PoolCounters::incr(&self.counters.created);
        PoolMetrics::record_created();

        tracing::debug!(
            connection_id = id,
            open,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Opened database connection"
        );

        Ok(IdleConnection {
            conn,
            id,
            created_at: Instant::now(),
        })
    }

    fn checkin(&self, conn: Box<dyn DbConnection>, id: u64, created_at: Instant, healthy: bool) {
        let rejected = {
            let mut state = self.lock_state();
            if healthy && !state.closed && state.idle.len() < self.options.pool_size {
                state.idle.push(IdleConnection {
                    conn,
                    id,
                    created_at,
                });
                None
            } else {
                state.open = state.open.saturating_sub(1);
                Some(conn)
            }
        };

        let Some(conn) = rejected else {
            return;
        };

        if healthy {
            tracing::debug!(connection_id = id, "Closing surplus connection");
        } else {
            tracing::debug!(connection_id = id, "Discarding unhealthy connection");
            PoolCounters::incr(&self.counters.discarded);
            PoolMetrics::record_discarded("unhealthy");
        }
        close_in_background(conn);
    }

    fn retire(&self, conn: Box<dyn DbConnection>) {
        {
            let mut state = self.lock_state();
            state.open = state.open.saturating_sub(1);
        }
        close_in_background(conn);
    }
}

/// Accounts for a connection popped from the idle stack while it is being
/// validated. If `acquire` is cancelled mid-validation the connection is
/// dropped and this removes it from the open count.
struct InFlight<'a> {
    pool: &'a PoolInner,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(pool: &'a PoolInner) -> Self {
        Self { pool, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Acquire cancelled during validation, dropping connection");
            let mut state = self.pool.lock_state();
            state.open = state.open.saturating_sub(1);
        }
    }
}

fn close_in_background(conn: Box<dyn DbConnection>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(conn.close());
        }
        Err(_) => drop(conn),
    }
}

/// A checked-out connection.
///
/// Call [`release`](Self::release) when done. Dropping it without
/// releasing (e.g. a cancelled query) discards the connection.
pub struct PooledConnection {
    conn: Option<Box<dyn DbConnection>>,
    id: u64,
    created_at: Instant,
    pool: Arc<PoolInner>,
    // Dropped after `Drop::drop` has checked the connection back in
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(idle: IdleConnection, pool: Arc<PoolInner>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            conn: Some(idle.conn),
            id: idle.id,
            created_at: idle.created_at,
            pool,
            _permit: permit,
        }
    }

    /// Pool-unique id of the underlying physical connection.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub async fn query(&mut self, sql: &str) -> Result<QueryRows, DbError> {
        match self.conn.as_mut() {
            Some(conn) => conn.query(sql).await,
            None => Err(DbError::new(
                Phase::Query,
                ErrorCategory::Other,
                "connection already released",
            )),
        }
    }

    pub fn release(mut self, healthy: bool) {
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn, self.id, self.created_at, healthy);
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!(
                connection_id = self.id,
                "Connection dropped without release, discarding"
            );
            self.pool.checkin(conn, self.id, self.created_at, false);
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("age", &self.created_at.elapsed())
            .finish()
    }
}
