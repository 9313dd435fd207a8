//! Driver-facing traits used by the pool.

use async_trait::async_trait;

use crate::domain::query::{DbError, QueryRows};

/// One physical database connection.
#[async_trait]
pub trait DbConnection: Send {
    /// Run a statement and return its full result set.
    async fn query(&mut self, sql: &str) -> Result<QueryRows, DbError>;

    /// Cheap liveness check.
    async fn ping(&mut self) -> Result<(), DbError>;

    /// Close the connection gracefully.
    async fn close(self: Box<Self>);
}

/// Opens physical connections for the pool.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection. Failures carry `Phase::Connect`.
    async fn connect(&self) -> Result<Box<dyn DbConnection>, DbError>;

    /// Loggable description of the target (never includes credentials).
    fn target(&self) -> String;
}
