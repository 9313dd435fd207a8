//! PostgreSQL driver adapter.
//!
//! Implements the pool's `Connector` / `DbConnection` seam on top of sqlx.

mod connector;
mod rows;

pub use connector::PgConnector;
